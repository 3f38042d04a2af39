pub mod events;
pub mod export;
pub mod ids;
pub mod task;
pub mod transport;

pub use events::{CallbackAction, Event, EventPayload, InlineButton, Keyboard};
pub use export::{ExportError, ExportOutcome, SheetExporter};
pub use ids::{ChatId, TaskId};
pub use task::{Category, Task, TaskStatus};
pub use transport::{ChatTransport, TransportError};
