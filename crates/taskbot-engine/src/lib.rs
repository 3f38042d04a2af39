pub mod controller;
pub mod error;
pub mod export;
pub mod matcher;
pub mod menu;
pub mod mock;
pub mod session;

pub use controller::ConversationController;
pub use error::EngineError;
pub use export::ExportCoordinator;
pub use session::{DialogueState, InMemorySessionStore, SessionStore};
