pub mod client;
pub mod exporter;
pub mod poller;

pub use client::BotClient;
pub use exporter::{HttpSheetExporter, UnconfiguredExporter};
pub use poller::UpdatePoller;
