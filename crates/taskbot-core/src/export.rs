use async_trait::async_trait;

use crate::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no export service configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("export service error: {0}")]
    Service(String),
}

/// What the spreadsheet collaborator may answer with. Bridges differ:
/// some return a bare URL, some a structured object with any subset of
/// these fields. Callers must not assume one shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Url(String),
    Sheet {
        url: Option<String>,
        tab: Option<String>,
        gid: Option<String>,
        tab_name: Option<String>,
    },
}

/// Spreadsheet export collaborator. One call per export job; the job
/// writes the whole task set for one owner into a per-owner tab.
#[async_trait]
pub trait SheetExporter: Send + Sync {
    async fn export(&self, tasks: &[Task], owner_label: &str) -> Result<ExportOutcome, ExportError>;
}
