use std::sync::Arc;

use tracing::{error, info, instrument};
use uuid::Uuid;

use taskbot_core::events::Keyboard;
use taskbot_core::export::{ExportOutcome, SheetExporter};
use taskbot_core::ids::ChatId;
use taskbot_core::task::Task;
use taskbot_core::transport::ChatTransport;

/// Runs export jobs off the request path and reports the outcome to the
/// user out-of-band. Jobs are best-effort: a process restart drops any
/// in-flight job together with its pending notification.
pub struct ExportCoordinator {
    transport: Arc<dyn ChatTransport>,
    exporter: Arc<dyn SheetExporter>,
    sheet_id: Option<String>,
}

impl ExportCoordinator {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        exporter: Arc<dyn SheetExporter>,
        sheet_id: Option<String>,
    ) -> Self {
        Self {
            transport,
            exporter,
            sheet_id,
        }
    }

    /// Start a background export job and return immediately. The job owns
    /// its terminal notification: success with a link, success without
    /// one, or a generic failure.
    pub fn spawn(&self, chat: ChatId, owner_label: String, tasks: Vec<Task>, menu: Keyboard) {
        let transport = Arc::clone(&self.transport);
        let exporter = Arc::clone(&self.exporter);
        let sheet_id = self.sheet_id.clone();
        let job_id = Uuid::now_v7();

        tokio::spawn(async move {
            run_export(job_id, transport, exporter, sheet_id, chat, owner_label, tasks, menu).await;
        });
    }
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(%job_id, chat_id = %chat))]
async fn run_export(
    job_id: Uuid,
    transport: Arc<dyn ChatTransport>,
    exporter: Arc<dyn SheetExporter>,
    sheet_id: Option<String>,
    chat: ChatId,
    owner_label: String,
    tasks: Vec<Task>,
    menu: Keyboard,
) {
    info!(count = tasks.len(), "export job started");

    match exporter.export(&tasks, &owner_label).await {
        Ok(outcome) => {
            let (url, tab) = resolve_destination(&outcome, sheet_id.as_deref());
            match url {
                Some(url) => {
                    let mut text = format!("✅ Экспорт завершён. Открыть таблицу: {url}");
                    if let Some(tab) = tab {
                        text.push_str(&format!("\nВкладка: {tab}"));
                    }
                    notify(transport.as_ref(), chat, &text, menu).await;
                }
                None => {
                    notify(
                        transport.as_ref(),
                        chat,
                        "✅ Экспорт завершён, но ссылка не получена. Проверьте таблицу.",
                        menu,
                    )
                    .await;
                }
            }
            info!("export job finished");
        }
        Err(e) => {
            error!(error = %e, "export job failed");
            notify(
                transport.as_ref(),
                chat,
                "❌ Ошибка при экспорте. Попробуйте позже.",
                menu,
            )
            .await;
        }
    }
}

/// Send that never propagates: a failed notification is logged and dropped.
async fn notify(transport: &dyn ChatTransport, chat: ChatId, text: &str, keyboard: Keyboard) {
    if let Err(e) = transport.send(chat, text, Some(keyboard)).await {
        error!(chat_id = %chat, error = %e, "failed to deliver export notification");
    }
}

/// Normalize the collaborator's answer into `(url, tab label)`.
///
/// A bare string is already the destination URL. A structured answer may
/// carry the URL directly; failing that, a configured sheet id yields a
/// base URL, with `#gid=` appended when the extra reference is numeric.
pub fn resolve_destination(
    outcome: &ExportOutcome,
    sheet_id: Option<&str>,
) -> (Option<String>, Option<String>) {
    match outcome {
        ExportOutcome::Url(url) => (Some(url.clone()), None),
        ExportOutcome::Sheet {
            url,
            tab,
            gid,
            tab_name,
        } => {
            let label = tab
                .clone()
                .or_else(|| gid.clone())
                .or_else(|| tab_name.clone());

            let url = match url {
                Some(url) => Some(url.clone()),
                None => sheet_id.map(|sheet| {
                    let mut built = format!("https://docs.google.com/spreadsheets/d/{sheet}/edit");
                    if let Some(extra) = &label {
                        if !extra.is_empty() && extra.chars().all(|c| c.is_ascii_digit()) {
                            built.push_str(&format!("#gid={extra}"));
                        }
                    }
                    built
                }),
            };

            (url, label)
        }
    }
}
