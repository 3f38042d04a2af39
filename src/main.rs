use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use taskbot_core::export::SheetExporter;
use taskbot_core::ids::ChatId;
use taskbot_engine::{ConversationController, ExportCoordinator, InMemorySessionStore};
use taskbot_gateway::client::{BotClient, DEFAULT_API_BASE};
use taskbot_gateway::exporter::{HttpSheetExporter, UnconfiguredExporter};
use taskbot_gateway::poller::UpdatePoller;
use taskbot_store::Database;
use taskbot_telemetry::{init_telemetry, TelemetryConfig};

/// Personal task assistant operated through a chat interface.
#[derive(Debug, Parser)]
#[command(name = "taskbot", version)]
struct Cli {
    /// Bot API token.
    #[arg(long, env = "BOT_TOKEN")]
    bot_token: String,

    /// SQLite database path.
    #[arg(long, env = "TASKBOT_DB", default_value = "/data/tasks.db")]
    db_path: PathBuf,

    /// Comma-separated chat ids with admin privileges.
    #[arg(long, env = "ADMIN_IDS", value_delimiter = ',')]
    admin_ids: Vec<i64>,

    /// Spreadsheet document id used to build result links.
    #[arg(long, env = "SHEET_ID")]
    sheet_id: Option<String>,

    /// Export bridge endpoint; export jobs fail gracefully when unset.
    #[arg(long, env = "EXPORT_URL")]
    export_url: Option<String>,

    /// Bot API base URL override (local emulators, tests).
    #[arg(long, env = "TELEGRAM_API", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[arg(long, env = "TASKBOT_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        json: cli.log_json,
        ..Default::default()
    });
    tracing::info!("starting taskbot");

    let db = Database::open(&cli.db_path)?;

    let client = Arc::new(BotClient::new(
        SecretString::from(cli.bot_token),
        cli.api_base,
    ));

    let exporter: Arc<dyn SheetExporter> = match &cli.export_url {
        Some(url) => Arc::new(HttpSheetExporter::new(url.clone())),
        None => {
            tracing::warn!("EXPORT_URL not set, export jobs will report a failure");
            Arc::new(UnconfiguredExporter)
        }
    };
    let exports = ExportCoordinator::new(client.clone(), exporter, cli.sheet_id);

    let sessions = Arc::new(InMemorySessionStore::new());
    let admins: HashSet<ChatId> = cli.admin_ids.iter().copied().map(ChatId).collect();
    if admins.is_empty() {
        tracing::warn!("no admin chat ids configured, the admin menu is unreachable");
    }

    let controller = Arc::new(ConversationController::new(
        db,
        sessions,
        client.clone(),
        exports,
        admins,
    ));

    let shutdown = CancellationToken::new();
    let poller = UpdatePoller::new(client, controller, shutdown.clone());
    let poll_task = tokio::spawn(async move { poller.run().await });

    tracing::info!("taskbot ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    shutdown.cancel();
    let _ = poll_task.await;

    Ok(())
}
