//! Startup helpers for the FireflyChat backend.

use std::process::ExitCode;
use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::llm::OpenAiClient;
use crate::server::{self, AppState};
use crate::storage::SqliteChatStore;

/// Run the backend server.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting FireflyChat v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::from(1);
    }
    tracing::info!("Database path: {}", config.db_path.display());

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create data directory: {e}");
                return ExitCode::from(1);
            }
        }
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let state = initialize(&config).await?;
        server::run_server(state, config.port).await
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if the store or the completion client cannot be created.
pub async fn initialize(
    config: &AppConfig,
) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let store = SqliteChatStore::open(&config.db_path).await?;
    let backend = OpenAiClient::new(&config.llm)?;
    let service = ChatService::new(Arc::new(store), Arc::new(backend), config.chat.clone());
    Ok(AppState::new(service))
}
