use std::sync::Arc;

use tracing::{info, warn};

use optfin::api::{start_api_server, ApiState};
use optfin::config::AppConfig;
use optfin::observability::init_tracing;
use optfin::services::telegram::{ChatNotifier, NoopNotifier, TelegramClient};
use optfin::storage::create_pool;
use optfin::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.observability)?;

    info!(version = optfin::VERSION, "Starting {}", optfin::APP_NAME);

    let pool = create_pool(&config.database).await?;

    let notifier: Arc<dyn ChatNotifier> = match TelegramClient::from_config(&config.telegram) {
        Some(client) => Arc::new(client),
        None => {
            warn!("Telegram bridge not configured, chat messages will only be logged");
            Arc::new(NoopNotifier)
        }
    };

    let state = ApiState::new(config, pool, notifier);
    start_api_server(state).await
}
