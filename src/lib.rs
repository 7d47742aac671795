pub mod config;
pub mod db;
pub mod error;
pub mod faq;
pub mod relay;
pub mod server;

use config::AppConfig;
use faq::FaqStore;
use relay::upstream::UpstreamClient;
use relay::Relay;
use server::AppState;

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env();
    let pool = db::init_pool(&config.database_path).await?;
    let config = config.overlay_from_db(&pool).await?;

    if config.upstream.api_key.is_none() {
        log::warn!("OPENAI_API_KEY is not set; /api/chat will answer with an error");
    }
    log::info!(
        "Using model {} at {}",
        config.upstream.model,
        config.upstream.base_url
    );

    let upstream = UpstreamClient::new(reqwest::Client::new(), config.upstream.clone());
    let relay = Relay::new(FaqStore::new(pool), upstream);

    server::start(AppState::new(relay), config.server_port).await
}
