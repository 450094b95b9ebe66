use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_ingest_store::config::AppConfig;
use repo_ingest_store::infrastructure::AppContainer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_ingest_store=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let container = AppContainer::new(config).await?;
    container.http_server().run().await
}
