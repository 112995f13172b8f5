use anyhow::Result;
use eyewear_storefront::{bootstrap, config::AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(env = ?config.env, test_mode = config.payment.test_mode, "Configuration loaded");

    tracing::info!("Bootstrapping...");
    let state = bootstrap::build_state(config).await?;
    bootstrap::serve(state).await
}
