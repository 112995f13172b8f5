//! Process start-up: tracing, storage selection and the HTTP listener.

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::razorpay::{RazorpayClient, TestModeGateway},
    app_state::AppState,
    config::AppConfig,
    db::{
        Repository,
        memory::MemoryRepository,
        pg::{self, PgRepository},
    },
    otp::MokaOtpStore,
    services::payments::PaymentGateway,
};

pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eyewear_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn repository(database_url: Option<&SecretString>) -> Result<Arc<dyn Repository>> {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL not set, keeping all data in memory");
        return Ok(Arc::new(MemoryRepository::new()));
    };

    tracing::info!("Running migrations...");
    let count = pg::run_migrations(database_url).await?;
    tracing::info!("Run {} new migrations successfully", count);

    let pool = pg::create_pool(database_url).await?;
    tracing::info!("Database pool created");
    Ok(Arc::new(PgRepository::new(pool)))
}

fn gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>> {
    let payment = &config.payment;
    match (&payment.key_id, &payment.key_secret) {
        (Some(key_id), Some(key_secret)) if !payment.test_mode => {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .context("Failed to build HTTP client")?;
            Ok(Arc::new(RazorpayClient::new(
                client,
                &config.api_urls.razorpay_api_url,
                key_id,
                key_secret.clone(),
            )))
        }
        _ => {
            tracing::warn!("Razorpay credentials missing or invalid, payments run in test mode");
            Ok(Arc::new(TestModeGateway))
        }
    }
}

/// Wires storage, the OTP store and the payment gateway for `config`.
pub async fn build_state(config: AppConfig) -> Result<AppState> {
    let repo = repository(config.database_url.as_ref()).await?;
    let otp_store = Arc::new(MokaOtpStore::new(config.otp_ttl));
    let gateway = gateway(&config)?;
    Ok(AppState::new(repo, otp_store, gateway, config))
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.socket_addr();
    let app = crate::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
