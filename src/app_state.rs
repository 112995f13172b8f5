use std::sync::Arc;

use crate::{
    config::AppConfig, db::Repository, otp::OtpStore, services::payments::PaymentGateway,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub otp_store: Arc<dyn OtpStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        otp_store: Arc<dyn OtpStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
    ) -> Self {
        Self {
            repo,
            otp_store,
            gateway,
            config: Arc::new(config),
        }
    }
}
