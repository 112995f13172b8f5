//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `DATABASE_URL` - `PostgreSQL` connection string. Without it the service
//!   keeps everything in memory; required in production.
//! - `RAZORPAY_API_URL` - Gateway base URL (default: https://api.razorpay.com/v1)
//! - `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` - Gateway credentials. Missing or
//!   malformed credentials put payments in test mode, which production refuses.
//! - `OTP_TTL_SECS` - One-time code validity, 1 to 86400 seconds (default: 1800)

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    ops::RangeInclusive,
    str::FromStr,
    time::Duration,
};

use secrecy::SecretString;
use thiserror::Error;

use crate::api::{ApiUrls, DEFAULT_RAZORPAY_API_URL};

const OTP_TTL_RANGE: RangeInclusive<u64> = 1..=86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Refusing to start in production: {0}")]
    UnsafeForProduction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(format!("unknown environment `{other}`")),
        }
    }
}

/// Razorpay credentials. Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct PaymentConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<SecretString>,
    /// Orders are mocked and the verify bypass flag is honoured.
    pub test_mode: bool,
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &self.key_secret.as_ref().map(|_| "[REDACTED]"))
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

impl PaymentConfig {
    /// A usable key id looks like `rzp_test_...` / `rzp_live_...`.
    fn has_valid_keys(key_id: Option<&str>, key_secret: Option<&SecretString>) -> bool {
        matches!(key_id, Some(id) if id.starts_with("rzp_") && id.len() > 20)
            && key_secret.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: AppEnv,
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<SecretString>,
    pub api_urls: ApiUrls,
    pub payment: PaymentConfig,
    pub otp_ttl: Duration,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let env = parse("APP_ENV", &get_or("APP_ENV", "development"))?;
        let host = parse("HOST", &get_or("HOST", "0.0.0.0"))?;
        let port = parse("PORT", &get_or("PORT", "3000"))?;
        let otp_ttl_secs: u64 = parse("OTP_TTL_SECS", &get_or("OTP_TTL_SECS", "1800"))?;
        if !OTP_TTL_RANGE.contains(&otp_ttl_secs) {
            return Err(ConfigError::InvalidEnvVar(
                "OTP_TTL_SECS".to_string(),
                format!(
                    "must be between {} and {} seconds",
                    OTP_TTL_RANGE.start(),
                    OTP_TTL_RANGE.end()
                ),
            ));
        }
        let database_url = get("DATABASE_URL").map(SecretString::from);

        let key_id = get("RAZORPAY_KEY_ID");
        let key_secret = get("RAZORPAY_KEY_SECRET").map(SecretString::from);
        let test_mode = !PaymentConfig::has_valid_keys(key_id.as_deref(), key_secret.as_ref());

        let config = Self {
            env,
            host,
            port,
            database_url,
            api_urls: ApiUrls {
                razorpay_api_url: get_or("RAZORPAY_API_URL", DEFAULT_RAZORPAY_API_URL),
            },
            payment: PaymentConfig {
                key_id,
                key_secret,
                test_mode,
            },
            otp_ttl: Duration::from_secs(otp_ttl_secs),
        };
        config.check_production()?;
        Ok(config)
    }

    fn check_production(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }
        if self.payment.test_mode {
            return Err(ConfigError::UnsafeForProduction(
                "payment test mode requires valid RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnv::Production
    }

    pub fn is_development(&self) -> bool {
        self.env == AppEnv::Development
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Settings used by the test-suite: development, in-memory, payment test mode.
    pub fn for_tests() -> Self {
        Self {
            env: AppEnv::Development,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            database_url: None,
            api_urls: ApiUrls::default(),
            payment: PaymentConfig {
                key_id: None,
                key_secret: None,
                test_mode: true,
            },
            otp_ttl: Duration::from_secs(1800),
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert!(config.is_development());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.otp_ttl, Duration::from_secs(1800));
        assert_eq!(config.api_urls.razorpay_api_url, DEFAULT_RAZORPAY_API_URL);
        assert!(config.database_url.is_none());
        assert!(config.payment.test_mode);
    }

    #[test]
    fn malformed_key_id_means_test_mode() {
        let config = load(&[
            ("RAZORPAY_KEY_ID", "rzp_short"),
            ("RAZORPAY_KEY_SECRET", "s3cr3t"),
        ])
        .unwrap();
        assert!(config.payment.test_mode);

        let config = load(&[
            ("RAZORPAY_KEY_ID", "rzp_test_1234567890abcd"),
            ("RAZORPAY_KEY_SECRET", "s3cr3t"),
        ])
        .unwrap();
        assert!(!config.payment.test_mode);
    }

    #[test]
    fn production_refuses_test_mode() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://localhost/shop"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsafeForProduction(_)));
    }

    #[test]
    fn production_requires_database() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("RAZORPAY_KEY_ID", "rzp_live_1234567890abcd"),
            ("RAZORPAY_KEY_SECRET", "s3cr3t"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_port() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "PORT"));
    }

    #[test]
    fn otp_ttl_out_of_range() {
        for value in ["0", "86401", "18446744073709551615"] {
            let err = load(&[("OTP_TTL_SECS", value)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "OTP_TTL_SECS"));
        }
        let config = load(&[("OTP_TTL_SECS", "86400")]).unwrap();
        assert_eq!(config.otp_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = load(&[
            ("RAZORPAY_KEY_ID", "rzp_test_1234567890abcd"),
            ("RAZORPAY_KEY_SECRET", "hunter2-hunter2"),
        ])
        .unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
