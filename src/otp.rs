//! Pending one-time codes.
//!
//! Codes live only in process memory and are lost on restart. The store is
//! injected through [`OtpStore`]. [`MokaOtpStore`] keeps an entry for
//! [`EXPIRED_RETENTION`] past its `expires_at` before evicting it, so a late
//! code is still found and rejected as expired rather than unknown.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use rand::Rng;
use serde_json::Value;

/// Separate namespaces, so a registration code never satisfies a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    Registration,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub purpose: OtpPurpose,
    pub identifier: String,
}

impl OtpKey {
    pub fn registration(mobile: &str) -> Self {
        Self {
            purpose: OtpPurpose::Registration,
            identifier: mobile.trim().to_string(),
        }
    }

    pub fn login(identifier: &str) -> Self {
        Self {
            purpose: OtpPurpose::Login,
            identifier: identifier.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    /// Registration payload awaiting verification.
    pub payload: Option<Value>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Uniformly random six-digit code.
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn set(&self, key: OtpKey, record: OtpRecord);

    /// `None` both for codes that were never issued and for purged ones.
    async fn get(&self, key: &OtpKey) -> Option<OtpRecord>;

    /// Removes the entry. Returns whether this call removed it, so two
    /// concurrent verifications cannot both consume the same code.
    async fn delete(&self, key: &OtpKey) -> bool;
}

/// How long an expired record stays in [`MokaOtpStore`] before eviction.
pub const EXPIRED_RETENTION: Duration = Duration::from_secs(10 * 60);

pub struct MokaOtpStore {
    cache: Cache<OtpKey, OtpRecord>,
}

impl MokaOtpStore {
    /// `ttl` is the code validity; eviction happens [`EXPIRED_RETENTION`] later.
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl.saturating_add(EXPIRED_RETENTION))
            .build();
        Self { cache }
    }
}

#[async_trait]
impl OtpStore for MokaOtpStore {
    async fn set(&self, key: OtpKey, record: OtpRecord) {
        self.cache.insert(key, record).await;
    }

    async fn get(&self, key: &OtpKey) -> Option<OtpRecord> {
        self.cache.get(key).await
    }

    async fn delete(&self, key: &OtpKey) -> bool {
        self.cache.remove(key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str) -> OtpRecord {
        OtpRecord {
            code: code.to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(30),
            payload: None,
        }
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[test]
    fn expiry_is_strict() {
        let now = Utc::now();
        let record = OtpRecord {
            code: "123456".into(),
            expires_at: now,
            payload: None,
        };
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + chrono::Duration::seconds(1)));
    }

    #[tokio::test]
    async fn namespaces_do_not_collide() {
        let store = MokaOtpStore::new(Duration::from_secs(60));
        store
            .set(OtpKey::registration("9876543210"), record("111111"))
            .await;

        assert!(store.get(&OtpKey::login("9876543210")).await.is_none());
        assert_eq!(
            store
                .get(&OtpKey::registration("9876543210"))
                .await
                .unwrap()
                .code,
            "111111"
        );
    }

    #[tokio::test]
    async fn delete_succeeds_once() {
        let store = MokaOtpStore::new(Duration::from_secs(60));
        let key = OtpKey::login("asha@example.com");
        store.set(key.clone(), record("222222")).await;

        assert!(store.delete(&key).await);
        assert!(!store.delete(&key).await);
        assert!(store.get(&key).await.is_none());
    }
}
