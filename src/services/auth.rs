//! OTP issue and verification.

use chrono::{Duration, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::otp::{OtpKey, OtpRecord, OtpStore, generate_otp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    /// Never issued, already used, or purged after expiry.
    #[error("OTP expired or invalid. Please request a new OTP.")]
    Missing,

    #[error("OTP expired. Please request a new OTP.")]
    Expired,

    #[error("Invalid OTP. Please check and try again.")]
    Mismatch,
}

/// Stores a fresh code under `key`, replacing any pending one, and returns it.
pub async fn issue_otp(
    store: &dyn OtpStore,
    key: OtpKey,
    ttl: Duration,
    payload: Option<Value>,
) -> String {
    let code = generate_otp();
    tracing::debug!(purpose = ?key.purpose, identifier = %key.identifier, "Issuing OTP");
    store
        .set(
            key,
            OtpRecord {
                code: code.clone(),
                expires_at: Utc::now() + ttl,
                payload,
            },
        )
        .await;
    code
}

/// Checks `submitted` against the pending code without consuming it.
/// An expired entry is removed.
pub async fn check_otp(
    store: &dyn OtpStore,
    key: &OtpKey,
    submitted: &str,
) -> Result<OtpRecord, OtpError> {
    let record = store.get(key).await.ok_or(OtpError::Missing)?;

    if record.is_expired(Utc::now()) {
        store.delete(key).await;
        return Err(OtpError::Expired);
    }
    if record.code != submitted {
        return Err(OtpError::Mismatch);
    }
    Ok(record)
}

/// Checks and removes the pending code. Of two concurrent callers with the
/// right code, only one succeeds.
pub async fn consume_otp(
    store: &dyn OtpStore,
    key: &OtpKey,
    submitted: &str,
) -> Result<OtpRecord, OtpError> {
    let record = check_otp(store, key, submitted).await?;
    if !store.delete(key).await {
        return Err(OtpError::Missing);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use super::*;
    use crate::otp::MokaOtpStore;

    fn store() -> MokaOtpStore {
        MokaOtpStore::new(StdDuration::from_secs(60))
    }

    #[tokio::test]
    async fn verifies_exactly_once() {
        let store = store();
        let key = OtpKey::login("asha@example.com");
        let code = issue_otp(&store, key.clone(), Duration::minutes(30), None).await;

        assert!(consume_otp(&store, &key, &code).await.is_ok());
        assert_eq!(
            consume_otp(&store, &key, &code).await.unwrap_err(),
            OtpError::Missing
        );
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_removed() {
        let store = store();
        let key = OtpKey::login("9876543210");
        let code = issue_otp(&store, key.clone(), Duration::seconds(-1), None).await;

        assert_eq!(
            check_otp(&store, &key, &code).await.unwrap_err(),
            OtpError::Expired
        );
        assert!(store.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn wrong_code_keeps_the_entry() {
        let store = store();
        let key = OtpKey::registration("9876543210");
        let code = issue_otp(&store, key.clone(), Duration::minutes(30), None).await;
        let wrong = if code == "999999" { "100000" } else { "999999" };

        assert_eq!(
            consume_otp(&store, &key, wrong).await.unwrap_err(),
            OtpError::Mismatch
        );
        assert!(consume_otp(&store, &key, &code).await.is_ok());
    }

    #[tokio::test]
    async fn reissue_replaces_pending_code() {
        let store = store();
        let key = OtpKey::login("9876543210");
        let first = issue_otp(&store, key.clone(), Duration::minutes(30), None).await;
        let second = issue_otp(&store, key.clone(), Duration::minutes(30), None).await;

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.code, second);
        if first != second {
            assert_eq!(
                check_otp(&store, &key, &first).await.unwrap_err(),
                OtpError::Mismatch
            );
        }
    }
}
