//! Razorpay Orders API client.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::services::payments::{
    GatewayOrder, GatewayOrderRequest, PaymentError, PaymentGateway, mock_order,
};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

impl RazorpayClient {
    pub fn new(client: Client, base_url: &str, key_id: &str, key_secret: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn is_test_mode(&self) -> bool {
        false
    }

    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentError> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": { "order_id": request.receipt },
        });

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(PaymentError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => envelope
                    .error
                    .description
                    .or(envelope.error.code)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(PaymentError::Gateway(message));
        }

        let order = response.json::<GatewayOrder>().await?;
        tracing::info!(gateway_order_id = %order.id, amount = order.amount, "Gateway order created");
        Ok(order)
    }
}

/// Gateway used when no usable credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct TestModeGateway;

#[async_trait]
impl PaymentGateway for TestModeGateway {
    fn is_test_mode(&self) -> bool {
        true
    }

    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentError> {
        Ok(mock_order(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let client = RazorpayClient::new(
            Client::new(),
            "https://api.razorpay.com/v1/",
            "rzp_test_abcdefghijklmnop",
            SecretString::from("super-secret".to_string()),
        );
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("https://api.razorpay.com/v1\""));
    }

    #[tokio::test]
    async fn test_mode_gateway_mocks_orders() {
        let order = TestModeGateway
            .create_order(GatewayOrderRequest {
                amount: 50_000,
                currency: "INR".into(),
                receipt: None,
            })
            .await
            .unwrap();
        assert_eq!(order.amount, 50_000);
        assert_eq!(order.amount_paid, 0);
    }
}
