#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use eyewear_storefront::{
    api::razorpay::TestModeGateway,
    app,
    app_state::AppState,
    config::AppConfig,
    db::{UserRepository, memory::MemoryRepository},
    middleware::USER_ID_HEADER,
    models::{CreateUserEntity, UserEntity},
    otp::MokaOtpStore,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub otp_store: Arc<MokaOtpStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_tests())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let otp_store = Arc::new(MokaOtpStore::new(config.otp_ttl));
        let state = AppState::new(
            repo.clone(),
            otp_store.clone(),
            Arc::new(TestModeGateway),
            config,
        );
        Self {
            router: app(state),
            repo,
            otp_store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, user: Option<Uuid>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, user, Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: Option<Uuid>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, user, Some(body)).await
    }

    pub async fn get(&self, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, user, None).await
    }

    pub async fn delete(&self, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, user, None).await
    }

    pub async fn create_user(&self, role: &str, phone: &str) -> UserEntity {
        self.repo
            .create_user(CreateUserEntity {
                email: format!("{phone}@example.com"),
                phone: phone.to_string(),
                full_name: "Test User".to_string(),
                role: role.to_string(),
                business_name: (role == "seller").then(|| "Clear Sight Optics".to_string()),
                gst_number: None,
                business_address: None,
                business_license: None,
                company_name: None,
                reseller_type: None,
                tax_id: None,
                is_verified: true,
            })
            .await
            .unwrap()
    }
}
