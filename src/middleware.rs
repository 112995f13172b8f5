//! Caller identity.
//!
//! The storefront trusts the `x-user-id` header set by the front end. Only
//! [`user_authorization`] reads it; handlers receive the result as
//! `Extension<UserId>`, so a token verifier can replace this module without
//! touching them.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{app_error::AppError, app_state::AppState, domain::Role, models::UserEntity};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// Rejects requests without a well-formed `x-user-id` header and exposes the
/// caller as `Extension<UserId>`.
pub async fn user_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("User ID required".to_string()))?;

    req.extensions_mut().insert(UserId(user_id));
    Ok(next.run(req).await)
}

/// The caller, loaded and confirmed to have the `seller` role.
#[derive(Debug, Clone)]
pub struct Seller(pub UserEntity);

impl FromRequestParts<AppState> for Seller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let UserId(user_id) = parts
            .extensions
            .get::<UserId>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("User ID required".to_string()))?;

        match state.repo.find_user(user_id).await? {
            Some(user) if user.role == Role::Seller.as_str() => Ok(Seller(user)),
            _ => Err(AppError::ForbiddenResource(
                "Unauthorized - Seller access only".to_string(),
            )),
        }
    }
}
