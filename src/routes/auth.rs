use anyhow::Context;
use axum::{extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    db::RepositoryError,
    domain::ContactIdentifier,
    extract::Json,
    models::UserEntity,
    otp::OtpKey,
    services::auth::{OtpError, check_otp, consume_otp, issue_otp},
    validation::{
        Registration, RegistrationForm, validate_identifier, validate_otp, validate_registration,
    },
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(register))
            .routes(utoipa_axum::routes!(send_otp))
            .routes(utoipa_axum::routes!(verify_login))
            .routes(utoipa_axum::routes!(verify_otp)),
    )
}

/// Issues a code and returns it for echoing in development only.
async fn issue(
    state: &AppState,
    key: OtpKey,
    payload: Option<serde_json::Value>,
) -> Result<Option<String>, AppError> {
    let ttl =
        chrono::Duration::from_std(state.config.otp_ttl).context("OTP lifetime out of range")?;
    let code = issue_otp(state.otp_store.as_ref(), key, ttl, payload).await;
    if state.config.is_production() {
        return Ok(None);
    }
    tracing::debug!(otp = %code, "OTP generated");
    Ok(state.config.is_development().then_some(code))
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Serialize, ToSchema)]
pub struct OtpSentRes {
    /// Echo of the code, present only in development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_otp: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserRes {
    pub user: UserEntity,
}

/// Validate a registration form and send a registration OTP to its mobile number.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegistrationForm,
    responses(
        (status = 200, description = "OTP sent", body = OtpSentRes),
        (status = 400, description = "Registration form failed validation")
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> Result<impl IntoResponse, AppError> {
    let registration = validate_registration(form)?;
    let payload =
        serde_json::to_value(&registration).context("Failed to serialize registration")?;

    let key = OtpKey::registration(&registration.mobile);
    let dev_otp = issue(&state, key, Some(payload)).await?;
    tracing::info!(role = %registration.profile.role(), "Registration OTP issued");

    Ok(StdResponse::with_message(
        OtpSentRes { dev_otp },
        "OTP sent successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct SendOtpReq {
    /// E-mail address or 10-digit mobile number.
    pub identifier: Option<String>,
}

/// Send a login OTP to an e-mail address or mobile number.
#[utoipa::path(
    post,
    path = "/send-otp",
    tags = ["Auth"],
    request_body = SendOtpReq,
    responses(
        (status = 200, description = "OTP sent", body = OtpSentRes),
        (status = 400, description = "Missing or malformed identifier")
    )
)]
async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpReq>,
) -> Result<impl IntoResponse, AppError> {
    let identifier = required(body.identifier).ok_or_else(|| {
        AppError::BadRequest("Email or mobile number is required".to_string())
    })?;
    validate_identifier(&identifier)?;

    let dev_otp = issue(&state, OtpKey::login(&identifier), None).await?;
    tracing::info!("Login OTP issued");

    Ok(StdResponse::with_message(
        OtpSentRes { dev_otp },
        "OTP sent successfully",
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyLoginReq {
    pub identifier: Option<String>,
    pub otp: Option<String>,
}

/// Verify a login OTP and return the matching user.
#[utoipa::path(
    post,
    path = "/verify-login",
    tags = ["Auth"],
    request_body = VerifyLoginReq,
    responses(
        (status = 200, description = "Login successful", body = UserRes),
        (status = 400, description = "OTP missing, expired or wrong"),
        (status = 404, description = "No user with this identifier")
    )
)]
async fn verify_login(
    State(state): State<AppState>,
    Json(body): Json<VerifyLoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(identifier), Some(otp)) = (required(body.identifier), required(body.otp)) else {
        return Err(AppError::BadRequest(
            "Identifier and OTP are required".to_string(),
        ));
    };
    validate_otp(&otp)?;

    // consumed before the lookup, so an unknown user still burns the code
    consume_otp(state.otp_store.as_ref(), &OtpKey::login(&identifier), &otp).await?;

    let user = match ContactIdentifier::parse(&identifier) {
        ContactIdentifier::Email(email) => state.repo.find_user_by_email(&email).await?,
        ContactIdentifier::Phone(phone) => state.repo.find_user_by_phone(&phone).await?,
    }
    .ok_or_else(|| AppError::NotFound("User not found. Please register first.".to_string()))?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(StdResponse::with_message(UserRes { user }, "Login successful"))
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpReq {
    pub mobile: Option<String>,
    pub otp: Option<String>,
}

/// Verify a registration OTP and create the account from the stored registration.
#[utoipa::path(
    post,
    path = "/verify-otp",
    tags = ["Auth"],
    request_body = VerifyOtpReq,
    responses(
        (status = 200, description = "Registration successful", body = UserRes),
        (status = 400, description = "OTP missing, expired or wrong, or user already exists")
    )
)]
async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpReq>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(mobile), Some(otp)) = (required(body.mobile), required(body.otp)) else {
        return Err(AppError::BadRequest(
            "Mobile number and OTP are required".to_string(),
        ));
    };
    validate_otp(&otp)?;

    let key = OtpKey::registration(&mobile);
    let record = check_otp(state.otp_store.as_ref(), &key, &otp).await?;
    let registration: Registration = record
        .payload
        .map(serde_json::from_value)
        .transpose()
        .context("Stored registration is corrupt")?
        .ok_or(OtpError::Missing)?;

    if state
        .repo
        .find_user_by_phone(&registration.mobile)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "User already exists with this phone number".to_string(),
        ));
    }

    let user = match state.repo.create_user(registration.into_new_user()).await {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AppError::BadRequest(
                "User already exists with this email or phone number".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    state.otp_store.delete(&key).await;
    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(StdResponse::with_message(
        UserRes { user },
        "Registration successful",
    ))
}
