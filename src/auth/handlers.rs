use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, EMAIL_TAKEN},
        extractors::AuthUser,
        repo_types::User,
        services::CredentialError,
        tokens::TokenIssuer,
    },
    error::{ApiError, ApiResult},
    extract::JsonBody,
    state::AppState,
    validation::FieldErrors,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes that must sit behind the auth gate.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/user", get(current_user))
}

fn email_taken() -> ApiError {
    let mut errors = FieldErrors::new();
    errors.add("email", EMAIL_TAKEN);
    ApiError::Validation(errors)
}

/// A concurrent insert of the same email surfaces as the validation error.
fn registration_error(e: CredentialError) -> ApiError {
    match e {
        CredentialError::DuplicateEmail => email_taken(),
        CredentialError::InvalidCredentials => {
            ApiError::Internal(anyhow::anyhow!("unexpected credential failure while registering"))
        }
        CredentialError::Storage(e) => ApiError::Internal(e),
    }
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let mut check = payload.check();
    if let Some(email) = check.email.clone() {
        if state.credentials.email_taken(&email).await? {
            warn!(email = %email, "email already registered");
            check.reject_email_taken();
        }
    }
    let registration = check.finish()?;

    let user = state
        .credentials
        .create_user(&registration.name, &registration.email, &registration.password)
        .await
        .map_err(registration_error)?;

    let issued = state.tokens.issue(&user).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            access_token: issued.secret,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let login = payload.validate()?;

    let user = match state
        .credentials
        .verify_credentials(&login.email, &login.password)
        .await
    {
        Ok(user) => user,
        Err(CredentialError::Storage(e)) => return Err(ApiError::Internal(e)),
        Err(_) => {
            warn!(email = %login.email, "login failed");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let issued = state.tokens.issue(&user).await?;

    info!(user_id = user.id, token_id = %issued.token.id, "user logged in");
    Ok(Json(AuthResponse {
        user,
        access_token: issued.secret,
    }))
}

#[instrument(skip_all, fields(user_id = auth.user.id))]
pub async fn logout(
    State(issuer): State<TokenIssuer>,
    AuthUser(auth): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    issuer.revoke_id(auth.token_id).await?;
    info!(token_id = %auth.token_id, "user logged out");
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

#[instrument(skip_all, fields(user_id = auth.user.id))]
pub async fn current_user(AuthUser(auth): AuthUser) -> Json<User> {
    Json(auth.user)
}
