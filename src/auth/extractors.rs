use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{
        repo_types::User,
        tokens::{TokenError, TokenIssuer},
    },
    error::ApiError,
};

/// Identity bound to a single request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub token_id: Uuid,
}

/// Reads `Authorization: Bearer <secret>`. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Gate for protected routes: resolves the bearer token or answers 401.
pub async fn require_auth(
    State(issuer): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(secret) = bearer_token(request.headers()).map(str::to_owned) else {
        debug!(uri = %request.uri(), "missing or malformed bearer token");
        return Err(ApiError::Unauthenticated);
    };

    let (user, token) = match issuer.resolve(&secret).await {
        Ok(found) => found,
        Err(TokenError::Invalid) => {
            warn!(uri = %request.uri(), "rejected bearer token");
            return Err(ApiError::Unauthenticated);
        }
        Err(TokenError::Storage(e)) => return Err(ApiError::Internal(e)),
    };

    request.extensions_mut().insert(AuthContext {
        user,
        token_id: token.id,
    });
    Ok(next.run(request).await)
}

/// The authenticated caller of a protected route.
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthenticated)
    }
}
