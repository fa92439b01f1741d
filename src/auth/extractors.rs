use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::ApiError;

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized("Missing Authorization header"))?;

    auth.strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized("Invalid Authorization header"))
}

fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;
    keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::Unauthorized("Invalid token")
    })
}

/// Verify the bearer token and attach its [`Claims`] to the request.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate(req.headers(), &keys)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Same as [`require_auth`] but the caller must also hold the admin role.
pub async fn require_admin(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate(req.headers(), &keys)?;
    if !claims.is_admin() {
        warn!(user_id = claims.user_id, role = %claims.role, "admin route refused");
        return Err(ApiError::Forbidden);
    }
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims of the authenticated caller, placed by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized("Missing Authorization header"))
    }
}
