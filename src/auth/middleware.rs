use crate::types::{Actor, AppError, Result};
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| Some(token.trim()))
        .ok_or_else(|| AppError::Auth("Authorization header must be 'Bearer <token>'".to_string()))
}

/// Verifies a token and loads the user it names.
async fn resolve_actor(state: &AppState, token: &str) -> Result<Actor> {
    let identity = state.auth_service.decode(token)?;

    let user = state
        .turso
        .get_user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::Auth("Session user no longer exists".to_string()))?;

    Ok(user.actor())
}

/// Requires a valid bearer token and injects the resolved [`Actor`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(req.headers())?
        .map(str::to_owned)
        .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

    let actor = resolve_actor(&state, &token).await?;
    tracing::debug!(user_id = actor.id, role = %actor.role, "session resolved");

    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Injects an [`Actor`] when a bearer token is present. A token that is
/// present but invalid is still rejected.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(req.headers())?.map(str::to_owned);
    if let Some(token) = token {
        let actor = resolve_actor(&state, &token).await?;
        req.extensions_mut().insert(actor);
    }

    Ok(next.run(req).await)
}

// Extractors for the resolved actor

pub struct AuthUser(pub Actor);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))
    }
}

pub struct MaybeAuthUser(pub Option<Actor>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<Actor>().cloned()))
    }
}
