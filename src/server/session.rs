use super::state::ServerState;
use crate::error::ServiceError;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

/// The authenticated caller of a protected route.
#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
}

const BEARER_PREFIX: &str = "Bearer ";

/// Returns the token of a well formed `Authorization: Bearer <token>` header.
fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(parts) else {
            debug!("No bearer token in headers.");
            return Err(ServiceError::Unauthenticated);
        };
        let user_id = ctx.user_manager.authenticate(token)?;
        Ok(Session { user_id })
    }
}
