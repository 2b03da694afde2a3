//! Bearer token authentication

use std::sync::Arc;

use axum::extract::FromRequestParts;
use http::header::AUTHORIZATION;
use http::request::Parts;
use secrecy::SecretString;
use tracing::debug;

use crate::errors::DeployError;
use crate::permission::User;
use crate::server::state::ServerState;

/// The caller behind an `Authorization: bearer <token>` header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<ServerState>> for CurrentUser {
    type Rejection = DeployError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            DeployError::Unauthorized("You must provide a valid Authorization header".to_string())
        })?;

        match state.users.authenticate(&token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                debug!("Rejected request with unknown token");
                Err(DeployError::Unauthorized("invalid token".to_string()))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<SecretString> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(SecretString::from(token.to_string()))
}
