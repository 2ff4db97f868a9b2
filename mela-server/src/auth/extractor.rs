//! Caller identity extractor

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;
use shared::models::CurrentUser;

use super::{JwtError, JwtService};
use crate::state::AppState;

/// Validates the bearer token and yields the caller.
///
/// Handlers take `CurrentUser` as an argument and pass it explicitly into
/// the engine, dispatcher and cart operations.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                tracing::debug!(uri = %parts.uri, "Missing authorization header");
                return Err(AppError::not_authenticated());
            }
        };

        let user = authenticate(&state.jwt, token)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Validate a raw token (header or `?token=` query) into the caller
pub fn authenticate(jwt: &JwtService, token: &str) -> Result<CurrentUser, AppError> {
    match jwt.validate_token(token) {
        Ok(claims) => Ok(claims.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Token validation failed");
            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}
