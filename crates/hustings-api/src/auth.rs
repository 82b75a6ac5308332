//! HTTP Basic-auth extractor and standalone verifier.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use hustings_core::store::HistoryStore;
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// One account allowed to edit.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  pub username:         String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash:    String,
  /// Whether this user may merge people.
  #[serde(default)]
  pub trusted_to_merge: bool,
}

/// Credentials accepted as valid for this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub users: Vec<UserConfig>,
}

impl AuthConfig {
  fn user(&self, username: &str) -> Option<&UserConfig> {
    self.users.iter().find(|u| u.username == username)
  }
}

/// The authenticated editor making this request.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub username:         String,
  pub trusted_to_merge: bool,
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Authenticated, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  let user = config.user(username).ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&user.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(Authenticated {
    username:         user.username.clone(),
    trusted_to_merge: user.trusted_to_merge,
  })
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)
  }
}
