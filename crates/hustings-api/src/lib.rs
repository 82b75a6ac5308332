//! JSON HTTP API for Hustings.
//!
//! Exposes an axum [`Router`] backed by any [`HistoryStore`]. Writes require
//! HTTP Basic credentials from the configured user list; merging additionally
//! requires a user marked `trusted_to_merge`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", hustings_api::router(state))
//! ```

pub mod auth;
pub mod error;
pub mod people;
pub mod provenance;
pub mod redirects;
pub mod results;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use hustings_core::store::HistoryStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, UserConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserConfig>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: HistoryStore> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S: HistoryStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let auth = AuthConfig {
      users: config.users,
    };
    Self {
      store: Arc::new(store),
      auth:  Arc::new(auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // People
    .route("/people", post(people::create::<S>))
    .route("/people/{id}", get(people::get_one::<S>))
    .route(
      "/people/{id}/versions",
      get(people::history::<S>).post(people::record::<S>),
    )
    .route("/people/{id}/revert", post(people::revert::<S>))
    .route("/people/{id}/merge", post(people::merge::<S>))
    // Results
    .route("/people/{id}/results", get(results::list::<S>))
    .route(
      "/people/{id}/candidacies/{election}/results",
      post(results::create::<S>),
    )
    // Redirects
    .route("/redirects", get(redirects::list::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
