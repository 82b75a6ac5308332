//! `GET /redirects` — every merged-away person and where it went.

use axum::{Json, extract::State};
use hustings_core::{redirect::RedirectEntry, store::HistoryStore};

use crate::{AppState, error::ApiError};

pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<RedirectEntry>>, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let entries = state.store.list_redirects().await.map_err(ApiError::store)?;
  Ok(Json(entries))
}
