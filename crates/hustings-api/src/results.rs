//! Handlers for election results attached to candidacies.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hustings_core::{
  person::{ElectionSlug, PersonId},
  store::{CandidacyResult, HistoryStore, NewResult},
};

use crate::{
  AppState,
  auth::Authenticated,
  error::{ApiError, JsonBody},
};

/// `GET /people/:id/results`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
) -> Result<Json<Vec<CandidacyResult>>, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let resolved = state.store.resolve(id).await.map_err(ApiError::store)?;
  let results = state.store.get_results(resolved).await.map_err(ApiError::store)?;
  Ok(Json(results))
}

/// `POST /people/:id/candidacies/:election/results` — body:
/// `{"votes": 22461, "elected": true}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path((id, election)): Path<(PersonId, ElectionSlug)>,
  _user: Authenticated,
  JsonBody(body): JsonBody<NewResult>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let record = state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  if !record.candidacies.contains(&election) {
    return Err(ApiError::NotFound(format!(
      "person {id} is not standing in {election}"
    )));
  }

  let result = state
    .store
    .add_result(id, election, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(result)))
}
