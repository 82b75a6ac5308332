//! Handlers for `/people` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/people` | Body: `{"source": "...", "data": {...}}` |
//! | `GET`  | `/people/:id` | 308 to the surviving person if merged away |
//! | `GET`  | `/people/:id/versions` | Newest first, each with its diff |
//! | `POST` | `/people/:id/versions` | Body: `{"source": "...", "data": {...}}` |
//! | `POST` | `/people/:id/revert` | Body: `{"version_id": "...", "source": "..."}` |
//! | `POST` | `/people/:id/merge` | Body: `{"other": 123, "source": "..."}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use hustings_core::{
  log::VersionWithDiff,
  merge::{MergeOutcome, MergeRequest},
  person::PersonId,
  revert::RevertOutcome,
  snapshot::Snapshot,
  store::HistoryStore,
  version::VersionId,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::Authenticated,
  error::{ApiError, JsonBody},
  provenance::{ClientIp, change_metadata},
};

/// A person's current state as returned by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersonView {
  pub id:         PersonId,
  pub version_id: VersionId,
  pub data:       Snapshot,
}

/// An edit: the new state plus the editor's justification for it.
#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub source: String,
  pub data:   Snapshot,
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /people`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  user: Authenticated,
  ip: ClientIp,
  JsonBody(body): JsonBody<EditBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let metadata = change_metadata(&user, ip, body.source);
  let version_id = metadata.version_id;
  let id = state
    .store
    .create_person(body.data.clone(), metadata)
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(PersonView {
    id,
    version_id,
    data: body.data,
  })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /people/:id`
///
/// A merged-away id answers with a permanent redirect to the surviving
/// person. The location is relative so the router can be nested.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
) -> Result<Response, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let resolved = state.store.resolve(id).await.map_err(ApiError::store)?;
  if resolved != id {
    return Ok(Redirect::permanent(&resolved.to_string()).into_response());
  }

  let record = state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  let current = record.versions.current().map_err(ApiError::store)?;

  Ok(
    Json(PersonView {
      id,
      version_id: current.id(),
      data: current.data.clone(),
    })
    .into_response(),
  )
}

// ─── Versions ─────────────────────────────────────────────────────────────────

/// `GET /people/:id/versions`: a merged-away id shows the survivor's
/// history, which contains its own.
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
) -> Result<Json<Vec<VersionWithDiff>>, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let resolved = state.store.resolve(id).await.map_err(ApiError::store)?;
  let history = state.store.history(resolved).await.map_err(ApiError::store)?;
  Ok(Json(history))
}

#[derive(Debug, Serialize)]
pub struct Recorded {
  pub version_id: VersionId,
}

/// `POST /people/:id/versions`
pub async fn record<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
  user: Authenticated,
  ip: ClientIp,
  JsonBody(body): JsonBody<EditBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let metadata = change_metadata(&user, ip, body.source);
  let version_id = state
    .store
    .record_version(id, body.data, metadata)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(Recorded { version_id })))
}

// ─── Revert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RevertBody {
  pub version_id: VersionId,
  #[serde(default)]
  pub source:     String,
}

/// `POST /people/:id/revert`
pub async fn revert<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
  user: Authenticated,
  ip: ClientIp,
  JsonBody(body): JsonBody<RevertBody>,
) -> Result<Json<RevertOutcome>, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let source = if body.source.trim().is_empty() {
    format!("Reverting to version {}", body.version_id)
  } else {
    body.source
  };
  let metadata = change_metadata(&user, ip, source);
  let outcome = state
    .store
    .revert(id, body.version_id, metadata)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}

// ─── Merge ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MergeBody {
  /// The duplicate to fold into the person named in the path.
  pub other:  PersonId,
  #[serde(default)]
  pub source: Option<String>,
}

/// `POST /people/:id/merge`
pub async fn merge<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<PersonId>,
  user: Authenticated,
  ip: ClientIp,
  JsonBody(body): JsonBody<MergeBody>,
) -> Result<Json<MergeOutcome>, ApiError>
where
  S: HistoryStore + Clone + Send + Sync + 'static,
{
  let request = MergeRequest {
    metadata:  change_metadata(&user, ip, body.source.unwrap_or_default()),
    may_merge: user.trusted_to_merge,
  };
  let outcome = state
    .store
    .merge(id, body.other, request)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(outcome))
}
