//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{FromRequest, rejection::JsonRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

/// A JSON request body whose rejections are reported as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Find the engine error somewhere in a backend error's source chain.
fn engine_error<'a>(
  err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a hustings_core::Error> {
  let mut current = Some(err);
  while let Some(e) = current {
    if let Some(core) = e.downcast_ref::<hustings_core::Error>() {
      return Some(core);
    }
    current = e.source();
  }
  None
}

fn engine_status(err: &hustings_core::Error) -> StatusCode {
  use hustings_core::Error as E;
  match err {
    E::PersonNotFound(_)
    | E::VersionNotFound(_)
    | E::TargetVersionNotFound { .. }
    | E::EmptyLog(_) => StatusCode::NOT_FOUND,
    E::DuplicateVersionId(_) | E::AlreadyMerged(_) | E::CycleDetected { .. } => {
      StatusCode::CONFLICT
    }
    E::SelfMergeRejected(_) | E::InvalidVersionId(_) => StatusCode::BAD_REQUEST,
    E::MergeNotAuthorized => StatusCode::FORBIDDEN,
    E::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => match engine_error(&**e) {
        Some(core) => (engine_status(core), core.to_string()),
        None => {
          tracing::error!(error = %e, "store failure");
          (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
      },
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"hustings\""),
      );
    }
    res
  }
}
