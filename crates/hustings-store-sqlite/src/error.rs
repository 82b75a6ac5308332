//! Error type for `hustings-store-sqlite`.

use hustings_core::person::{ElectionSlug, PersonId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] hustings_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("result {result_id} has an out-of-range vote count: {votes}")]
  VoteCount {
    result_id: i64,
    votes:     i64,
  },

  /// A result was submitted for an election the person is not standing in.
  #[error("person {person_id} is not standing in {election}")]
  NoCandidacy {
    person_id: PersonId,
    election:  ElectionSlug,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
