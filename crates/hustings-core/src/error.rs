//! Error types for `hustings-core`.

use thiserror::Error;

use crate::{person::PersonId, version::VersionId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("version {0} already exists")]
  DuplicateVersionId(VersionId),

  #[error("version {0} not found")]
  VersionNotFound(VersionId),

  #[error("couldn't find version {version} of person {person_id}")]
  TargetVersionNotFound {
    person_id: PersonId,
    version:   VersionId,
  },

  #[error("can't merge person {0} with themself")]
  SelfMergeRejected(PersonId),

  #[error("person {0} has already been merged away")]
  AlreadyMerged(PersonId),

  #[error("not authorized to merge people")]
  MergeNotAuthorized,

  #[error("redirecting {old} to {new} would create a cycle")]
  CycleDetected { old: PersonId, new: PersonId },

  #[error("person {0} has no recorded versions")]
  EmptyLog(PersonId),

  #[error("person not found: {0}")]
  PersonNotFound(PersonId),

  #[error("malformed version id {0:?}")]
  InvalidVersionId(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
