//! The `HistoryStore` trait and the result types it trades in.
//!
//! The trait is implemented by storage backends (e.g. `hustings-store-sqlite`).
//! The API layer depends on this abstraction, not on any concrete backend.
//! Backends own the transaction boundary: each write loads the records it
//! needs, runs the engine operation on them, and persists the outcome
//! atomically.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  log::VersionWithDiff,
  merge::{MergeOutcome, MergeRequest, PersonRecord},
  person::{ElectionSlug, PersonId, RowId},
  redirect::RedirectEntry,
  revert::RevertOutcome,
  snapshot::Snapshot,
  version::{ChangeMetadata, VersionId},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// An election result as submitted for one candidacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResult {
  pub votes:   u32,
  pub elected: bool,
}

/// A persisted election result, attached to a candidacy row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidacyResult {
  pub result_id: i64,
  pub candidacy: RowId,
  pub election:  ElectionSlug,
  pub votes:     u32,
  pub elected:   bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a person-history backend.
///
/// Versions are append-only. Edits, reverts and merges each add exactly one
/// version; nothing rewrites a stored version.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait HistoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  /// Create a new person whose first version is `snapshot`.
  fn create_person(
    &self,
    snapshot: Snapshot,
    metadata: ChangeMetadata,
  ) -> impl Future<Output = Result<PersonId, Self::Error>> + Send + '_;

  /// Load a person's full history and live candidacy rows. Returns `None`
  /// if no live person has this id, including ids that were merged away.
  fn get_person(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<PersonRecord>, Self::Error>> + Send + '_;

  /// Every version of a person, newest first, each with its diff against
  /// the version before it.
  fn history(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Vec<VersionWithDiff>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Record an edit as the person's new current version.
  fn record_version(
    &self,
    id: PersonId,
    snapshot: Snapshot,
    metadata: ChangeMetadata,
  ) -> impl Future<Output = Result<VersionId, Self::Error>> + Send + '_;

  /// Restore the person to the version `target` by appending a copy of it.
  fn revert(
    &self,
    id: PersonId,
    target: VersionId,
    metadata: ChangeMetadata,
  ) -> impl Future<Output = Result<RevertOutcome, Self::Error>> + Send + '_;

  /// Fold `loser` into `survivor`, moving the loser's history and candidacy
  /// attachments across and retiring the loser's identity.
  fn merge(
    &self,
    survivor: PersonId,
    loser: PersonId,
    request: MergeRequest,
  ) -> impl Future<Output = Result<MergeOutcome, Self::Error>> + Send + '_;

  // ── Redirects ─────────────────────────────────────────────────────────

  /// Follow merge redirects from `id` to the identity that now holds it.
  fn resolve(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<PersonId, Self::Error>> + Send + '_;

  fn list_redirects(
    &self,
  ) -> impl Future<Output = Result<Vec<RedirectEntry>, Self::Error>> + Send + '_;

  // ── Results ───────────────────────────────────────────────────────────

  /// Attach a result to the person's candidacy row in `election`. Fails if
  /// the person has no such candidacy.
  fn add_result(
    &self,
    id: PersonId,
    election: ElectionSlug,
    result: NewResult,
  ) -> impl Future<Output = Result<CandidacyResult, Self::Error>> + Send + '_;

  fn get_results(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Vec<CandidacyResult>, Self::Error>> + Send + '_;
}
