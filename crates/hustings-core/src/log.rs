//! [`VersionLog`] — the append-only history of one person.
//!
//! Versions are held oldest-first internally so that appending is a push;
//! every public accessor presents them newest-first. Once a version is in the
//! log nothing hands out a mutable reference to it.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
  Error, Result,
  diff::{DiffEntry, diff},
  person::PersonId,
  snapshot::Snapshot,
  version::{ChangeMetadata, Version, VersionId},
};

/// A version paired with what changed relative to the version before it.
#[derive(Debug, Clone, Serialize)]
pub struct VersionWithDiff {
  #[serde(flatten)]
  pub version: Version,
  pub diff:    Vec<DiffEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLog {
  person_id: PersonId,
  /// Oldest first.
  versions:  Vec<Version>,
}

impl VersionLog {
  /// An empty log. A person must have its first version appended before it is
  /// considered to exist.
  pub fn new(person_id: PersonId) -> Self {
    Self {
      person_id,
      versions: Vec::new(),
    }
  }

  /// Rebuild a log from persisted versions given newest-first.
  pub fn from_versions(
    person_id: PersonId,
    newest_first: impl IntoIterator<Item = Version>,
  ) -> Result<Self> {
    let mut versions: Vec<Version> = newest_first.into_iter().collect();
    versions.reverse();

    let mut seen = HashSet::with_capacity(versions.len());
    for version in &versions {
      if !seen.insert(version.id()) {
        return Err(Error::DuplicateVersionId(version.id()));
      }
    }

    Ok(Self { person_id, versions })
  }

  pub fn person_id(&self) -> PersonId { self.person_id }

  // ── Writes ─────────────────────────────────────────────────────────────

  /// Record `snapshot` as the new current version.
  pub fn append(
    &mut self,
    snapshot: Snapshot,
    metadata: ChangeMetadata,
  ) -> Result<VersionId> {
    let id = metadata.version_id;
    if self.contains(&id) {
      return Err(Error::DuplicateVersionId(id));
    }
    self.versions.push(Version { metadata, data: snapshot });
    Ok(id)
  }

  /// Move every version of `older` beneath this log's existing versions,
  /// keeping both sides' internal order. `older` is left empty.
  ///
  /// Nothing is moved if any identifier would collide.
  pub(crate) fn absorb(&mut self, older: &mut VersionLog) -> Result<()> {
    if let Some(clash) = older.versions.iter().find(|v| self.contains(&v.id())) {
      return Err(Error::DuplicateVersionId(clash.id()));
    }
    let mut combined = std::mem::take(&mut older.versions);
    combined.append(&mut self.versions);
    self.versions = combined;
    Ok(())
  }

  // ── Reads ──────────────────────────────────────────────────────────────

  pub fn get(&self, id: &VersionId) -> Result<&Version> {
    self
      .versions
      .iter()
      .find(|v| v.id() == *id)
      .ok_or(Error::VersionNotFound(*id))
  }

  /// The head of the log, which is the person's current state.
  pub fn current(&self) -> Result<&Version> {
    self.versions.last().ok_or(Error::EmptyLog(self.person_id))
  }

  /// All versions, newest first.
  pub fn all(&self) -> impl DoubleEndedIterator<Item = &Version> + ExactSizeIterator {
    self.versions.iter().rev()
  }

  pub fn contains(&self, id: &VersionId) -> bool {
    self.versions.iter().any(|v| v.id() == *id)
  }

  pub fn len(&self) -> usize { self.versions.len() }

  pub fn is_empty(&self) -> bool { self.versions.is_empty() }

  /// Consume the log, yielding its versions newest first.
  pub fn into_versions(self) -> Vec<Version> {
    let mut versions = self.versions;
    versions.reverse();
    versions
  }

  /// Every version, newest first, with its diff against the version that
  /// preceded it. The oldest version is diffed against an empty snapshot.
  pub fn history(&self) -> Vec<VersionWithDiff> {
    let empty = Snapshot::default();
    let mut result: Vec<VersionWithDiff> = self
      .versions
      .iter()
      .enumerate()
      .map(|(i, version)| {
        let older = if i == 0 { &empty } else { &self.versions[i - 1].data };
        VersionWithDiff {
          version: version.clone(),
          diff:    diff(older, &version.data),
        }
      })
      .collect();
    result.reverse();
    result
  }
}
