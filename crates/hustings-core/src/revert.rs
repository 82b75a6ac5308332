//! Reverting a person to an earlier version.
//!
//! A revert never rewrites history. It copies the target version's snapshot
//! into a brand-new version carrying the caller's metadata, so the log records
//! who asked for the revert and why. Reverting twice to the same target is two
//! audit events and therefore two versions.

use serde::Serialize;

use crate::{
  Error, Result,
  log::VersionLog,
  snapshot::Snapshot,
  version::{ChangeMetadata, VersionId},
};

/// What a committed revert produced.
#[derive(Debug, Clone, Serialize)]
pub struct RevertOutcome {
  /// The identifier of the newly appended version.
  pub version_id: VersionId,
  /// The version that was reverted to.
  pub target:     VersionId,
  /// The restored state. The caller resynchronises live candidacies from its
  /// `standing_in` and `party_memberships`.
  pub snapshot:   Snapshot,
}

/// Revert `log` to the version `target`, recording `metadata` as the new
/// version's audit trail.
///
/// Fails with [`Error::TargetVersionNotFound`] if `target` is not in this
/// log, or [`Error::DuplicateVersionId`] if the new id is already used. In
/// both cases the log is untouched.
pub fn revert(
  log: &mut VersionLog,
  target: VersionId,
  metadata: ChangeMetadata,
) -> Result<RevertOutcome> {
  let snapshot = log
    .get(&target)
    .map_err(|_| Error::TargetVersionNotFound {
      person_id: log.person_id(),
      version:   target,
    })?
    .data
    .clone();

  let version_id = log.append(snapshot.clone(), metadata)?;

  Ok(RevertOutcome {
    version_id,
    target,
    snapshot,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    log::tests::{log_with, meta, vid},
    person::PersonId,
  };

  #[test]
  fn revert_restores_target_snapshot() {
    let mut log = log_with(2009, &[(1, "Tessa"), (2, "Tessa Jowell"), (3, "T. J.")]);

    let outcome = revert(&mut log, vid(1), meta(10, "Reverting vandalism")).unwrap();

    assert_eq!(outcome.version_id, vid(10));
    assert_eq!(outcome.snapshot.name, "Tessa");
    assert_eq!(log.len(), 4);
    assert_eq!(log.current().unwrap().data, log.get(&vid(1)).unwrap().data);
  }

  #[test]
  fn revert_uses_the_callers_metadata() {
    let mut log = log_with(2009, &[(1, "Tessa"), (2, "Tessa Jowell")]);
    let metadata = meta(10, "Reverting to version 0000000000000001")
      .by_user("symroe")
      .from_ip("10.0.0.1");

    revert(&mut log, vid(1), metadata.clone()).unwrap();

    let current = log.current().unwrap();
    assert_eq!(current.metadata, metadata);
    assert_ne!(current.metadata, log.get(&vid(1)).unwrap().metadata);
  }

  #[test]
  fn missing_target_leaves_log_untouched() {
    let mut log = log_with(2009, &[(1, "Tessa")]);
    let before = log.clone();

    let err = revert(&mut log, vid(99), meta(10, "revert")).unwrap_err();

    assert!(matches!(
      err,
      Error::TargetVersionNotFound { person_id: PersonId(2009), version } if version == vid(99)
    ));
    assert_eq!(log, before);
  }

  #[test]
  fn reusing_an_existing_id_is_rejected() {
    let mut log = log_with(2009, &[(1, "Tessa"), (2, "Tessa Jowell")]);
    let err = revert(&mut log, vid(1), meta(2, "revert")).unwrap_err();
    assert!(matches!(err, Error::DuplicateVersionId(_)));
    assert_eq!(log.len(), 2);
  }

  #[test]
  fn reverting_twice_records_two_versions() {
    let mut log = log_with(2009, &[(1, "Tessa"), (2, "Tessa Jowell")]);

    let first = revert(&mut log, vid(1), meta(10, "revert")).unwrap();
    let second = revert(&mut log, vid(1), meta(11, "revert again")).unwrap();

    assert_ne!(first.version_id, second.version_id);
    assert_eq!(log.len(), 4);
    assert_eq!(
      log.get(&first.version_id).unwrap().data,
      log.get(&second.version_id).unwrap().data
    );
  }

  #[test]
  fn new_id_differs_from_every_prior_id() {
    let mut log = log_with(2009, &[(1, "A"), (2, "B"), (3, "C")]);
    let prior: Vec<VersionId> = log.all().map(|v| v.id()).collect();

    let outcome = revert(&mut log, vid(2), meta(4, "revert")).unwrap();

    assert!(!prior.contains(&outcome.version_id));
  }
}
