//! [`RedirectIndex`] — where merged-away person identities now live.
//!
//! Entries are created once per merge and are permanent. Resolution is
//! transitive: if A was merged into B and B later into C, A resolves to C.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, person::PersonId};

/// A permanent `old → new` mapping recorded when `old` lost a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEntry {
  pub old_person_id: PersonId,
  pub new_person_id: PersonId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectIndex {
  entries: BTreeMap<PersonId, PersonId>,
}

impl RedirectIndex {
  pub fn new() -> Self { Self::default() }

  /// Rebuild an index from persisted entries, re-checking every invariant.
  pub fn from_entries(entries: impl IntoIterator<Item = RedirectEntry>) -> Result<Self> {
    let mut index = Self::new();
    for entry in entries {
      index.record(entry.old_person_id, entry.new_person_id)?;
    }
    Ok(index)
  }

  /// Check that `old → new` could be recorded, without recording it.
  pub fn check(&self, old: PersonId, new: PersonId) -> Result<()> {
    if old == new || self.resolve(new) == old {
      return Err(Error::CycleDetected { old, new });
    }
    match self.entries.get(&old) {
      Some(existing) if *existing != new => Err(Error::AlreadyMerged(old)),
      _ => Ok(()),
    }
  }

  /// Record that `old` now lives at `new`. Recording an identical entry a
  /// second time is a no-op.
  pub fn record(&mut self, old: PersonId, new: PersonId) -> Result<()> {
    self.check(old, new)?;
    self.entries.insert(old, new);
    Ok(())
  }

  /// Follow redirects from `id` until reaching an identity that has none.
  pub fn resolve(&self, id: PersonId) -> PersonId {
    let mut current = id;
    // Cycles are rejected at write time; the bound only guards against a
    // corrupted index built without `record`.
    for _ in 0..=self.entries.len() {
      match self.entries.get(&current) {
        Some(next) => current = *next,
        None => break,
      }
    }
    current
  }

  /// Whether `id` has been merged into another person.
  pub fn is_retired(&self, id: PersonId) -> bool { self.entries.contains_key(&id) }

  pub fn entries(&self) -> impl Iterator<Item = RedirectEntry> + '_ {
    self.entries.iter().map(|(old, new)| RedirectEntry {
      old_person_id: *old,
      new_person_id: *new,
    })
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
