//! Identities and the period-keyed map used for per-election affiliations.

use std::{
  collections::{BTreeMap, btree_map},
  fmt,
  str::FromStr,
};

use serde::{Deserialize, Serialize};

// ─── Identities ──────────────────────────────────────────────────────────────

/// The identity of a person record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for PersonId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.parse().map(Self) }
}

/// A row in the live relational store holding one person's candidacy in one
/// election. Results and other attachments point at these rows.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The external period identifier, e.g. `"2015"` or
/// `"local.maidstone.2016-05-05"`.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElectionSlug(pub String);

impl ElectionSlug {
  pub fn new(slug: impl Into<String>) -> Self { Self(slug.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ElectionSlug {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ElectionSlug {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── PeriodMap ───────────────────────────────────────────────────────────────

/// Values keyed by election, iterated in ascending slug order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodMap<T>(BTreeMap<ElectionSlug, T>);

impl<T> Default for PeriodMap<T> {
  fn default() -> Self { Self(BTreeMap::new()) }
}

impl<T> PeriodMap<T> {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, election: &ElectionSlug) -> Option<&T> {
    self.0.get(election)
  }

  pub fn insert(&mut self, election: ElectionSlug, value: T) -> Option<T> {
    self.0.insert(election, value)
  }

  pub fn remove(&mut self, election: &ElectionSlug) -> Option<T> {
    self.0.remove(election)
  }

  pub fn contains(&self, election: &ElectionSlug) -> bool {
    self.0.contains_key(election)
  }

  pub fn iter(&self) -> btree_map::Iter<'_, ElectionSlug, T> { self.0.iter() }

  pub fn elections(&self) -> impl Iterator<Item = &ElectionSlug> {
    self.0.keys()
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<T: Clone> PeriodMap<T> {
  /// Copy every entry of `other` whose election is missing here, or whose
  /// value here fails `has_value`. Entries already holding a value are never
  /// overwritten.
  pub fn fill_from(&mut self, other: &Self, has_value: impl Fn(&T) -> bool) {
    for (election, theirs) in other.iter() {
      let keep_ours = self.0.get(election).is_some_and(&has_value);
      if !keep_ours {
        self.0.insert(election.clone(), theirs.clone());
      }
    }
  }
}

impl<T> FromIterator<(ElectionSlug, T)> for PeriodMap<T> {
  fn from_iter<I: IntoIterator<Item = (ElectionSlug, T)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<T> IntoIterator for PeriodMap<T> {
  type IntoIter = btree_map::IntoIter<ElectionSlug, T>;
  type Item = (ElectionSlug, T);

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a, T> IntoIterator for &'a PeriodMap<T> {
  type IntoIter = btree_map::Iter<'a, ElectionSlug, T>;
  type Item = (&'a ElectionSlug, &'a T);

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
