//! Versions — a snapshot plus the audit metadata of the edit that produced it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand_core::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, snapshot::Snapshot};

// ─── VersionId ───────────────────────────────────────────────────────────────

/// A globally unique version identifier: eight random bytes, rendered as
/// sixteen lowercase hex digits (e.g. `5aa6418325c1a0bb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId([u8; 8]);

impl VersionId {
  pub const fn from_bytes(bytes: [u8; 8]) -> Self { Self(bytes) }

  /// Draw a fresh identifier from `rng`. The engine itself never calls this;
  /// it is for the caller assembling [`ChangeMetadata`].
  pub fn random(rng: &mut impl RngCore) -> Self {
    let mut bytes = [0u8; 8];
    rng.fill_bytes(&mut bytes);
    Self(bytes)
  }

  pub fn as_bytes(&self) -> &[u8; 8] { &self.0 }
}

impl fmt::Display for VersionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&hex::encode(self.0))
  }
}

impl FromStr for VersionId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidVersionId(s.to_owned());
    if s.len() != 16 || s.bytes().any(|b| b.is_ascii_uppercase()) {
      return Err(invalid());
    }
    let mut bytes = [0u8; 8];
    hex::decode_to_slice(s, &mut bytes).map_err(|_| invalid())?;
    Ok(Self(bytes))
  }
}

impl Serialize for VersionId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for VersionId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

// ─── ChangeMetadata ──────────────────────────────────────────────────────────

/// Who made a change, when, and why. Always supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMetadata {
  pub version_id:         VersionId,
  pub timestamp:          DateTime<Utc>,
  /// The acting user; `None` for system-generated edits.
  pub username:           Option<String>,
  /// Free-text justification for the change ("information source").
  pub information_source: String,
  /// Network provenance of the request, if known.
  pub ip:                 Option<String>,
}

impl ChangeMetadata {
  pub fn new(
    version_id: VersionId,
    timestamp: DateTime<Utc>,
    information_source: impl Into<String>,
  ) -> Self {
    Self {
      version_id,
      timestamp,
      username: None,
      information_source: information_source.into(),
      ip: None,
    }
  }

  pub fn by_user(mut self, username: impl Into<String>) -> Self {
    self.username = Some(username.into());
    self
  }

  pub fn from_ip(mut self, ip: impl Into<String>) -> Self {
    self.ip = Some(ip.into());
    self
  }
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// An immutable entry in a [`VersionLog`](crate::log::VersionLog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  #[serde(flatten)]
  pub metadata: ChangeMetadata,
  pub data:     Snapshot,
}

impl Version {
  pub fn id(&self) -> VersionId { self.metadata.version_id }
}
