//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Snapshots are stored as
//! compact JSON. Version ids are stored as their 16-digit hex form.

use chrono::{DateTime, Utc};
use hustings_core::{
  person::{ElectionSlug, PersonId, RowId},
  redirect::RedirectEntry,
  store::CandidacyResult,
  version::{ChangeMetadata, Version, VersionId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── VersionId ───────────────────────────────────────────────────────────────

pub fn encode_version_id(id: VersionId) -> String { id.to_string() }

pub fn decode_version_id(s: &str) -> Result<VersionId> { Ok(s.parse()?) }

// ─── Version ─────────────────────────────────────────────────────────────────

/// Raw strings for the columns of a `versions` row.
pub struct RawVersion {
  pub version_id:         String,
  pub recorded_at:        String,
  pub username:           Option<String>,
  pub information_source: String,
  pub ip:                 Option<String>,
  pub data_json:          String,
}

impl RawVersion {
  /// Column list matching [`RawVersion::from_row`].
  pub const COLUMNS: &'static str =
    "version_id, recorded_at, username, information_source, ip, data_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:         row.get(0)?,
      recorded_at:        row.get(1)?,
      username:           row.get(2)?,
      information_source: row.get(3)?,
      ip:                 row.get(4)?,
      data_json:          row.get(5)?,
    })
  }

  pub fn from_version(version: &Version) -> Result<Self> {
    let metadata = &version.metadata;
    Ok(Self {
      version_id:         encode_version_id(metadata.version_id),
      recorded_at:        encode_dt(metadata.timestamp),
      username:           metadata.username.clone(),
      information_source: metadata.information_source.clone(),
      ip:                 metadata.ip.clone(),
      data_json:          serde_json::to_string(&version.data)?,
    })
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      metadata: ChangeMetadata {
        version_id:         decode_version_id(&self.version_id)?,
        timestamp:          decode_dt(&self.recorded_at)?,
        username:           self.username,
        information_source: self.information_source,
        ip:                 self.ip,
      },
      data:     serde_json::from_str(&self.data_json)?,
    })
  }
}

// ─── Redirects ───────────────────────────────────────────────────────────────

pub fn redirect_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RedirectEntry> {
  Ok(RedirectEntry {
    old_person_id: PersonId(row.get(0)?),
    new_person_id: PersonId(row.get(1)?),
  })
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Raw values read from a `results` row joined with its candidacy.
pub struct RawResult {
  pub result_id: i64,
  pub candidacy: i64,
  pub election:  String,
  pub votes:     i64,
  pub is_winner: bool,
}

impl RawResult {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      result_id: row.get(0)?,
      candidacy: row.get(1)?,
      election:  row.get(2)?,
      votes:     row.get(3)?,
      is_winner: row.get(4)?,
    })
  }

  pub fn into_result(self) -> Result<CandidacyResult> {
    let votes = u32::try_from(self.votes).map_err(|_| Error::VoteCount {
      result_id: self.result_id,
      votes:     self.votes,
    })?;
    Ok(CandidacyResult {
      result_id: self.result_id,
      candidacy: RowId(self.candidacy),
      election:  ElectionSlug(self.election),
      votes,
      elected:   self.is_winner,
    })
  }
}
