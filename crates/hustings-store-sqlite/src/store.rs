//! [`SqliteStore`] — the SQLite implementation of [`HistoryStore`].

use std::path::Path;

use hustings_core::{
  log::{VersionLog, VersionWithDiff},
  merge::{self, MergeOutcome, MergeRequest, PersonRecord},
  person::{ElectionSlug, PeriodMap, PersonId, RowId},
  redirect::{RedirectEntry, RedirectIndex},
  revert::{self, RevertOutcome},
  snapshot::Snapshot,
  store::{CandidacyResult, HistoryStore, NewResult},
  version::{ChangeMetadata, Version, VersionId},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{RawResult, RawVersion, encode_dt, encode_version_id, redirect_from_row},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A person-history store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Reads (connection thread) ───────────────────────────────────────────────

fn person_exists(conn: &Connection, id: PersonId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM people WHERE person_id = ?1",
        params![id.0],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn load_log(conn: &Connection, id: PersonId) -> Result<VersionLog> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM versions WHERE person_id = ?1 ORDER BY position DESC",
    RawVersion::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![id.0], RawVersion::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let newest_first = raws
    .into_iter()
    .map(RawVersion::into_version)
    .collect::<Result<Vec<_>>>()?;
  Ok(VersionLog::from_versions(id, newest_first)?)
}

fn load_candidacies(conn: &Connection, id: PersonId) -> Result<PeriodMap<RowId>> {
  let mut stmt =
    conn.prepare("SELECT election, row_id FROM candidacies WHERE person_id = ?1")?;
  let rows = stmt
    .query_map(params![id.0], |row| {
      Ok((ElectionSlug(row.get(0)?), RowId(row.get(1)?)))
    })?
    .collect::<rusqlite::Result<PeriodMap<_>>>()?;
  Ok(rows)
}

fn load_record(conn: &Connection, id: PersonId) -> Result<Option<PersonRecord>> {
  if !person_exists(conn, id)? {
    return Ok(None);
  }
  Ok(Some(PersonRecord {
    versions:    load_log(conn, id)?,
    candidacies: load_candidacies(conn, id)?,
  }))
}

fn require_record(conn: &Connection, id: PersonId) -> Result<PersonRecord> {
  load_record(conn, id)?.ok_or(Error::Core(hustings_core::Error::PersonNotFound(id)))
}

fn load_redirects(conn: &Connection) -> Result<RedirectIndex> {
  let mut stmt = conn.prepare(
    "SELECT old_person_id, new_person_id FROM redirects ORDER BY old_person_id",
  )?;
  let entries = stmt
    .query_map([], redirect_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(RedirectIndex::from_entries(entries)?)
}

/// Version ids must be unique across every person, not only within one log.
fn ensure_fresh(conn: &Connection, id: VersionId) -> Result<()> {
  let taken = conn
    .query_row(
      "SELECT 1 FROM versions WHERE version_id = ?1",
      params![encode_version_id(id)],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if taken {
    return Err(hustings_core::Error::DuplicateVersionId(id).into());
  }
  Ok(())
}

// ─── Writes (connection thread) ──────────────────────────────────────────────

fn insert_version(
  conn: &Connection,
  person: PersonId,
  position: usize,
  version: &Version,
) -> Result<()> {
  let raw = RawVersion::from_version(version)?;
  conn.execute(
    "INSERT INTO versions (
       version_id, person_id, position, recorded_at,
       username, information_source, ip, data_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      raw.version_id,
      person.0,
      position as i64,
      raw.recorded_at,
      raw.username,
      raw.information_source,
      raw.ip,
      raw.data_json,
    ],
  )?;
  Ok(())
}

/// Copy the head of `log` into the person's live row.
fn mirror_current(conn: &Connection, log: &VersionLog) -> Result<()> {
  let head = log.current()?;
  conn.execute(
    "UPDATE people SET name = ?1, current_version = ?2 WHERE person_id = ?3",
    params![head.data.name, encode_version_id(head.id()), log.person_id().0],
  )?;
  Ok(())
}

/// Bring the person's candidacy rows in line with `snapshot.standing_in`.
/// Rows for elections the person is no longer standing in are deleted along
/// with their results; rows that remain keep their ids.
fn sync_candidacies(conn: &Connection, person: PersonId, snapshot: &Snapshot) -> Result<()> {
  for (election, row) in &load_candidacies(conn, person)? {
    if snapshot.standing_in.get(election).is_none_or(Option::is_none) {
      conn.execute("DELETE FROM candidacies WHERE row_id = ?1", params![row.0])?;
    }
  }
  for (election, standing) in snapshot.candidacies() {
    conn.execute(
      "INSERT INTO candidacies (person_id, election, post_id) VALUES (?1, ?2, ?3)
       ON CONFLICT (person_id, election) DO UPDATE SET post_id = excluded.post_id",
      params![person.0, election.as_str(), standing.post_id],
    )?;
  }
  Ok(())
}

/// Persist a freshly appended head version and mirror it into live state.
fn commit_head(conn: &Connection, log: &VersionLog) -> Result<()> {
  let head = log.current()?;
  insert_version(conn, log.person_id(), log.len() - 1, head)?;
  mirror_current(conn, log)?;
  sync_candidacies(conn, log.person_id(), &head.data)
}

// ─── Transactions ────────────────────────────────────────────────────────────

fn create_person_tx(
  conn: &mut Connection,
  snapshot: Snapshot,
  metadata: ChangeMetadata,
) -> Result<PersonId> {
  let tx = conn.transaction()?;
  ensure_fresh(&tx, metadata.version_id)?;

  tx.execute(
    "INSERT INTO people (created_at, name, current_version) VALUES (?1, ?2, ?3)",
    params![
      encode_dt(metadata.timestamp),
      snapshot.name,
      encode_version_id(metadata.version_id),
    ],
  )?;
  let id = PersonId(tx.last_insert_rowid());

  let mut log = VersionLog::new(id);
  log.append(snapshot, metadata)?;
  commit_head(&tx, &log)?;

  tx.commit()?;
  Ok(id)
}

fn record_version_tx(
  conn: &mut Connection,
  id: PersonId,
  snapshot: Snapshot,
  metadata: ChangeMetadata,
) -> Result<VersionId> {
  let tx = conn.transaction()?;
  let mut record = require_record(&tx, id)?;

  let version_id = record.versions.append(snapshot, metadata)?;
  ensure_fresh(&tx, version_id)?;
  commit_head(&tx, &record.versions)?;

  tx.commit()?;
  Ok(version_id)
}

fn revert_tx(
  conn: &mut Connection,
  id: PersonId,
  target: VersionId,
  metadata: ChangeMetadata,
) -> Result<RevertOutcome> {
  let tx = conn.transaction()?;
  let mut record = require_record(&tx, id)?;

  let outcome = revert::revert(&mut record.versions, target, metadata)?;
  ensure_fresh(&tx, outcome.version_id)?;
  commit_head(&tx, &record.versions)?;

  tx.commit()?;
  Ok(outcome)
}

/// A merged-away person has no live row. The engine is handed an empty
/// record for it so that it reports the identity as already merged.
fn load_for_merge(
  conn: &Connection,
  redirects: &RedirectIndex,
  id: PersonId,
) -> Result<PersonRecord> {
  match load_record(conn, id)? {
    Some(record) => Ok(record),
    None if redirects.is_retired(id) => Ok(PersonRecord::new(VersionLog::new(id))),
    None => Err(hustings_core::Error::PersonNotFound(id).into()),
  }
}

fn merge_tx(
  conn: &mut Connection,
  survivor_id: PersonId,
  loser_id: PersonId,
  request: MergeRequest,
) -> Result<MergeOutcome> {
  let tx = conn.transaction()?;
  let mut redirects = load_redirects(&tx)?;
  let mut survivor = load_for_merge(&tx, &redirects, survivor_id)?;
  let mut loser = load_for_merge(&tx, &redirects, loser_id)?;

  let outcome = merge::merge(&mut survivor, &mut loser, &mut redirects, request)?;
  ensure_fresh(&tx, outcome.version_id)?;

  // Every version now belongs to the survivor. Existing rows are moved and
  // renumbered; only the merge version is new.
  for (position, version) in survivor.versions.all().rev().enumerate() {
    if version.id() == outcome.version_id {
      insert_version(&tx, survivor_id, position, version)?;
    } else {
      tx.execute(
        "UPDATE versions SET person_id = ?1, position = ?2 WHERE version_id = ?3",
        params![survivor_id.0, position as i64, encode_version_id(version.id())],
      )?;
    }
  }

  for repoint in &outcome.repoints {
    tx.execute(
      "UPDATE results SET candidacy_id = ?1 WHERE candidacy_id = ?2",
      params![repoint.to.0, repoint.from.0],
    )?;
    tx.execute(
      "DELETE FROM candidacies WHERE row_id = ?1",
      params![repoint.from.0],
    )?;
  }
  for reassign in &outcome.reassignments {
    tx.execute(
      "UPDATE candidacies SET person_id = ?1 WHERE row_id = ?2",
      params![survivor_id.0, reassign.row.0],
    )?;
  }

  let merged_at = survivor.versions.current()?.metadata.timestamp;
  tx.execute("DELETE FROM people WHERE person_id = ?1", params![loser_id.0])?;
  tx.execute(
    "INSERT INTO redirects (old_person_id, new_person_id, created_at)
     VALUES (?1, ?2, ?3)",
    params![loser_id.0, survivor_id.0, encode_dt(merged_at)],
  )?;

  mirror_current(&tx, &survivor.versions)?;
  sync_candidacies(&tx, survivor_id, &outcome.snapshot)?;

  tx.commit()?;
  Ok(outcome)
}

fn add_result_tx(
  conn: &mut Connection,
  id: PersonId,
  election: ElectionSlug,
  result: NewResult,
) -> Result<CandidacyResult> {
  let tx = conn.transaction()?;
  if !person_exists(&tx, id)? {
    return Err(hustings_core::Error::PersonNotFound(id).into());
  }

  let row: Option<i64> = tx
    .query_row(
      "SELECT row_id FROM candidacies WHERE person_id = ?1 AND election = ?2",
      params![id.0, election.as_str()],
      |r| r.get(0),
    )
    .optional()?;
  let Some(row) = row else {
    return Err(Error::NoCandidacy {
      person_id: id,
      election,
    });
  };

  tx.execute(
    "INSERT INTO results (candidacy_id, votes, is_winner) VALUES (?1, ?2, ?3)",
    params![row, result.votes, result.elected],
  )?;
  let result_id = tx.last_insert_rowid();

  tx.commit()?;
  Ok(CandidacyResult {
    result_id,
    candidacy: RowId(row),
    election,
    votes: result.votes,
    elected: result.elected,
  })
}

// ─── HistoryStore impl ───────────────────────────────────────────────────────

impl HistoryStore for SqliteStore {
  type Error = Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn create_person(
    &self,
    snapshot: Snapshot,
    metadata: ChangeMetadata,
  ) -> Result<PersonId> {
    let id = self
      .conn
      .call(move |conn| Ok(create_person_tx(conn, snapshot, metadata)))
      .await??;
    debug!(person_id = %id, "created person");
    Ok(id)
  }

  async fn get_person(&self, id: PersonId) -> Result<Option<PersonRecord>> {
    self.conn.call(move |conn| Ok(load_record(conn, id))).await?
  }

  async fn history(&self, id: PersonId) -> Result<Vec<VersionWithDiff>> {
    let record = self
      .get_person(id)
      .await?
      .ok_or(Error::Core(hustings_core::Error::PersonNotFound(id)))?;
    Ok(record.versions.history())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn record_version(
    &self,
    id: PersonId,
    snapshot: Snapshot,
    metadata: ChangeMetadata,
  ) -> Result<VersionId> {
    let version_id = self
      .conn
      .call(move |conn| Ok(record_version_tx(conn, id, snapshot, metadata)))
      .await??;
    debug!(person_id = %id, %version_id, "recorded version");
    Ok(version_id)
  }

  async fn revert(
    &self,
    id: PersonId,
    target: VersionId,
    metadata: ChangeMetadata,
  ) -> Result<RevertOutcome> {
    let outcome = self
      .conn
      .call(move |conn| Ok(revert_tx(conn, id, target, metadata)))
      .await??;
    info!(
      person_id = %id,
      target = %outcome.target,
      version_id = %outcome.version_id,
      "reverted person"
    );
    Ok(outcome)
  }

  async fn merge(
    &self,
    survivor: PersonId,
    loser: PersonId,
    request: MergeRequest,
  ) -> Result<MergeOutcome> {
    let outcome = self
      .conn
      .call(move |conn| Ok(merge_tx(conn, survivor, loser, request)))
      .await??;
    info!(
      survivor = %outcome.survivor,
      retired = %outcome.retired,
      version_id = %outcome.version_id,
      repointed = outcome.repoints.len(),
      reassigned = outcome.reassignments.len(),
      "merged people"
    );
    Ok(outcome)
  }

  // ── Redirects ─────────────────────────────────────────────────────────────

  async fn resolve(&self, id: PersonId) -> Result<PersonId> {
    let redirects = self.conn.call(|conn| Ok(load_redirects(conn))).await??;
    let resolved = redirects.resolve(id);
    if resolved != id {
      debug!(from = %id, to = %resolved, "followed redirect");
    }
    Ok(resolved)
  }

  async fn list_redirects(&self) -> Result<Vec<RedirectEntry>> {
    let redirects = self.conn.call(|conn| Ok(load_redirects(conn))).await??;
    Ok(redirects.entries().collect())
  }

  // ── Results ───────────────────────────────────────────────────────────────

  async fn add_result(
    &self,
    id: PersonId,
    election: ElectionSlug,
    result: NewResult,
  ) -> Result<CandidacyResult> {
    self
      .conn
      .call(move |conn| Ok(add_result_tx(conn, id, election, result)))
      .await?
  }

  async fn get_results(&self, id: PersonId) -> Result<Vec<CandidacyResult>> {
    let raws: Vec<RawResult> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.result_id, r.candidacy_id, c.election, r.votes, r.is_winner
           FROM results r
           JOIN candidacies c ON c.row_id = r.candidacy_id
           WHERE c.person_id = ?1
           ORDER BY c.election, r.result_id",
        )?;
        let rows = stmt
          .query_map(params![id.0], RawResult::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawResult::into_result).collect()
  }
}
