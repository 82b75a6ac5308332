//! SQL schema for the Hustings SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Live person rows. `name` and `current_version` mirror the head of the
-- person's version log. A merged-away person's row is deleted.
CREATE TABLE IF NOT EXISTS people (
    person_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT NOT NULL,
    name            TEXT NOT NULL,
    current_version TEXT NOT NULL
);

-- Version payloads are never updated or deleted. A merge only moves rows to
-- the surviving person by rewriting person_id and position.
CREATE TABLE IF NOT EXISTS versions (
    version_id         TEXT PRIMARY KEY,  -- 16 lowercase hex digits
    person_id          INTEGER NOT NULL,
    position           INTEGER NOT NULL,  -- 0 = oldest
    recorded_at        TEXT NOT NULL,     -- RFC 3339 UTC
    username           TEXT,
    information_source TEXT NOT NULL,
    ip                 TEXT,
    data_json          TEXT NOT NULL
);

-- One row per person per election they are known to stand in.
CREATE TABLE IF NOT EXISTS candidacies (
    row_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id  INTEGER NOT NULL REFERENCES people(person_id),
    election   TEXT NOT NULL,
    post_id    TEXT NOT NULL,
    UNIQUE (person_id, election)
);

CREATE TABLE IF NOT EXISTS results (
    result_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    candidacy_id INTEGER NOT NULL REFERENCES candidacies(row_id) ON DELETE CASCADE,
    votes        INTEGER NOT NULL,
    is_winner    INTEGER NOT NULL
);

-- Permanent: one row per merge, never updated or deleted.
CREATE TABLE IF NOT EXISTS redirects (
    old_person_id INTEGER PRIMARY KEY,
    new_person_id INTEGER NOT NULL,
    created_at    TEXT NOT NULL,
    CHECK (old_person_id != new_person_id)
);

CREATE INDEX IF NOT EXISTS versions_person_idx    ON versions(person_id, position);
CREATE INDEX IF NOT EXISTS candidacies_person_idx ON candidacies(person_id);
CREATE INDEX IF NOT EXISTS results_candidacy_idx  ON results(candidacy_id);

PRAGMA user_version = 1;
";
