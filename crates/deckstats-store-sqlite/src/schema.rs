//! SQL schema for the deckstats SQLite store.
//!
//! Executed once at connection startup. Idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`; there are no migrations.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Append-only dimension; names are never rewritten.
CREATE TABLE IF NOT EXISTS people (
    id    INTEGER PRIMARY KEY,
    name  TEXT
);

-- Labels may be corrected upstream, so rows are updated on conflict.
CREATE TABLE IF NOT EXISTS archetypes (
    id         INTEGER PRIMARY KEY,
    archetype  TEXT
);

CREATE TABLE IF NOT EXISTS decks (
    id               INTEGER PRIMARY KEY,
    name             TEXT,
    seasonId         INTEGER,
    sourceName       TEXT,
    personId         INTEGER REFERENCES people(id),
    archetypeId      INTEGER REFERENCES archetypes(id),
    colorHasW        BOOLEAN,
    colorHasU        BOOLEAN,
    colorHasB        BOOLEAN,
    colorHasR        BOOLEAN,
    colorHasG        BOOLEAN,
    colorHasC        BOOLEAN,
    colorHasS        BOOLEAN,
    createdDatetime  TEXT,             -- RFC 3339 UTC, second precision
    updatedDatetime  TEXT,             -- RFC 3339 UTC, second precision
    url              TEXT,
    competitionId    INTEGER,
    finish           INTEGER,
    retired          BOOLEAN,
    wins             INTEGER,
    losses           INTEGER,
    draws            INTEGER,
    matches          INTEGER,
    omwPercent       INTEGER
);

-- Card entries are owned by their deck and replaced wholesale when it changes.
CREATE TABLE IF NOT EXISTS maindecks (
    id      INTEGER PRIMARY KEY,
    deckId  INTEGER NOT NULL REFERENCES decks(id),
    n       INTEGER NOT NULL,
    name    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sideboards (
    id      INTEGER PRIMARY KEY,
    deckId  INTEGER NOT NULL REFERENCES decks(id),
    n       INTEGER NOT NULL,
    name    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS decks_season_idx      ON decks(seasonId);
CREATE INDEX IF NOT EXISTS maindecks_deck_idx    ON maindecks(deckId);
CREATE INDEX IF NOT EXISTS sideboards_deck_idx   ON sideboards(deckId);
";
