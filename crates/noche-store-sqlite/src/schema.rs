//! SQL schema for the Noche SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS events (
    event_id   TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    status     TEXT NOT NULL,    -- 'upcoming' | 'current' | 'past' | 'cancelled'
    starts_at  TEXT              -- RFC 3339 UTC or NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    user_id      TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    age          INTEGER,
    gender       TEXT,
    orientation  TEXT,
    photo_refs   TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    bio          TEXT
);

-- Roster order is insertion order (rowid).
CREATE TABLE IF NOT EXISTS participants (
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    user_id    TEXT NOT NULL,
    joined_at  TEXT NOT NULL,
    PRIMARY KEY (event_id, user_id)
);

-- One row per (event, from, to); rows are never updated except to fill in
-- detected_at on likes.
CREATE TABLE IF NOT EXISTS decisions (
    event_id    TEXT NOT NULL,
    from_user   TEXT NOT NULL,
    to_user     TEXT NOT NULL,
    kind        TEXT NOT NULL,   -- 'like' | 'dislike'
    created_at  TEXT NOT NULL,
    detected_at TEXT,
    PRIMARY KEY (event_id, from_user, to_user),
    CHECK (from_user != to_user)
);

CREATE TABLE IF NOT EXISTS matches (
    match_id   TEXT PRIMARY KEY,
    event_id   TEXT NOT NULL,
    user_a     TEXT NOT NULL,
    user_b     TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (event_id, user_a, user_b),
    CHECK  (user_a < user_b)
);

-- Only the SHA-256 of each token is stored.
CREATE TABLE IF NOT EXISTS access_tokens (
    token_hash TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    issued_at  TEXT NOT NULL,
    revoked_at TEXT
);

CREATE INDEX IF NOT EXISTS decisions_pending_idx
    ON decisions(created_at) WHERE kind = 'like' AND detected_at IS NULL;
CREATE INDEX IF NOT EXISTS matches_user_a_idx ON matches(event_id, user_a);
CREATE INDEX IF NOT EXISTS matches_user_b_idx ON matches(event_id, user_b);
CREATE INDEX IF NOT EXISTS tokens_user_idx    ON access_tokens(user_id);

PRAGMA user_version = 1;
";
