//! SQL schema for the move store.
//!
//! Idempotent; executed every time a writable handle is opened so a new
//! archive can be appended to an existing file without setup.

pub const SCHEMA: &str = "
-- One row per ply. Rows are only ever appended.
CREATE TABLE IF NOT EXISTS moves (
    ply             INTEGER NOT NULL,
    fen_before      TEXT    NOT NULL,   -- FEN without move counters
    move_san        TEXT    NOT NULL,
    mover           TEXT    NOT NULL,   -- 'white' | 'black'
    average_rating  INTEGER,            -- floor((white + black) / 2)
    player_rating   INTEGER,            -- rating of the mover
    mover_score     TINYINT NOT NULL,   -- 2 win, 1 draw, 0 loss
    source          TEXT    NOT NULL,   -- 'bulk' | 'player'
    game_id         TEXT,
    rated           INTEGER,
    variant         TEXT,
    speed           TEXT
);

CREATE INDEX IF NOT EXISTS moves_fen_idx ON moves(fen_before);

CREATE TABLE IF NOT EXISTS ingest_runs (
    fingerprint     TEXT    NOT NULL,
    source_path     TEXT    NOT NULL,
    games_read      INTEGER NOT NULL,
    rows_inserted   INTEGER NOT NULL,
    finished_at     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS ingest_runs_fingerprint_idx ON ingest_runs(fingerprint);
";
