//! SQL DDL for the SQLite record store.

/// - `members` mirrors the Supabase `members` table
/// - `scores.played_at` is stored as fixed-width RFC3339 text so that string
///   order matches time order
/// - `idx_scores_rank` backs the leaderboard query
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    bio TEXT NULL,
    image_url TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_name TEXT NOT NULL,
    score INTEGER NOT NULL,
    total_questions INTEGER NOT NULL,
    accuracy REAL NOT NULL,
    played_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scores_rank ON scores(accuracy DESC, played_at DESC);
"#;
