//! Record storage for members and scores.
//!
//! Layout:
//! - `models.rs`: rows exchanged with the stores
//! - `schema.rs`: SQL DDL for the SQLite backend
//! - `sqlite.rs`: local SQLite store
//! - `supabase.rs`: Supabase (PostgREST) store

pub mod models;
pub mod schema;
pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;

use crate::error::QuizError;
pub use models::{Member, NewMember, Score};
pub use sqlite::{SqlitePool, SqliteRecords};
pub use supabase::SupabaseRecords;

/// Number of rows shown on the leaderboard.
pub const LEADERBOARD_LIMIT: usize = 50;

/// Backend holding member and score rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_member(&self, member: &NewMember) -> Result<(), QuizError>;

    async fn list_members(&self) -> Result<Vec<Member>, QuizError>;

    async fn count_members(&self) -> Result<u64, QuizError>;

    async fn insert_score(&self, score: &Score) -> Result<(), QuizError>;

    /// Highest accuracy first; ties go to the most recent play.
    async fn top_scores(&self, limit: usize) -> Result<Vec<Score>, QuizError>;
}
