use crate::db::models::{Member, NewMember, Score};
use crate::db::schema::SQLITE_INIT;
use crate::db::RecordStore;
use crate::error::QuizError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct SqliteRecords {
    pool: SqlitePool,
}

impl SqliteRecords {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply
    /// the schema.
    pub async fn connect(database_url: &str) -> Result<Self, QuizError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_opts = SqlitePoolOptions::new();
        // every connection to `:memory:` is its own database
        if database_url.contains(":memory:") {
            pool_opts = pool_opts.max_connections(1);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), QuizError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_member(row: SqliteRow) -> Result<Member, QuizError> {
        let created_at: String = row.try_get("created_at")?;
        Ok(Member {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            bio: row.try_get("bio")?,
            image_url: row.try_get("image_url")?,
            created_at: Some(parse_timestamp(&created_at)?),
        })
    }

    fn row_to_score(row: SqliteRow) -> Result<Score, QuizError> {
        let played_at: String = row.try_get("played_at")?;
        Ok(Score {
            user_name: row.try_get("user_name")?,
            score: row.try_get("score")?,
            total_questions: row.try_get("total_questions")?,
            accuracy: row.try_get("accuracy")?,
            played_at: parse_timestamp(&played_at)?,
        })
    }
}

/// Fixed-width UTC timestamp; lexical order equals chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, QuizError> {
    let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(parsed.with_timezone(&Utc))
}

#[async_trait]
impl RecordStore for SqliteRecords {
    async fn insert_member(&self, member: &NewMember) -> Result<(), QuizError> {
        let bio = Some(member.bio.as_str()).filter(|b| !b.is_empty());
        sqlx::query("INSERT INTO members (name, bio, image_url, created_at) VALUES (?, ?, ?, ?)")
            .bind(&member.name)
            .bind(bio)
            .bind(&member.image_url)
            .bind(format_timestamp(&Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_members(&self) -> Result<Vec<Member>, QuizError> {
        let rows = sqlx::query(
            "SELECT id, name, bio, image_url, created_at FROM members ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn count_members(&self) -> Result<u64, QuizError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0.max(0) as u64)
    }

    async fn insert_score(&self, score: &Score) -> Result<(), QuizError> {
        sqlx::query(
            r#"INSERT INTO scores (user_name, score, total_questions, accuracy, played_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&score.user_name)
        .bind(score.score)
        .bind(score.total_questions)
        .bind(score.accuracy)
        .bind(format_timestamp(&score.played_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<Score>, QuizError> {
        let rows = sqlx::query(
            r#"SELECT user_name, score, total_questions, accuracy, played_at
               FROM scores
               ORDER BY accuracy DESC, played_at DESC
               LIMIT ?"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_score).collect()
    }
}
