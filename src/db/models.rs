use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered participant. `image_url` always points at the watermarked
/// copy of the photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    pub image_url: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize_opt"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for the `members` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub image_url: String,
    pub bio: String,
}

impl From<NewMember> for Member {
    fn from(m: NewMember) -> Self {
        Self {
            id: None,
            name: m.name,
            bio: Some(m.bio).filter(|b| !b.is_empty()),
            image_url: m.image_url,
            created_at: None,
        }
    }
}

/// One finished quiz attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Score {
    pub user_name: String,
    pub score: i64,
    pub total_questions: i64,
    pub accuracy: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub played_at: DateTime<Utc>,
}

impl Score {
    pub fn new(user_name: String, score: i64, total_questions: i64, played_at: DateTime<Utc>) -> Self {
        Self {
            user_name,
            score,
            total_questions,
            accuracy: accuracy(score, total_questions),
            played_at,
        }
    }
}

/// Percentage of correct answers rounded to one decimal place; `0.0` when no
/// questions were asked.
pub fn accuracy(score: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = score as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// PostgREST returns `timestamp` columns without an offset and `timestamptz`
/// columns with one; both are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
    }

    pub fn deserialize<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(de)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub fn deserialize_opt<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de)?
            .map(|raw| parse(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
