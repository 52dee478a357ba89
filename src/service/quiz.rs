use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, de};
use thiserror::Error as ThisError;

use crate::db::{Member, Score};
use crate::error::QuizError;

pub const MIN_QUIZ_MEMBERS: usize = 2;
pub const MAX_QUIZ_QUESTIONS: usize = 10;
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum QuizUnavailable {
    #[error("At least 2 members must be registered to start the quiz (found {found}).")]
    NotEnoughMembers { found: usize },
}

/// Shuffle the roster and keep up to [`MAX_QUIZ_QUESTIONS`] of them.
pub fn pick_session<R: Rng + ?Sized>(
    mut members: Vec<Member>,
    rng: &mut R,
) -> Result<Vec<Member>, QuizUnavailable> {
    if members.len() < MIN_QUIZ_MEMBERS {
        return Err(QuizUnavailable::NotEnoughMembers {
            found: members.len(),
        });
    }
    members.shuffle(rng);
    members.truncate(MAX_QUIZ_QUESTIONS);
    Ok(members)
}

/// Body of `POST /api/quiz_submit`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub score: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub total: i64,
}

/// Whole numbers arrive from browsers as `7`, `7.0` or `"7"`; all mean 7.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let whole = |f: f64| -> Result<i64, D::Error> {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Ok(f as i64)
        } else {
            Err(de::Error::custom(format!("expected a whole number, got {f}")))
        }
    };
    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Float(f) => whole(f),
        Raw::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => Ok(n),
                Err(_) => Err(de::Error::custom(format!("expected a whole number, got {s:?}"))),
            }
        }
    }
}

impl QuizSubmission {
    pub fn into_score(self, played_at: DateTime<Utc>) -> Result<Score, QuizError> {
        if self.score < 0 || self.total < 0 {
            return Err(QuizError::validation("score and total must not be negative"));
        }
        let user_name = self
            .user_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        Ok(Score::new(user_name, self.score, self.total, played_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn roster(n: usize) -> Vec<Member> {
        (0..n)
            .map(|i| Member {
                id: Some(i as i64),
                name: format!("m{i}"),
                bio: None,
                image_url: format!("/static/uploads/m{i}.jpg"),
                created_at: None,
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_members_is_unavailable() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            pick_session(roster(0), &mut rng),
            Err(QuizUnavailable::NotEnoughMembers { found: 0 })
        );
        assert_eq!(
            pick_session(roster(1), &mut rng),
            Err(QuizUnavailable::NotEnoughMembers { found: 1 })
        );
    }

    #[test]
    fn session_is_capped_at_ten_distinct_members() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_session(roster(25), &mut rng).unwrap();
        assert_eq!(picked.len(), MAX_QUIZ_QUESTIONS);

        let mut names: Vec<_> = picked.iter().map(|m| m.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), MAX_QUIZ_QUESTIONS);
    }

    #[test]
    fn small_roster_is_kept_whole() {
        let mut rng = StdRng::seed_from_u64(1);
        let picked = pick_session(roster(3), &mut rng).unwrap();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn submission_defaults_to_anonymous() {
        let sub: QuizSubmission = serde_json::from_str(r#"{"score": 7, "total": 10}"#).unwrap();
        let score = sub.into_score(Utc::now()).unwrap();
        assert_eq!(score.user_name, ANONYMOUS);
        assert_eq!(score.accuracy, 70.0);
    }

    #[test]
    fn zero_total_gives_zero_accuracy() {
        let sub = QuizSubmission {
            user_name: Some("Kim".into()),
            score: 0,
            total: 0,
        };
        assert_eq!(sub.into_score(Utc::now()).unwrap().accuracy, 0.0);
    }

    #[test]
    fn negative_values_are_rejected() {
        let sub = QuizSubmission {
            user_name: None,
            score: -1,
            total: 10,
        };
        assert!(matches!(sub.into_score(Utc::now()), Err(QuizError::Validation(_))));
    }

    #[test]
    fn numbers_may_arrive_as_strings_or_whole_floats() {
        let sub: QuizSubmission =
            serde_json::from_str(r#"{"score": "7", "total": 10.0}"#).unwrap();
        assert_eq!((sub.score, sub.total), (7, 10));

        let sub: QuizSubmission = serde_json::from_str(r#"{"score": " 3 ", "total": "4"}"#).unwrap();
        assert_eq!((sub.score, sub.total), (3, 4));
    }

    #[test]
    fn fractional_or_non_numeric_values_are_rejected() {
        assert!(serde_json::from_str::<QuizSubmission>(r#"{"score": 7.5, "total": 10}"#).is_err());
        assert!(serde_json::from_str::<QuizSubmission>(r#"{"score": "seven", "total": 10}"#).is_err());
        assert!(serde_json::from_str::<QuizSubmission>(r#"{"score": null, "total": 10}"#).is_err());
    }
}
