use async_trait::async_trait;

use crate::api::SupabaseClient;
use crate::db::models::{Member, NewMember, Score};
use crate::db::RecordStore;
use crate::error::QuizError;

const MEMBERS: &str = "members";
const SCORES: &str = "scores";

/// Record store backed by the Supabase `members` and `scores` tables.
#[derive(Debug, Clone)]
pub struct SupabaseRecords {
    client: SupabaseClient,
}

impl SupabaseRecords {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStore for SupabaseRecords {
    async fn insert_member(&self, member: &NewMember) -> Result<(), QuizError> {
        self.client.insert(MEMBERS, member).await
    }

    async fn list_members(&self) -> Result<Vec<Member>, QuizError> {
        self.client.select(MEMBERS, &[("select", "*")]).await
    }

    async fn count_members(&self) -> Result<u64, QuizError> {
        self.client.count(MEMBERS).await
    }

    async fn insert_score(&self, score: &Score) -> Result<(), QuizError> {
        self.client.insert(SCORES, score).await
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<Score>, QuizError> {
        let limit = limit.to_string();
        self.client
            .select(
                SCORES,
                &[
                    ("select", "user_name,score,total_questions,accuracy,played_at"),
                    ("order", "accuracy.desc,played_at.desc"),
                    ("limit", limit.as_str()),
                ],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseSettings;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path, query_param},
    };

    fn store_for(server: &MockServer) -> SupabaseRecords {
        let settings = SupabaseSettings {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: "anon".to_string(),
        };
        SupabaseRecords::new(SupabaseClient::new(&settings).unwrap())
    }

    #[tokio::test]
    async fn list_members_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/members"))
            .and(query_param("select", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Kim", "bio": "hi", "image_url": "/static/uploads/kim_1.png",
                 "created_at": "2025-01-01T00:00:00+00:00"},
                {"id": 2, "name": "Lee", "bio": null, "image_url": "/static/uploads/lee_2.jpg"}
            ])))
            .mount(&server)
            .await;

        let members = store_for(&server).list_members().await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].bio.as_deref(), Some("hi"));
        assert!(members[0].created_at.is_some());
        assert_eq!(members[1].bio, None);
    }

    #[tokio::test]
    async fn insert_score_posts_derived_accuracy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/scores"))
            .and(body_partial_json(json!({
                "user_name": "Kim", "score": 7, "total_questions": 10, "accuracy": 70.0
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let played_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        store_for(&server)
            .insert_score(&Score::new("Kim".to_string(), 7, 10, played_at))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn top_scores_requests_ranked_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/scores"))
            .and(query_param("order", "accuracy.desc,played_at.desc"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user_name": "a", "score": 9, "total_questions": 10, "accuracy": 90.0,
                 "played_at": "2025-03-01T10:00:00.5"}
            ])))
            .mount(&server)
            .await;

        let scores = store_for(&server).top_scores(50).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].accuracy, 90.0);
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let server = MockServer::start().await;
        let store = store_for(&server);
        drop(server);

        assert!(store.list_members().await.is_err());
    }
}
