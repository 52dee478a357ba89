use async_trait::async_trait;
use axum::http::StatusCode;
use tracing::debug;

use super::{ImageStore, MAX_KEY_ATTEMPTS, numbered_key};
use crate::api::SupabaseClient;
use crate::error::QuizError;

/// Uploads images to a public Supabase Storage bucket.
#[derive(Debug, Clone)]
pub struct SupabaseImageStore {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseImageStore {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

/// Storage answers a taken key with 409, or with 400 and a `Duplicate` body
/// on older deployments.
fn is_duplicate(err: &QuizError) -> bool {
    match err {
        QuizError::UpstreamStatus { status, body } => {
            *status == StatusCode::CONFLICT
                || (*status == StatusCode::BAD_REQUEST && body.contains("Duplicate"))
        }
        _ => false,
    }
}

#[async_trait]
impl ImageStore for SupabaseImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, QuizError> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let candidate = numbered_key(key, attempt);
            match self
                .client
                .upload_object(&self.bucket, &candidate, bytes.clone(), content_type)
                .await
            {
                Ok(url) => return Ok(url.to_string()),
                Err(e) if is_duplicate(&e) => {
                    debug!(key = %candidate, "storage key taken; trying next");
                }
                Err(e) => return Err(e),
            }
        }
        Err(QuizError::KeyExhausted {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupabaseSettings;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn store_for(server: &MockServer) -> SupabaseImageStore {
        let settings = SupabaseSettings {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: "anon".to_string(),
        };
        SupabaseImageStore::new(SupabaseClient::new(&settings).unwrap(), "photos")
    }

    #[tokio::test]
    async fn duplicate_key_moves_to_numbered_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/photos/kim_1.png"))
            .respond_with(ResponseTemplate::new(409).set_body_string(r#"{"error":"Duplicate"}"#))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/photos/kim_1-2.png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = store_for(&server)
            .await
            .put("kim_1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        assert!(url.ends_with("/storage/v1/object/public/photos/kim_1-2.png"), "{url}");
    }

    #[tokio::test]
    async fn other_upstream_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/photos/kim_1.png"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store_for(&server)
            .await
            .put("kim_1.png", vec![1], "image/png")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QuizError::UpstreamStatus { status, .. } if status == StatusCode::FORBIDDEN
        ));
    }
}
