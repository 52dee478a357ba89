use axum::http::StatusCode;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::config::SupabaseSettings;
use crate::error::QuizError;

/// Thin client for the Supabase REST (PostgREST) and Storage endpoints.
///
/// Cheap to clone; constructed once at startup and shared through the
/// application state.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(settings: &SupabaseSettings) -> Result<Self, QuizError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("facequiz/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http(http, settings))
    }

    pub fn with_http(http: reqwest::Client, settings: &SupabaseSettings) -> Self {
        Self {
            http,
            base: settings.url.clone(),
            key: settings.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, QuizError> {
        Ok(self.base.join(path)?)
    }

    fn table_url(&self, table: &str) -> Result<Url, QuizError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key).bearer_auth(&self.key)
    }

    /// Insert one row into `table`.
    pub async fn insert<T>(&self, table: &str, row: &T) -> Result<(), QuizError>
    where
        T: Serialize + ?Sized,
    {
        let resp = self
            .authed(self.http.post(self.table_url(table)?))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check_status(resp).await?;
        debug!(table, "inserted row");
        Ok(())
    }

    /// `GET /rest/v1/{table}` with the given PostgREST query parameters.
    pub async fn select<T>(&self, table: &str, query: &[(&str, &str)]) -> Result<Vec<T>, QuizError>
    where
        T: DeserializeOwned,
    {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().extend_pairs(query);
        let resp = self
            .authed(self.http.get(url))
            .header("Accept", "application/json")
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Exact row count of `table`, read from the `Content-Range` header.
    pub async fn count(&self, table: &str) -> Result<u64, QuizError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("select", "*");
        let resp = self
            .authed(self.http.head(url))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check_status(resp).await?;
        resp.headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| QuizError::UpstreamStatus {
                status: StatusCode::BAD_GATEWAY,
                body: "missing Content-Range total".to_string(),
            })
    }

    /// Upload an object to a Storage bucket and return its public URL.
    pub async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Url, QuizError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{key}"))?;
        let resp = self
            .authed(self.http.post(url))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(resp).await?;
        self.public_object_url(bucket, key)
    }

    pub fn public_object_url(&self, bucket: &str, key: &str) -> Result<Url, QuizError> {
        self.endpoint(&format!("storage/v1/object/public/{bucket}/{key}"))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, QuizError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(QuizError::UpstreamStatus { status, body })
}

/// `0-9/42` and `*/0` both carry the total after the slash.
fn parse_content_range_total(raw: &str) -> Option<u64> {
    raw.rsplit_once('/')?.1.trim().parse().ok()
}
