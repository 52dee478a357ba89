use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::KeyScheme;
use crate::db::RecordStore;
use crate::handlers::{api, pages};
use crate::service::upload::WatermarkSettings;
use crate::storage::ImageStore;
use crate::templates::Templates;

/// Per-request dependencies, built once at startup.
#[derive(Clone)]
pub struct QuizState {
    pub records: Arc<dyn RecordStore>,
    pub images: Arc<dyn ImageStore>,
    pub templates: Arc<Templates>,
    pub watermark: Arc<WatermarkSettings>,
    pub key_scheme: KeyScheme,
}

impl QuizState {
    pub fn new(
        records: Arc<dyn RecordStore>,
        images: Arc<dyn ImageStore>,
        templates: Templates,
        watermark: WatermarkSettings,
        key_scheme: KeyScheme,
    ) -> Self {
        Self {
            records,
            images,
            templates: Arc::new(templates),
            watermark: Arc::new(watermark),
            key_scheme,
        }
    }
}

/// Router options that are not request dependencies.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_upload_bytes: usize,
    /// `(url prefix, directory)` served as static files.
    pub static_files: Option<(String, PathBuf)>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            static_files: None,
        }
    }
}

pub fn quiz_router(state: QuizState, opts: RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/", get(pages::index))
        .route("/quiz", get(pages::quiz))
        .route("/upload", get(pages::upload_page))
        .route("/leaderboard", get(pages::leaderboard))
        .route("/api/upload_member", post(api::upload_member))
        .route("/api/quiz_submit", post(api::quiz_submit))
        .route("/api/members", get(api::members))
        .layer(DefaultBodyLimit::max(opts.max_upload_bytes))
        .with_state(state);

    if let Some((prefix, dir)) = opts.static_files {
        router = router.nest_service(&prefix, ServeDir::new(dir));
    }
    router
}
