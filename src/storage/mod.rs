//! Object storage for watermarked photos.

pub mod local;
pub mod supabase;

use async_trait::async_trait;

use crate::error::QuizError;
pub use local::LocalImageStore;
pub use supabase::SupabaseImageStore;

/// Upper bound on numbered variants tried for one key.
pub const MAX_KEY_ATTEMPTS: u32 = 100;

/// `attempt` 1 is the key itself; later attempts insert `-<n>` before the
/// extension, so `kim_1.png` becomes `kim_1-2.png`.
pub fn numbered_key(key: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return key.to_string();
    }
    match key.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{attempt}.{ext}"),
        _ => format!("{key}-{attempt}"),
    }
}

/// Persists an encoded image and returns the location clients should use to
/// fetch it. An existing object is never replaced: when `key` is taken the
/// store picks the next free [`numbered_key`].
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, QuizError>;
}
