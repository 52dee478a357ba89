use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{ImageStore, MAX_KEY_ATTEMPTS, numbered_key};
use crate::error::QuizError;

/// Writes images into a directory that the server also exposes as static
/// files under `public_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, QuizError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let candidate = numbered_key(key, attempt);
            let path = self.dir.join(&candidate);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match opened {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(&bytes).await?;
            file.flush().await?;
            debug!(path = %path.display(), "stored image");
            return Ok(format!("{}/{}", self.public_prefix, candidate));
        }
        Err(QuizError::KeyExhausted {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_public_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(tmp.path().join("uploads"), "/static/uploads/");

        let url = store.put("kim_1.png", vec![1, 2, 3], "image/png").await.unwrap();

        assert_eq!(url, "/static/uploads/kim_1.png");
        let written = std::fs::read(tmp.path().join("uploads/kim_1.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn taken_key_gets_numbered_instead_of_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(tmp.path(), "/static/uploads");

        let first = store.put("kim_1.png", vec![1], "image/png").await.unwrap();
        let second = store.put("kim_1.png", vec![2], "image/png").await.unwrap();
        let third = store.put("kim_1.png", vec![3], "image/png").await.unwrap();

        assert_eq!(first, "/static/uploads/kim_1.png");
        assert_eq!(second, "/static/uploads/kim_1-2.png");
        assert_eq!(third, "/static/uploads/kim_1-3.png");
        assert_eq!(std::fs::read(tmp.path().join("kim_1.png")).unwrap(), vec![1]);
        assert_eq!(std::fs::read(tmp.path().join("kim_1-2.png")).unwrap(), vec![2]);
        assert_eq!(std::fs::read(tmp.path().join("kim_1-3.png")).unwrap(), vec![3]);
    }
}
