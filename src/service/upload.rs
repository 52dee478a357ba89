use axum::body::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::KeyScheme;
use crate::db::{NewMember, RecordStore};
use crate::error::QuizError;
use crate::storage::ImageStore;
use crate::watermark::{self, CaptionFont, OutputFormat, WatermarkJob};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

const MISSING_FIELDS: &str = "Name and photo are required.";
const INVALID_PHOTO: &str = "Please choose a valid photo file (png, jpg, jpeg, gif, webp).";

/// Extension after the last `.`, if the filename has one.
pub fn file_extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

pub fn is_allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        == Some(true)
}

/// Filesystem- and URL-safe form of a display name.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    let slug = slug.trim_matches(|c| c == '.' || c == '_');
    if slug.is_empty() {
        "member".to_string()
    } else {
        slug.to_string()
    }
}

/// Object key for a stored photo. The extension follows the encoded format.
pub fn storage_key(scheme: KeyScheme, name: &str, format: OutputFormat, now: DateTime<Utc>) -> String {
    let ext = match format {
        OutputFormat::Png => "png",
        OutputFormat::Jpeg => "jpg",
    };
    match scheme {
        KeyScheme::Slug => format!("{}_{}.{}", slugify(name), now.timestamp(), ext),
        KeyScheme::Uuid => format!("{}.{}", uuid::Uuid::new_v4().simple(), ext),
    }
}

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct PhotoPart {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw fields of the upload form, as received.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<PhotoPart>,
}

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct ValidUpload {
    pub name: String,
    pub bio: String,
    pub photo: PhotoPart,
}

impl UploadForm {
    pub fn validate(self) -> Result<ValidUpload, QuizError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let Some(photo) = self.photo.filter(|_| !name.is_empty()) else {
            return Err(QuizError::validation(MISSING_FIELDS));
        };
        if photo.filename.is_empty() || !is_allowed_file(&photo.filename) {
            return Err(QuizError::validation(INVALID_PHOTO));
        }
        Ok(ValidUpload {
            name: name.to_string(),
            bio: self.bio.as_deref().map(str::trim).unwrap_or_default().to_string(),
            photo,
        })
    }
}

/// Caption settings and font shared by every upload.
#[derive(Debug)]
pub struct WatermarkSettings {
    pub font: CaptionFont,
    pub caption: String,
    pub angle: f32,
}

/// Validate, watermark, store and record a new member.
pub async fn register_member(
    records: &dyn RecordStore,
    images: &dyn ImageStore,
    settings: Arc<WatermarkSettings>,
    key_scheme: KeyScheme,
    form: UploadForm,
) -> Result<NewMember, QuizError> {
    let upload = form.validate()?;

    let photo = upload.photo.bytes.clone();
    let filename = upload.photo.filename.clone();
    let marked = tokio::task::spawn_blocking(move || {
        watermark::apply(
            &WatermarkJob {
                image: &photo,
                caption: &settings.caption,
                angle: settings.angle,
                filename: &filename,
            },
            &settings.font,
        )
    })
    .await??;

    let key = storage_key(key_scheme, &upload.name, marked.format, Utc::now());
    let content_type = marked.format.content_type();
    let image_url = images.put(&key, marked.bytes, content_type).await?;

    let member = NewMember {
        name: upload.name,
        image_url,
        bio: upload.bio,
    };
    records.insert_member(&member).await?;
    info!(name = %member.name, image_url = %member.image_url, "member registered");
    Ok(member)
}
