use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error as ThisError;
use url::Url;

use crate::watermark::DEFAULT_ANGLE;

/// Environment variables read without a prefix, kept compatible with the
/// variable names the deployment already uses.
const RAW_ENV_KEYS: [&str; 3] = ["SUPABASE_URL", "SUPABASE_ANON_KEY", "PORT"];

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("SUPABASE_URL or SUPABASE_ANON_KEY is not set")]
    MissingSupabase,

    #[error("invalid SUPABASE_URL: {0}")]
    InvalidSupabaseUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Where member and score rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordBackend {
    Supabase,
    Sqlite,
}

/// Where watermarked photos are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackend {
    Local,
    Supabase,
}

/// How upload storage keys are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    Slug,
    Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    pub text: String,
    pub angle: f32,
    /// TrueType font used for the caption. Missing or unreadable files fall
    /// back to the built-in bitmap font.
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "ORACLE-BOOTCAMP".to_string(),
            angle: DEFAULT_ANGLE,
            font_path: Some(PathBuf::from("arial.ttf")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub loglevel: String,

    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,

    pub record_backend: RecordBackend,
    pub database_url: String,

    pub image_backend: ImageBackend,
    pub upload_dir: PathBuf,
    pub public_prefix: String,
    pub storage_bucket: String,

    pub key_scheme: KeyScheme,
    pub max_upload_bytes: usize,

    pub watermark: WatermarkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            loglevel: "info".to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            record_backend: RecordBackend::Supabase,
            database_url: "sqlite:facequiz.db".to_string(),
            image_backend: ImageBackend::Local,
            upload_dir: PathBuf::from("static/uploads"),
            public_prefix: "/static/uploads".to_string(),
            storage_bucket: "photos".to_string(),
            key_scheme: KeyScheme::Slug,
            max_upload_bytes: 10 * 1024 * 1024,
            watermark: WatermarkConfig::default(),
        }
    }
}

/// Validated connection settings for the Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: Url,
    pub anon_key: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `PORT` are read as-is; every
    /// other field comes from `FACEQUIZ_*` variables, nested with `__`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Env::raw().only(&RAW_ENV_KEYS))
                .merge(Env::prefixed("FACEQUIZ_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract().map_err(Box::new)?;
        cfg.supabase()?;
        Ok(cfg)
    }

    /// The Supabase endpoint and key. Both are required at startup regardless
    /// of the selected backends.
    pub fn supabase(&self) -> Result<SupabaseSettings, ConfigError> {
        let (Some(url), Some(key)) = (
            self.supabase_url.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            self.supabase_anon_key.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        ) else {
            return Err(ConfigError::MissingSupabase);
        };
        Ok(SupabaseSettings {
            url: Url::parse(url)?,
            anon_key: key.to_string(),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figment_with(pairs: &[(&str, &str)]) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        for (k, v) in pairs {
            figment = figment.merge(Serialized::default(k, v));
        }
        figment
    }

    #[test]
    fn missing_supabase_settings_is_fatal() {
        let err = Config::from_figment(figment_with(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSupabase));

        let err = Config::from_figment(figment_with(&[("supabase_url", "https://x.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSupabase));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = Config::from_figment(figment_with(&[
            ("supabase_url", "https://x.supabase.co"),
            ("supabase_anon_key", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSupabase));
    }

    #[test]
    fn defaults_apply_when_supabase_present() {
        let cfg = Config::from_figment(figment_with(&[
            ("supabase_url", "https://x.supabase.co"),
            ("supabase_anon_key", "anon"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.record_backend, RecordBackend::Supabase);
        assert_eq!(cfg.image_backend, ImageBackend::Local);
        assert_eq!(cfg.key_scheme, KeyScheme::Slug);
        assert_eq!(cfg.watermark.text, "ORACLE-BOOTCAMP");
        assert_eq!(cfg.watermark.angle, 20.0);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5000");

        let supabase = cfg.supabase().unwrap();
        assert_eq!(supabase.url.as_str(), "https://x.supabase.co/");
        assert_eq!(supabase.anon_key, "anon");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = Config::from_figment(figment_with(&[
            ("supabase_url", "not a url"),
            ("supabase_anon_key", "anon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSupabaseUrl(_)));
    }

    #[test]
    fn backends_parse_from_lowercase_names() {
        let cfg = Config::from_figment(figment_with(&[
            ("supabase_url", "https://x.supabase.co"),
            ("supabase_anon_key", "anon"),
            ("record_backend", "sqlite"),
            ("image_backend", "supabase"),
            ("key_scheme", "uuid"),
        ]))
        .unwrap();
        assert_eq!(cfg.record_backend, RecordBackend::Sqlite);
        assert_eq!(cfg.image_backend, ImageBackend::Supabase);
        assert_eq!(cfg.key_scheme, KeyScheme::Uuid);
    }
}
