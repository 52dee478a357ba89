pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod server;
pub mod service;
pub mod storage;
pub mod templates;
pub mod watermark;

pub use error::QuizError;
pub use watermark::{CaptionFont, WatermarkJob, Watermarked};
