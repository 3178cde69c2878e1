use crate::upload::UploadPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "creative_uploader.toml";
const DEFAULT_WEBHOOK_ID: &str = "b40c88ef-a66b-4620-bd86-dfb6a10cc569";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the workflow service. Without it the app runs on the
    /// simulated endpoint.
    pub webhook_base_url: Option<String>,
    pub webhook_id: String,
    pub asset_upload_url: Option<String>,
    pub accepted_media_types: Vec<String>,
    pub max_file_size: u64,
    pub progress_step: u8,
    pub progress_interval_ms: u64,
    pub processing_timeout_secs: u64,
    pub variation_count: u32,
    pub simulated_upload_ms: u64,
    pub simulated_processing_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = UploadPolicy::default();
        Self {
            webhook_base_url: None,
            webhook_id: DEFAULT_WEBHOOK_ID.to_string(),
            asset_upload_url: None,
            accepted_media_types: policy.accepted_media_types,
            max_file_size: policy.max_file_size,
            progress_step: policy.progress_step,
            progress_interval_ms: policy.progress_interval.as_millis() as u64,
            processing_timeout_secs: policy.processing_timeout.as_secs(),
            variation_count: policy.variation_count,
            simulated_upload_ms: 2000,
            simulated_processing_ms: 2000,
        }
    }
}

impl Settings {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            accepted_media_types: self.accepted_media_types.clone(),
            max_file_size: self.max_file_size,
            progress_step: self.progress_step,
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            processing_timeout: Duration::from_secs(self.processing_timeout_secs),
            variation_count: self.variation_count,
        }
    }

    pub fn webhook_url(&self) -> Option<String> {
        self.webhook_base_url.as_ref().map(|base| {
            format!("{}/webhook/{}", base.trim_end_matches('/'), self.webhook_id)
        })
    }
}

/// Defaults, then `creative_uploader.toml` in the working directory if
/// present, then environment variables.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = Path::new(CONFIG_FILE);
    let file = path.exists().then_some(path);
    load_settings_from(file, |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    file: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let mut settings = match file {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Settings>(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => Settings::default(),
    };

    if let Some(v) = env("N8N_URL") {
        settings.webhook_base_url = Some(v);
    }
    if let Some(v) = env("CREATIVE_UPLOADER__WEBHOOK_BASE_URL") {
        settings.webhook_base_url = Some(v);
    }
    if let Some(v) = env("CREATIVE_UPLOADER__WEBHOOK_ID") {
        settings.webhook_id = v;
    }
    if let Some(v) = env("CREATIVE_UPLOADER__ASSET_UPLOAD_URL") {
        settings.asset_upload_url = Some(v);
    }
    if let Some(v) = env("CREATIVE_UPLOADER__ACCEPTED_MEDIA_TYPES") {
        settings.accepted_media_types = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = env("CREATIVE_UPLOADER__MAX_FILE_SIZE") {
        settings.max_file_size = parse_number("CREATIVE_UPLOADER__MAX_FILE_SIZE", &v)?;
    }
    if let Some(v) = env("CREATIVE_UPLOADER__PROGRESS_STEP") {
        settings.progress_step = parse_number("CREATIVE_UPLOADER__PROGRESS_STEP", &v)?;
    }
    if let Some(v) = env("CREATIVE_UPLOADER__PROGRESS_INTERVAL_MS") {
        settings.progress_interval_ms =
            parse_number("CREATIVE_UPLOADER__PROGRESS_INTERVAL_MS", &v)?;
    }
    if let Some(v) = env("CREATIVE_UPLOADER__PROCESSING_TIMEOUT_SECS") {
        settings.processing_timeout_secs =
            parse_number("CREATIVE_UPLOADER__PROCESSING_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = env("CREATIVE_UPLOADER__VARIATION_COUNT") {
        settings.variation_count = parse_number("CREATIVE_UPLOADER__VARIATION_COUNT", &v)?;
    }

    Ok(settings)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}
