use super::error::ValidationError;
use super::types::FileHandle;
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Limits and pacing applied by the upload controller.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    pub accepted_media_types: Vec<String>,
    pub max_file_size: u64,
    /// Percentage points added per progress tick.
    pub progress_step: u8,
    pub progress_interval: Duration,
    pub processing_timeout: Duration,
    pub variation_count: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            accepted_media_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            progress_step: 10,
            progress_interval: Duration::from_millis(200),
            processing_timeout: Duration::from_secs(30),
            variation_count: 3,
        }
    }
}

impl UploadPolicy {
    pub fn validate(&self, file: &FileHandle) -> Result<(), ValidationError> {
        let media_type = file.media_type.to_ascii_lowercase();
        if !self
            .accepted_media_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&media_type))
        {
            return Err(ValidationError::UnsupportedType {
                name: file.name.clone(),
                media_type: file.media_type.clone(),
            });
        }

        if file.size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                name: file.name.clone(),
                size: file.size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Number of ticks needed to go from 0 to 100. A zero step is treated
    /// as a single jump.
    pub fn ticks_to_complete(&self) -> u32 {
        match self.progress_step {
            0 => 1,
            step => 100u32.div_ceil(u32::from(step)),
        }
    }

    pub fn effective_step(&self) -> u8 {
        match self.progress_step {
            0 => 100,
            step => step.min(100),
        }
    }

    /// File extensions matching the accepted media types, for dialog filters.
    pub fn accepted_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .accepted_media_types
            .iter()
            .filter_map(|media_type| mime_guess::get_mime_extensions_str(media_type))
            .flat_map(|exts| exts.iter().map(|ext| ext.to_string()))
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }
}
