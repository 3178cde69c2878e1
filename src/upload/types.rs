use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

/// Identity of an upload item. Assigned sequentially by the controller, so
/// ordering by id is intake order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file handed over by the intake surface. Bytes are only read when the
/// transport transmits the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub ctr: f64,
    pub cvr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub variation_url: String,
    pub predicted_ctr: f64,
    pub predicted_cvr: f64,
}

impl Variation {
    pub fn predictions(&self) -> Predictions {
        Predictions {
            ctr: self.predicted_ctr,
            cvr: self.predicted_cvr,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Queued,
    Uploading { progress: u8 },
    Processing,
    Completed {
        predictions: Predictions,
        variations: Vec<Variation>,
    },
    Failed { reason: String },
}

impl UploadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Queued => "Queued",
            UploadStatus::Uploading { .. } => "Uploading",
            UploadStatus::Processing => "Processing",
            UploadStatus::Completed { .. } => "Completed",
            UploadStatus::Failed { .. } => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed { .. } | UploadStatus::Failed { .. }
        )
    }
}

/// Reference to an item's image, valid until released back to the
/// [`PreviewStore`](super::preview::PreviewStore). The store resolves it to
/// the source file; the window decodes that into a thumbnail texture named
/// after the reference and drops the texture once the reference is released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(pub String);

#[derive(Debug, Clone)]
pub struct UploadItem {
    pub id: ItemId,
    pub source: FileHandle,
    pub preview: PreviewRef,
    pub status: UploadStatus,
    pub correlation_id: Uuid,
    pub image_reference: Option<String>,
    pub processing_since: Option<Instant>,
}

impl UploadItem {
    pub fn predictions(&self) -> Option<Predictions> {
        match &self.status {
            UploadStatus::Completed { predictions, .. } => Some(*predictions),
            _ => None,
        }
    }

    pub fn progress(&self) -> u8 {
        match self.status {
            UploadStatus::Queued => 0,
            UploadStatus::Uploading { progress } => progress,
            _ => 100,
        }
    }
}

/// Everything the processing endpoint needs for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    pub item_id: ItemId,
    pub image_reference: String,
    pub variation_count: u32,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadSummary {
    pub total: usize,
    pub uploading: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn in_flight(&self) -> usize {
        self.uploading + self.processing
    }
}
