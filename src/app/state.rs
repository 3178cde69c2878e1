use crate::upload::{Notification, UploadItem, UploadStatus, UploadSummary};
use std::time::{Duration, Instant};

pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

#[derive(Default)]
pub struct UploadState {
    pub project_name: String,
    pub description: String,
    pub toasts: Vec<Toast>,
    pub show_details: bool,
}

impl UploadState {
    pub fn clear_form(&mut self) {
        self.project_name.clear();
        self.description.clear();
    }

    pub fn push_toast(&mut self, notification: Notification, now: Instant) {
        self.toasts.push(Toast {
            notification,
            shown_at: now,
        });
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < TOAST_LIFETIME);
    }
}

/// Checks the project form before creating a project. The `Ok` and `Err`
/// notifications are both meant for the user.
pub fn project_submission(
    project_name: &str,
    item_count: usize,
) -> Result<Notification, Notification> {
    if project_name.trim().is_empty() {
        return Err(Notification::error(
            "Project name required",
            "Please enter a project name before submitting.",
        ));
    }
    if item_count == 0 {
        return Err(Notification::error(
            "No files uploaded",
            "Please upload at least one image.",
        ));
    }
    Ok(Notification::success(
        "Project created!",
        format!("{} creatives uploaded successfully.", item_count),
    ))
}

/// Share of the total work done across items, in `0.0..=1.0`.
pub fn get_progress_percentage<'a>(items: impl Iterator<Item = &'a UploadItem>) -> f32 {
    let mut total = 0.0;
    let mut count = 0;
    for item in items {
        count += 1;
        total += match item.status {
            UploadStatus::Queued => 0.0,
            UploadStatus::Uploading { progress } => f32::from(progress) / 200.0,
            UploadStatus::Processing => 0.5,
            UploadStatus::Completed { .. } | UploadStatus::Failed { .. } => 1.0,
        };
    }
    if count == 0 {
        0.0
    } else {
        total / count as f32
    }
}

pub fn get_status_text(summary: &UploadSummary) -> String {
    if summary.total == 0 {
        return String::new();
    }
    if summary.in_flight() == 0 {
        format!(
            "Final Status: {} files | ✅ Completed: {} | ❌ Failed: {}",
            summary.total, summary.completed, summary.failed
        )
    } else {
        format!(
            "Progress: {}/{} files | 📤 Uploading: {} | ⏳ Processing: {} | ❌ Failed: {}",
            summary.completed + summary.failed,
            summary.total,
            summary.uploading,
            summary.processing,
            summary.failed
        )
    }
}
