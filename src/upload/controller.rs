use super::error::{ProcessingError, TransmissionError, ValidationError};
use super::notify::{Notification, NotificationSink};
use super::policy::UploadPolicy;
use super::preview::PreviewStore;
use super::types::{
    FileHandle, ItemId, ProcessingRequest, UploadItem, UploadStatus, UploadSummary, Variation,
};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a `submit` call. Both lists follow the order of the input.
#[derive(Debug, Default)]
pub struct SubmitOutcome {
    pub accepted: Vec<ItemId>,
    pub rejected: Vec<ValidationError>,
}

/// Owns the upload items and applies every state transition.
///
/// Events for ids that are no longer present, or that do not fit the
/// item's current state, are dropped without touching anything.
pub struct UploadController {
    policy: UploadPolicy,
    items: BTreeMap<ItemId, UploadItem>,
    previews: PreviewStore,
    sink: Box<dyn NotificationSink>,
    next_id: u64,
}

impl UploadController {
    pub fn new(policy: UploadPolicy, sink: Box<dyn NotificationSink>) -> Self {
        Self {
            policy,
            items: BTreeMap::new(),
            previews: PreviewStore::new(),
            sink,
            next_id: 0,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn submit(&mut self, files: Vec<FileHandle>) -> SubmitOutcome {
        let mut outcome = SubmitOutcome::default();

        if files.is_empty() {
            self.sink.notify(Notification::error(
                "No files provided",
                "Please select at least one image.",
            ));
            return outcome;
        }

        for file in files {
            if let Err(e) = self.policy.validate(&file) {
                warn!(file = e.file_name(), reason = e.reason(), "rejected file");
                self.sink
                    .notify(Notification::error("File rejected", e.to_string()));
                outcome.rejected.push(e);
                continue;
            }

            self.next_id += 1;
            let id = ItemId(self.next_id);
            let preview = self.previews.allocate(&file);
            let mut item = UploadItem {
                id,
                source: file,
                preview,
                status: UploadStatus::Queued,
                correlation_id: Uuid::new_v4(),
                image_reference: None,
                processing_since: None,
            };
            item.status = UploadStatus::Uploading { progress: 0 };
            info!(
                item = %id,
                file = %item.source.name,
                size = item.source.size,
                correlation_id = %item.correlation_id,
                "upload started"
            );
            self.items.insert(id, item);
            outcome.accepted.push(id);
        }

        outcome
    }

    /// Adds one progress step. Returns whether anything changed.
    pub fn advance_progress(&mut self, id: ItemId) -> bool {
        let step = self.policy.effective_step();
        let Some(item) = self.items.get_mut(&id) else {
            debug!(item = %id, "progress for unknown item dropped");
            return false;
        };
        match item.status {
            UploadStatus::Uploading { progress } if progress < 100 => {
                let next = progress.saturating_add(step).min(100);
                item.status = UploadStatus::Uploading { progress: next };
                true
            }
            _ => false,
        }
    }

    /// Moves a fully transmitted item to `Processing` and hands back the
    /// request for the processing endpoint.
    pub fn on_transmission_complete(
        &mut self,
        id: ItemId,
        image_reference: String,
    ) -> Option<ProcessingRequest> {
        let variation_count = self.policy.variation_count;
        let item = self.items.get_mut(&id)?;
        if item.status != (UploadStatus::Uploading { progress: 100 }) {
            warn!(item = %id, status = item.status.label(), "transmission ack out of order");
            return None;
        }

        item.status = UploadStatus::Processing;
        item.image_reference = Some(image_reference.clone());
        item.processing_since = Some(Instant::now());
        info!(item = %id, "upload finished, processing");

        Some(ProcessingRequest {
            item_id: id,
            image_reference,
            variation_count,
            correlation_id: item.correlation_id,
        })
    }

    pub fn on_transmission_failed(&mut self, id: ItemId, error: TransmissionError) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        if !matches!(item.status, UploadStatus::Uploading { .. }) {
            return false;
        }
        let reason = error.to_string();
        warn!(item = %id, %reason, "upload failed");
        item.status = UploadStatus::Failed {
            reason: reason.clone(),
        };
        let title = format!("Upload failed: {}", item.source.name);
        self.sink.notify(Notification::error(title, reason));
        true
    }

    pub fn on_result(
        &mut self,
        id: ItemId,
        correlation_id: Uuid,
        result: Result<Vec<Variation>, ProcessingError>,
    ) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            debug!(item = %id, "result for unknown item dropped");
            return false;
        };
        if item.status != UploadStatus::Processing {
            debug!(item = %id, status = item.status.label(), "late result dropped");
            return false;
        }
        if item.correlation_id != correlation_id {
            warn!(item = %id, %correlation_id, "result with foreign correlation id dropped");
            return false;
        }

        item.processing_since = None;
        let name = item.source.name.clone();
        let result = result.and_then(|variations| match variations.first() {
            Some(primary) => Ok((primary.predictions(), variations)),
            None => Err(ProcessingError::Empty),
        });

        match result {
            Ok((predictions, variations)) => {
                info!(
                    item = %id,
                    ctr = predictions.ctr,
                    cvr = predictions.cvr,
                    variations = variations.len(),
                    "analysis complete"
                );
                item.status = UploadStatus::Completed {
                    predictions,
                    variations,
                };
                self.sink.notify(Notification::success(
                    "Analysis complete",
                    format!(
                        "{}: predicted CTR {:.2}%, CVR {:.2}%",
                        name, predictions.ctr, predictions.cvr
                    ),
                ));
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(item = %id, %reason, "processing failed");
                item.status = UploadStatus::Failed {
                    reason: reason.clone(),
                };
                self.sink.notify(Notification::error(
                    format!("Processing failed: {}", name),
                    reason,
                ));
            }
        }
        true
    }

    /// Fails every item that has been processing longer than the configured
    /// timeout.
    pub fn enforce_timeouts(&mut self, now: Instant) -> Vec<ItemId> {
        let timeout = self.policy.processing_timeout;
        let expired: Vec<(ItemId, Uuid)> = self
            .items
            .values()
            .filter(|item| item.status == UploadStatus::Processing)
            .filter(|item| {
                item.processing_since
                    .is_some_and(|since| now.saturating_duration_since(since) >= timeout)
            })
            .map(|item| (item.id, item.correlation_id))
            .collect();

        for (id, correlation_id) in &expired {
            self.on_result(*id, *correlation_id, Err(ProcessingError::Timeout));
        }
        expired.into_iter().map(|(id, _)| id).collect()
    }

    /// Erases the item and releases its preview. Unknown ids are a no-op.
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.items.remove(&id) {
            Some(item) => {
                self.previews.release(&item.preview);
                info!(item = %id, status = item.status.label(), "item removed");
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        self.previews.release_all();
        if count > 0 {
            info!(count, "upload list cleared");
        }
        count
    }

    pub fn notify(&self, notification: Notification) {
        self.sink.notify(notification);
    }

    pub fn get(&self, id: ItemId) -> Option<&UploadItem> {
        self.items.get(&id)
    }

    /// Items in intake order.
    pub fn items(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub fn summary(&self) -> UploadSummary {
        let mut summary = UploadSummary {
            total: self.items.len(),
            ..Default::default()
        };
        for item in self.items.values() {
            match item.status {
                UploadStatus::Queued | UploadStatus::Uploading { .. } => summary.uploading += 1,
                UploadStatus::Processing => summary.processing += 1,
                UploadStatus::Completed { .. } => summary.completed += 1,
                UploadStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
