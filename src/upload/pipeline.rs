use super::controller::{SubmitOutcome, UploadController};
use super::error::{ProcessingError, TransmissionError};
use super::notify::{Notification, NotificationSink};
use super::policy::UploadPolicy;
use super::transport::CreativeTransport;
use super::types::{FileHandle, ItemId, ProcessingRequest, Variation};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

/// Messages from background upload tasks back to the owning thread.
#[derive(Debug)]
pub enum UploadEvent {
    Progress(ItemId),
    Transmitted {
        id: ItemId,
        image_reference: String,
    },
    TransmissionFailed {
        id: ItemId,
        error: TransmissionError,
    },
    Processed {
        id: ItemId,
        correlation_id: Uuid,
        result: Result<Vec<Variation>, ProcessingError>,
    },
}

/// Runs the transport work for each item on a tokio runtime and feeds the
/// outcomes into the controller whenever `pump` is called.
///
/// Only `pump` and the mutating methods here touch the controller, so all
/// transitions happen on the caller's thread.
pub struct UploadPipeline {
    controller: UploadController,
    transport: Arc<dyn CreativeTransport>,
    runtime: Runtime,
    sender: Sender<UploadEvent>,
    receiver: Receiver<UploadEvent>,
    tasks: HashMap<ItemId, AbortHandle>,
}

impl UploadPipeline {
    pub fn new(
        policy: UploadPolicy,
        transport: Arc<dyn CreativeTransport>,
        sink: Box<dyn NotificationSink>,
    ) -> io::Result<Self> {
        let (sender, receiver) = channel();
        Ok(Self {
            controller: UploadController::new(policy, sink),
            transport,
            runtime: Runtime::new()?,
            sender,
            receiver,
            tasks: HashMap::new(),
        })
    }

    pub fn controller(&self) -> &UploadController {
        &self.controller
    }

    pub fn submit(&mut self, files: Vec<FileHandle>) -> SubmitOutcome {
        let outcome = self.controller.submit(files);
        for id in &outcome.accepted {
            if let Some(item) = self.controller.get(*id) {
                let file = item.source.clone();
                self.spawn_transmission(*id, file);
            }
        }
        outcome
    }

    /// Applies every pending event, then fails items stuck in processing.
    /// Returns the number of events applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
            applied += 1;
        }

        for id in self.controller.enforce_timeouts(Instant::now()) {
            self.cancel(id);
        }
        applied
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        self.cancel(id);
        self.controller.remove(id)
    }

    pub fn reset(&mut self) -> usize {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
        self.controller.reset()
    }

    pub fn notify(&self, notification: Notification) {
        self.controller.notify(notification);
    }

    #[cfg(test)]
    pub fn in_flight_tasks(&self) -> usize {
        self.tasks.len()
    }

    fn apply(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::Progress(id) => {
                self.controller.advance_progress(id);
            }
            UploadEvent::Transmitted {
                id,
                image_reference,
            } => match self.controller.on_transmission_complete(id, image_reference) {
                Some(request) => self.spawn_processing(request),
                None => {
                    self.tasks.remove(&id);
                }
            },
            UploadEvent::TransmissionFailed { id, error } => {
                self.controller.on_transmission_failed(id, error);
                self.tasks.remove(&id);
            }
            UploadEvent::Processed {
                id,
                correlation_id,
                result,
            } => {
                self.controller.on_result(id, correlation_id, result);
                self.tasks.remove(&id);
            }
        }
    }

    fn cancel(&mut self, id: ItemId) {
        if let Some(task) = self.tasks.remove(&id) {
            debug!(item = %id, "aborting upload task");
            task.abort();
        }
    }

    fn spawn_transmission(&mut self, id: ItemId, file: FileHandle) {
        let policy = self.controller.policy();
        let ticks = policy.ticks_to_complete();
        let interval = policy.progress_interval;
        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();

        let handle = self
            .runtime
            .spawn(transmit(id, file, transport, ticks, interval, sender));
        self.tasks.insert(id, handle.abort_handle());
    }

    fn spawn_processing(&mut self, request: ProcessingRequest) {
        let id = request.item_id;
        let timeout = self.controller.policy().processing_timeout;
        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();

        let handle = self
            .runtime
            .spawn(process(request, transport, timeout, sender));
        self.tasks.insert(id, handle.abort_handle());
    }
}

/// Uploads one file while emitting progress ticks. All ticks are sent
/// before the completion event so the item is at 100% when it arrives.
async fn transmit(
    id: ItemId,
    file: FileHandle,
    transport: Arc<dyn CreativeTransport>,
    ticks: u32,
    interval: Duration,
    sender: Sender<UploadEvent>,
) {
    let upload = transport.upload(&file);
    tokio::pin!(upload);

    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.tick().await;
    let mut sent = 0;

    let result = loop {
        tokio::select! {
            result = &mut upload => break result,
            _ = ticker.tick(), if sent < ticks => {
                sender.send(UploadEvent::Progress(id)).unwrap_or_default();
                sent += 1;
            }
        }
    };

    let event = match result {
        Ok(image_reference) => {
            for _ in sent..ticks {
                sender.send(UploadEvent::Progress(id)).unwrap_or_default();
            }
            UploadEvent::Transmitted {
                id,
                image_reference,
            }
        }
        Err(error) => UploadEvent::TransmissionFailed { id, error },
    };
    sender.send(event).unwrap_or_default();
}

async fn process(
    request: ProcessingRequest,
    transport: Arc<dyn CreativeTransport>,
    timeout: Duration,
    sender: Sender<UploadEvent>,
) {
    let result = tokio::time::timeout(timeout, transport.generate_variations(&request))
        .await
        .unwrap_or(Err(ProcessingError::Timeout));
    sender
        .send(UploadEvent::Processed {
            id: request.item_id,
            correlation_id: request.correlation_id,
            result,
        })
        .unwrap_or_default();
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
