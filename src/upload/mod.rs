mod controller;
mod error;
pub mod intake;
mod notify;
mod pipeline;
mod policy;
mod preview;
mod transport;
mod types;

pub use controller::{SubmitOutcome, UploadController};
pub use error::{IntakeError, ProcessingError, TransmissionError, ValidationError};
pub use notify::{ChannelSink, Notification, NotificationSink, Severity};
pub use pipeline::UploadPipeline;
pub use preview::PreviewStore;
pub use policy::UploadPolicy;
pub use transport::{CreativeTransport, SimulatedTransport, WebhookTransport};
pub use types::{
    FileHandle, ItemId, Predictions, PreviewRef, ProcessingRequest, UploadItem, UploadStatus,
    UploadSummary, Variation,
};
