use super::error::{ProcessingError, TransmissionError};
use super::types::{FileHandle, ProcessingRequest, Variation};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// The remote side of an upload: somewhere to put the bytes, and the
/// workflow that turns an image into scored variations.
#[async_trait]
pub trait CreativeTransport: Send + Sync {
    /// Transmits the file and returns a reference the processing endpoint
    /// can fetch the image from.
    async fn upload(&self, file: &FileHandle) -> Result<String, TransmissionError>;

    async fn generate_variations(
        &self,
        request: &ProcessingRequest,
    ) -> Result<Vec<Variation>, ProcessingError>;
}

#[derive(Deserialize)]
struct AssetResponse {
    url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariationsResponse {
    List(Vec<Variation>),
    Wrapped { variations: Vec<Variation> },
}

/// Talks to the workflow webhook over HTTP.
#[derive(Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    webhook_url: String,
    asset_upload_url: Option<String>,
}

impl WebhookTransport {
    pub fn new(webhook_url: String, asset_upload_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            asset_upload_url,
        }
    }
}

/// Body the workflow expects; the correlation id travels as `projectId`.
pub fn variation_payload(request: &ProcessingRequest) -> Value {
    json!({
        "body": {
            "imageUrl": request.image_reference,
            "variations": request.variation_count,
            "projectId": request.correlation_id.to_string(),
        }
    })
}

pub fn parse_variations(body: &str) -> Result<Vec<Variation>, ProcessingError> {
    let response: VariationsResponse =
        serde_json::from_str(body).map_err(|e| ProcessingError::Decode(e.to_string()))?;
    let variations = match response {
        VariationsResponse::List(variations) => variations,
        VariationsResponse::Wrapped { variations } => variations,
    };
    if variations.is_empty() {
        return Err(ProcessingError::Empty);
    }
    Ok(variations)
}

pub fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

#[async_trait]
impl CreativeTransport for WebhookTransport {
    async fn upload(&self, file: &FileHandle) -> Result<String, TransmissionError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| TransmissionError::Read(e.to_string()))?;

        let Some(url) = &self.asset_upload_url else {
            return Ok(data_url(&file.media_type, &bytes));
        };

        debug!(file = %file.name, %url, "uploading asset");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, file.media_type.as_str())
            .header("x-file-name", file.name.as_str())
            .body(bytes)
            .send()
            .await
            .map_err(|e| TransmissionError::Request(e.to_string()))?;

        match response.status().as_u16() {
            200 | 201 => response
                .json::<AssetResponse>()
                .await
                .map(|asset| asset.url)
                .map_err(|e| TransmissionError::Decode(e.to_string())),
            status_code => Err(TransmissionError::Status(status_code)),
        }
    }

    async fn generate_variations(
        &self,
        request: &ProcessingRequest,
    ) -> Result<Vec<Variation>, ProcessingError> {
        debug!(
            item = %request.item_id,
            correlation_id = %request.correlation_id,
            "requesting variations"
        );
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&variation_payload(request))
            .send()
            .await
            .map_err(|e| ProcessingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessingError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        parse_variations(&body)
    }
}

/// Offline stand-in for the webhook: waits a fixed time per step and makes
/// up predictions (CTR 1-6%, CVR 0.5-3.5%).
pub struct SimulatedTransport {
    upload_delay: Duration,
    processing_delay: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedTransport {
    pub fn new(upload_delay: Duration, processing_delay: Duration) -> Self {
        Self {
            upload_delay,
            processing_delay,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn fabricate(&self, request: &ProcessingRequest) -> Vec<Variation> {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        (1..=request.variation_count.max(1))
            .map(|n| Variation {
                variation_url: format!("simulated://{}/variation-{}", request.correlation_id, n),
                predicted_ctr: rng.random_range(1.0..6.0),
                predicted_cvr: rng.random_range(0.5..3.5),
            })
            .collect()
    }
}

#[async_trait]
impl CreativeTransport for SimulatedTransport {
    async fn upload(&self, file: &FileHandle) -> Result<String, TransmissionError> {
        tokio::time::sleep(self.upload_delay).await;
        Ok(format!("file://{}", file.path.display()))
    }

    async fn generate_variations(
        &self,
        request: &ProcessingRequest,
    ) -> Result<Vec<Variation>, ProcessingError> {
        tokio::time::sleep(self.processing_delay).await;
        Ok(self.fabricate(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::ItemId;
    use std::io::Write;
    use uuid::Uuid;

    fn request(count: u32) -> ProcessingRequest {
        ProcessingRequest {
            item_id: ItemId(7),
            image_reference: "https://assets.example.com/a.png".to_string(),
            variation_count: count,
            correlation_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn payload_matches_workflow_shape() {
        let request = request(4);
        let payload = variation_payload(&request);
        assert_eq!(payload["body"]["imageUrl"], "https://assets.example.com/a.png");
        assert_eq!(payload["body"]["variations"], 4);
        assert_eq!(
            payload["body"]["projectId"],
            request.correlation_id.to_string()
        );
    }

    #[test]
    fn parses_bare_array() {
        let body = r#"[{"variationUrl":"https://x/1.png","predictedCtr":3.1,"predictedCvr":1.2}]"#;
        let variations = parse_variations(body).unwrap();
        assert_eq!(variations.len(), 1);
        assert_eq!(variations[0].predicted_ctr, 3.1);
        assert_eq!(variations[0].predicted_cvr, 1.2);
    }

    #[test]
    fn parses_wrapped_object() {
        let body = r#"{"variations":[
            {"variationUrl":"https://x/1.png","predictedCtr":2.0,"predictedCvr":1.0},
            {"variationUrl":"https://x/2.png","predictedCtr":4.0,"predictedCvr":2.0}
        ]}"#;
        let variations = parse_variations(body).unwrap();
        assert_eq!(variations[1].variation_url, "https://x/2.png");
    }

    #[test]
    fn empty_and_malformed_bodies_are_errors() {
        assert_eq!(parse_variations("[]"), Err(ProcessingError::Empty));
        assert!(matches!(
            parse_variations(r#"{"status":"queued"}"#),
            Err(ProcessingError::Decode(_))
        ));
    }

    #[test]
    fn data_url_encodes_bytes() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn upload_without_asset_store_inlines_the_file() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"abc").unwrap();
        let handle = FileHandle {
            path: file.path().to_path_buf(),
            name: "a.png".to_string(),
            size: 3,
            media_type: "image/png".to_string(),
        };

        let transport = WebhookTransport::new("http://127.0.0.1:9/webhook/x".to_string(), None);
        assert_eq!(
            transport.upload(&handle).await.unwrap(),
            "data:image/png;base64,YWJj"
        );
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_a_read_error() {
        let handle = FileHandle {
            path: "/definitely/not/here.png".into(),
            name: "here.png".to_string(),
            size: 0,
            media_type: "image/png".to_string(),
        };
        let transport = WebhookTransport::new("http://127.0.0.1:9/webhook/x".to_string(), None);
        assert!(matches!(
            transport.upload(&handle).await,
            Err(TransmissionError::Read(_))
        ));
    }

    #[tokio::test]
    async fn simulated_predictions_stay_in_range() {
        let transport =
            SimulatedTransport::new(Duration::ZERO, Duration::ZERO).with_seed(42);
        let variations = transport.generate_variations(&request(5)).await.unwrap();
        assert_eq!(variations.len(), 5);
        for variation in variations {
            assert!((1.0..6.0).contains(&variation.predicted_ctr));
            assert!((0.5..3.5).contains(&variation.predicted_cvr));
        }
    }

    #[tokio::test]
    async fn simulated_transport_always_returns_at_least_one_variation() {
        let transport = SimulatedTransport::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(
            transport.generate_variations(&request(0)).await.unwrap().len(),
            1
        );
    }
}
