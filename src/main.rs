mod app;
mod config;
mod upload;
mod utils;

use app::CreativeUploader;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload::{ChannelSink, CreativeTransport, SimulatedTransport, UploadPipeline, WebhookTransport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load_settings()?;
    let (transport, endpoint_label) = match settings.webhook_url() {
        Some(url) => {
            info!(%url, "using workflow webhook");
            let label = format!("Endpoint: {}", url);
            let transport: Arc<dyn CreativeTransport> = Arc::new(WebhookTransport::new(
                url,
                settings.asset_upload_url.clone(),
            ));
            (transport, label)
        }
        None => {
            info!("no webhook configured, using simulated endpoint");
            let transport: Arc<dyn CreativeTransport> = Arc::new(SimulatedTransport::new(
                Duration::from_millis(settings.simulated_upload_ms),
                Duration::from_millis(settings.simulated_processing_ms),
            ));
            (
                transport,
                "Endpoint: simulated (set N8N_URL to use the workflow)".to_string(),
            )
        }
    };

    let (sender, notifications) = channel();
    let pipeline = UploadPipeline::new(
        settings.policy(),
        transport,
        Box::new(ChannelSink::new(sender)),
    )?;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_min_inner_size([420.0, 520.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Creative Uploader",
        options,
        Box::new(move |cc| {
            Box::new(CreativeUploader::new(
                cc,
                pipeline,
                notifications,
                endpoint_label,
            ))
        }),
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}
