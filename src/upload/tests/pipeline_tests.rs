use super::*;
use crate::upload::notify::ChannelSink;
use crate::upload::types::UploadStatus;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

/// What the fake endpoint does for one file, keyed by file name.
#[derive(Clone)]
struct Script {
    upload: Result<(), TransmissionError>,
    processing_delay: Duration,
    result: Result<Vec<Variation>, ProcessingError>,
}

impl Script {
    fn ok(ctr: f64, cvr: f64) -> Self {
        Self {
            upload: Ok(()),
            processing_delay: Duration::ZERO,
            result: Ok(vec![Variation {
                variation_url: "https://cdn.example.com/v.png".to_string(),
                predicted_ctr: ctr,
                predicted_cvr: cvr,
            }]),
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }
}

struct ScriptedTransport {
    scripts: HashMap<String, Script>,
    completed_calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(scripts: Vec<(&str, Script)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .into_iter()
                .map(|(name, script)| (name.to_string(), script))
                .collect(),
            completed_calls: Mutex::new(Vec::new()),
        })
    }

    fn script(&self, name: &str) -> Script {
        self.scripts
            .get(name)
            .cloned()
            .expect("every test file has a script")
    }
}

#[async_trait]
impl CreativeTransport for ScriptedTransport {
    async fn upload(&self, file: &FileHandle) -> Result<String, TransmissionError> {
        self.script(&file.name)
            .upload
            .map(|_| format!("mem://{}", file.name))
    }

    async fn generate_variations(
        &self,
        request: &ProcessingRequest,
    ) -> Result<Vec<Variation>, ProcessingError> {
        let name = request
            .image_reference
            .trim_start_matches("mem://")
            .to_string();
        let script = self.script(&name);
        tokio::time::sleep(script.processing_delay).await;
        self.completed_calls.lock().unwrap().push(name);
        script.result
    }
}

fn fast_policy() -> UploadPolicy {
    UploadPolicy {
        progress_step: 25,
        progress_interval: Duration::from_millis(1),
        processing_timeout: Duration::from_secs(5),
        ..UploadPolicy::default()
    }
}

fn pipeline(
    policy: UploadPolicy,
    transport: Arc<ScriptedTransport>,
) -> (UploadPipeline, Receiver<Notification>) {
    let (sender, receiver) = channel();
    let pipeline = UploadPipeline::new(policy, transport, Box::new(ChannelSink::new(sender)))
        .expect("runtime");
    (pipeline, receiver)
}

fn png(name: &str) -> FileHandle {
    FileHandle {
        path: PathBuf::from(format!("/creatives/{name}")),
        name: name.to_string(),
        size: 2 * 1024 * 1024,
        media_type: "image/png".to_string(),
    }
}

/// Pumps until `done` holds, checking progress never goes backwards.
fn pump_until(pipeline: &mut UploadPipeline, done: impl Fn(&UploadController) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut last_progress: HashMap<ItemId, u8> = HashMap::new();
    while !done(pipeline.controller()) {
        assert!(Instant::now() < deadline, "pipeline did not settle in time");
        pipeline.pump();
        for item in pipeline.controller().items() {
            let previous = last_progress.insert(item.id, item.progress()).unwrap_or(0);
            assert!(item.progress() >= previous, "progress went backwards");
            assert_eq!(
                item.predictions().is_some(),
                matches!(item.status, UploadStatus::Completed { .. })
            );
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn all_terminal(controller: &UploadController) -> bool {
    controller.items().all(|item| item.status.is_terminal())
}

#[test]
fn single_png_completes_with_endpoint_predictions() {
    let transport = ScriptedTransport::new(vec![("summer.png", Script::ok(3.1, 1.2))]);
    let (mut pipeline, _notifications) = pipeline(fast_policy(), transport);

    let outcome = pipeline.submit(vec![png("summer.png")]);
    let id = outcome.accepted[0];
    assert_eq!(
        pipeline.controller().get(id).unwrap().status,
        UploadStatus::Uploading { progress: 0 }
    );

    pump_until(&mut pipeline, all_terminal);
    let predictions = pipeline.controller().get(id).unwrap().predictions().unwrap();
    assert_eq!(predictions.ctr, 3.1);
    assert_eq!(predictions.cvr, 1.2);
    assert_eq!(pipeline.in_flight_tasks(), 0);
}

#[test]
fn interleaved_completion_keeps_predictions_apart() {
    let transport = ScriptedTransport::new(vec![
        (
            "first.png",
            Script::ok(1.5, 0.7).delayed(Duration::from_millis(300)),
        ),
        ("second.png", Script::ok(4.5, 2.5)),
    ]);
    let (mut pipeline, _notifications) = pipeline(fast_policy(), Arc::clone(&transport));

    let ids = pipeline
        .submit(vec![png("first.png"), png("second.png")])
        .accepted;
    pump_until(&mut pipeline, all_terminal);

    assert_eq!(
        *transport.completed_calls.lock().unwrap(),
        vec!["second.png".to_string(), "first.png".to_string()]
    );
    let first = pipeline.controller().get(ids[0]).unwrap().predictions().unwrap();
    let second = pipeline.controller().get(ids[1]).unwrap().predictions().unwrap();
    assert_eq!((first.ctr, first.cvr), (1.5, 0.7));
    assert_eq!((second.ctr, second.cvr), (4.5, 2.5));
}

#[test]
fn transmission_failure_does_not_touch_siblings() {
    let broken = Script {
        upload: Err(TransmissionError::Status(503)),
        ..Script::ok(0.0, 0.0)
    };
    let transport = ScriptedTransport::new(vec![
        ("broken.png", broken),
        ("fine.png", Script::ok(2.0, 1.0)),
    ]);
    let (mut pipeline, _notifications) = pipeline(fast_policy(), transport);

    let ids = pipeline
        .submit(vec![png("broken.png"), png("fine.png")])
        .accepted;
    pump_until(&mut pipeline, all_terminal);

    assert_eq!(
        pipeline.controller().get(ids[0]).unwrap().status,
        UploadStatus::Failed {
            reason: "upload failed with status: 503".to_string()
        }
    );
    assert!(pipeline.controller().get(ids[1]).unwrap().predictions().is_some());
}

#[test]
fn processing_timeout_fails_the_item() {
    let policy = UploadPolicy {
        processing_timeout: Duration::from_millis(50),
        ..fast_policy()
    };
    let transport = ScriptedTransport::new(vec![(
        "slow.png",
        Script::ok(3.0, 1.0).delayed(Duration::from_secs(30)),
    )]);
    let (mut pipeline, _notifications) = pipeline(policy, Arc::clone(&transport));

    let id = pipeline.submit(vec![png("slow.png")]).accepted[0];
    pump_until(&mut pipeline, all_terminal);

    assert_eq!(
        pipeline.controller().get(id).unwrap().status,
        UploadStatus::Failed {
            reason: "timeout".to_string()
        }
    );
    std::thread::sleep(Duration::from_millis(20));
    pipeline.pump();
    assert!(pipeline.controller().get(id).unwrap().predictions().is_none());
    assert!(transport.completed_calls.lock().unwrap().is_empty());
}

#[test]
fn removing_mid_flight_drops_later_events() {
    let transport = ScriptedTransport::new(vec![(
        "gone.png",
        Script::ok(3.0, 1.0).delayed(Duration::from_millis(100)),
    )]);
    let (mut pipeline, _notifications) = pipeline(fast_policy(), Arc::clone(&transport));

    let id = pipeline.submit(vec![png("gone.png")]).accepted[0];
    pump_until(&mut pipeline, |controller| {
        controller.get(id).map(|item| &item.status) == Some(&UploadStatus::Processing)
    });

    assert!(pipeline.remove(id));
    assert!(!pipeline.remove(id));
    assert_eq!(pipeline.in_flight_tasks(), 0);

    std::thread::sleep(Duration::from_millis(200));
    pipeline.pump();
    assert!(pipeline.controller().get(id).is_none());
    assert!(pipeline.controller().is_empty());
    assert_eq!(pipeline.controller().previews().live(), 0);
    assert!(transport.completed_calls.lock().unwrap().is_empty());
}

#[test]
fn reset_cancels_everything() {
    let transport = ScriptedTransport::new(vec![
        ("a.png", Script::ok(1.0, 1.0).delayed(Duration::from_secs(30))),
        ("b.png", Script::ok(1.0, 1.0).delayed(Duration::from_secs(30))),
    ]);
    let (mut pipeline, _notifications) = pipeline(fast_policy(), transport);

    pipeline.submit(vec![png("a.png"), png("b.png")]);
    assert_eq!(pipeline.reset(), 2);
    assert_eq!(pipeline.in_flight_tasks(), 0);

    std::thread::sleep(Duration::from_millis(50));
    pipeline.pump();
    assert!(pipeline.controller().is_empty());
}

#[test]
fn rejected_files_never_start_a_task() {
    let transport = ScriptedTransport::new(Vec::new());
    let (mut pipeline, notifications) = pipeline(fast_policy(), transport);

    let mut pdf = png("brief.pdf");
    pdf.media_type = "application/pdf".to_string();
    let outcome = pipeline.submit(vec![pdf]);

    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(pipeline.in_flight_tasks(), 0);
    assert_eq!(notifications.try_iter().count(), 1);
}
