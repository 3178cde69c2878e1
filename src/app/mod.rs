mod state;
mod thumbnails;
mod ui;

use crate::upload::{intake, ItemId, Notification, UploadPipeline};
use eframe::{egui, App};
use rfd::FileDialog;
pub use state::{project_submission, UploadState};
use thumbnails::Thumbnails;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::info;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

pub struct CreativeUploader {
    pipeline: UploadPipeline,
    notifications: Receiver<Notification>,
    state: UploadState,
    thumbnails: Thumbnails,
    endpoint_label: String,
}

impl CreativeUploader {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        pipeline: UploadPipeline,
        notifications: Receiver<Notification>,
        endpoint_label: String,
    ) -> Self {
        info!(endpoint = %endpoint_label, "initializing creative uploader");
        Self {
            pipeline,
            notifications,
            state: UploadState::default(),
            thumbnails: Thumbnails::default(),
            endpoint_label,
        }
    }

    pub fn pick_files(&mut self) {
        let extensions = self.pipeline.controller().policy().accepted_extensions();
        if let Some(paths) = FileDialog::new()
            .add_filter("Images", extensions.as_slice())
            .pick_files()
        {
            self.add_paths(&paths);
        }
    }

    pub fn pick_folder(&mut self) {
        if let Some(folder) = FileDialog::new().pick_folder() {
            info!(folder = %folder.display(), "collecting images from folder");
            let files = intake::collect_images(&folder);
            if !files.is_empty() {
                self.pipeline.notify(Notification::info(
                    "Folder added",
                    format!("Found {} images in {}", files.len(), folder.display()),
                ));
            }
            self.pipeline.submit(files);
        }
    }

    pub fn add_paths(&mut self, paths: &[PathBuf]) {
        let files = intake::handles_from_paths(paths);
        self.pipeline.submit(files);
    }

    pub fn remove_item(&mut self, id: ItemId) {
        self.pipeline.remove(id);
        self.release_thumbnails();
    }

    pub fn submit_project(&mut self) {
        match project_submission(&self.state.project_name, self.pipeline.controller().len()) {
            Ok(created) => {
                info!(
                    project = %self.state.project_name.trim(),
                    creatives = self.pipeline.controller().len(),
                    "project created"
                );
                self.pipeline.notify(created);
                self.state.clear_form();
                self.pipeline.reset();
                self.release_thumbnails();
            }
            Err(rejected) => self.pipeline.notify(rejected),
        }
    }

    pub fn clear_all(&mut self) {
        info!("resetting application state");
        self.pipeline.reset();
        self.state.clear_form();
        self.release_thumbnails();
    }

    fn release_thumbnails(&mut self) {
        self.thumbnails.retain_live(self.pipeline.controller().previews());
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        let applied = self.pipeline.pump();

        let now = Instant::now();
        for notification in self.notifications.try_iter() {
            self.state.push_toast(notification, now);
        }
        self.state.expire_toasts(now);

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_paths(&dropped);
        }

        if applied > 0 || !dropped.is_empty() {
            ctx.request_repaint();
        }
        if self.pipeline.controller().summary().in_flight() > 0 || !self.state.toasts.is_empty() {
            ctx.request_repaint_after(REPAINT_INTERVAL);
        }
    }
}

impl App for CreativeUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
