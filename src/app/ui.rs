use super::state::{get_progress_percentage, get_status_text, Toast, UploadState};
use super::thumbnails::{Thumbnails, THUMBNAIL_EDGE};
use super::CreativeUploader;
use crate::upload::{ItemId, Severity, UploadController, UploadItem, UploadPolicy, UploadStatus};
use crate::utils::file_size::format_size;
use eframe::egui::{self, Align, Color32, Layout, RichText};
use tracing::warn;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

enum UiAction {
    PickFiles,
    PickFolder,
    Remove(ItemId),
    CreateProject,
    ClearAll,
    OpenVariation(String),
}

impl CreativeUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        let controller = self.pipeline.controller();
        let state = &mut self.state;
        let thumbnails = &mut self.thumbnails;
        let endpoint_label = self.endpoint_label.as_str();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("Upload Creatives");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new(
                            "Upload your creative assets for AI-powered analysis and optimization.",
                        )
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                    ui.label(RichText::new(endpoint_label).small().color(MUTED));
                });

                ui.add_space(20.0);
                render_project_details(ui, state);

                ui.add_space(20.0);
                render_intake(ui, controller.policy(), &mut actions);

                if !controller.is_empty() {
                    ui.add_space(20.0);
                    render_progress(ui, controller);
                    ui.add_space(10.0);
                    render_items(ui, controller, state, thumbnails, &mut actions);
                }

                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    let can_submit =
                        !controller.is_empty() && !state.project_name.trim().is_empty();
                    ui.add_enabled_ui(can_submit, |ui| {
                        let button = egui::Button::new("🚀 Create Project")
                            .min_size(egui::vec2(200.0, 40.0));
                        if ui.add(button).clicked() {
                            actions.push(UiAction::CreateProject);
                        }
                    });
                    ui.add_space(5.0);
                    if !controller.is_empty() && ui.button("🗑 Clear All").clicked() {
                        actions.push(UiAction::ClearAll);
                    }
                });
                ui.add_space(20.0);
            });
        });

        render_toasts(ctx, &state.toasts);

        for action in actions {
            self.apply(action);
        }
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::PickFiles => self.pick_files(),
            UiAction::PickFolder => self.pick_folder(),
            UiAction::Remove(id) => self.remove_item(id),
            UiAction::CreateProject => self.submit_project(),
            UiAction::ClearAll => self.clear_all(),
            UiAction::OpenVariation(url) => {
                if let Err(e) = open::that(&url) {
                    warn!(%url, error = %e, "failed to open variation");
                }
            }
        }
    }
}

fn render_project_details(ui: &mut egui::Ui, state: &mut UploadState) {
    ui.group(|ui| {
        ui.label(RichText::new("Project Details").strong());
        ui.add_space(8.0);
        ui.label("Project Name *");
        ui.add(
            egui::TextEdit::singleline(&mut state.project_name)
                .desired_width(ui.available_width())
                .hint_text("e.g., Summer Campaign 2024"),
        );
        ui.add_space(4.0);
        ui.label("Description");
        ui.add(
            egui::TextEdit::multiline(&mut state.description)
                .desired_width(ui.available_width())
                .desired_rows(2)
                .hint_text("Brief description of your campaign..."),
        );
    });
}

fn render_intake(ui: &mut egui::Ui, policy: &UploadPolicy, actions: &mut Vec<UiAction>) {
    ui.group(|ui| {
        ui.label(RichText::new("Upload Images").strong());
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("🖼 Add Images").clicked() {
                actions.push(UiAction::PickFiles);
            }
            if ui.button("📁 Add Folder").clicked() {
                actions.push(UiAction::PickFolder);
            }
        });
        ui.add_space(4.0);
        let formats = policy
            .accepted_media_types
            .iter()
            .map(|media_type| {
                media_type
                    .trim_start_matches("image/")
                    .to_ascii_uppercase()
            })
            .collect::<Vec<_>>()
            .join(", ");
        ui.label(
            RichText::new(format!(
                "Drag & drop images onto the window. Supports: {} (max {} each)",
                formats,
                format_size(policy.max_file_size)
            ))
            .small()
            .color(MUTED),
        );
    });
}

fn render_progress(ui: &mut egui::Ui, controller: &UploadController) {
    ui.group(|ui| {
        let progress = get_progress_percentage(controller.items());
        let progress_bar = egui::ProgressBar::new(progress)
            .show_percentage()
            .animate(controller.summary().in_flight() > 0)
            .fill(ACCENT);
        ui.add(progress_bar);
        ui.label(get_status_text(&controller.summary()));
    });
}

fn render_items(
    ui: &mut egui::Ui,
    controller: &UploadController,
    state: &mut UploadState,
    thumbnails: &mut Thumbnails,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(format!("Uploaded Files ({})", controller.len())).strong());
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            let label = if state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            };
            if ui.button(label).clicked() {
                state.show_details = !state.show_details;
            }
        });
    });
    ui.add_space(4.0);

    for item in controller.items() {
        let thumbnail = thumbnails.texture(ui.ctx(), controller.previews(), &item.preview);
        render_item(ui, item, thumbnail, state.show_details, actions);
        ui.add_space(4.0);
    }
}

fn render_item(
    ui: &mut egui::Ui,
    item: &UploadItem,
    thumbnail: Option<&egui::TextureHandle>,
    show_details: bool,
    actions: &mut Vec<UiAction>,
) {
    ui.group(|ui| {
        ui.horizontal_top(|ui| {
            let edge = THUMBNAIL_EDGE as f32;
            match thumbnail {
                Some(texture) => {
                    ui.image((texture.id(), texture.size_vec2()));
                }
                None => {
                    ui.add_sized([edge, edge], egui::Label::new(RichText::new("🖼").size(28.0)));
                }
            }
            ui.vertical(|ui| render_item_body(ui, item, show_details, actions));
        });
    });
}

fn render_item_body(
    ui: &mut egui::Ui,
    item: &UploadItem,
    show_details: bool,
    actions: &mut Vec<UiAction>,
) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(&item.source.name).strong());
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.small_button("✖").on_hover_text("Remove").clicked() {
                actions.push(UiAction::Remove(item.id));
            }
            let (icon, color) = match item.status {
                UploadStatus::Queued | UploadStatus::Uploading { .. } => ("📤", MUTED),
                UploadStatus::Processing => ("⏳", MUTED),
                UploadStatus::Completed { .. } => ("✅", SUCCESS),
                UploadStatus::Failed { .. } => ("❌", ERROR),
            };
            ui.colored_label(color, format!("{} {}", icon, item.status.label()));
        });
    });

    match &item.status {
        UploadStatus::Queued => {
            ui.label(RichText::new("Waiting...").color(MUTED));
        }
        UploadStatus::Uploading { progress } => {
            let bar = egui::ProgressBar::new(f32::from(*progress) / 100.0)
                .show_percentage()
                .fill(ACCENT);
            ui.add(bar);
        }
        UploadStatus::Processing => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Generating variations...").color(MUTED));
            });
        }
        UploadStatus::Completed {
            predictions,
            variations,
        } => {
            ui.horizontal(|ui| {
                ui.label("Predicted CTR:");
                ui.colored_label(ACCENT, format!("{:.2}%", predictions.ctr));
                ui.add_space(12.0);
                ui.label("Predicted CVR:");
                ui.colored_label(ACCENT, format!("{:.2}%", predictions.cvr));
            });
            ui.horizontal_wrapped(|ui| {
                for (n, variation) in variations.iter().enumerate() {
                    let hover = format!(
                        "CTR {:.2}% | CVR {:.2}%",
                        variation.predicted_ctr, variation.predicted_cvr
                    );
                    if ui
                        .link(format!("Variation {}", n + 1))
                        .on_hover_text(hover)
                        .clicked()
                    {
                        actions.push(UiAction::OpenVariation(variation.variation_url.clone()));
                    }
                }
            });
        }
        UploadStatus::Failed { reason } => {
            ui.colored_label(ERROR, reason);
        }
    }

    ui.label(RichText::new(format_size(item.source.size)).small().color(MUTED));
    if show_details {
        ui.label(
            RichText::new(format!(
                "{} | {} | correlation {}",
                item.id, item.source.media_type, item.correlation_id
            ))
            .small()
            .monospace()
            .color(MUTED),
        );
        if let Some(reference) = item
            .image_reference
            .as_deref()
            .filter(|reference| !reference.starts_with("data:"))
        {
            ui.label(RichText::new(reference).small().monospace().color(MUTED));
        }
    }
}

fn render_toasts(ctx: &egui::Context, toasts: &[Toast]) {
    if toasts.is_empty() {
        return;
    }
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .show(ctx, |ui| {
            for toast in toasts {
                let color = match toast.notification.severity {
                    Severity::Info => MUTED,
                    Severity::Success => SUCCESS,
                    Severity::Error => ERROR,
                };
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(320.0);
                    ui.colored_label(color, RichText::new(&toast.notification.title).strong());
                    ui.label(&toast.notification.message);
                });
                ui.add_space(6.0);
            }
        });
}
