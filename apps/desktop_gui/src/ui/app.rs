use std::path::PathBuf;

use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use serde::{Deserialize, Serialize};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_worker_failure, UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use scan_core::ScanPreview;
use shared::{
    domain::{ScanResult, SelectedScan, WorkflowPhase},
    error::ScanError,
    report::AnalysisReport,
};

pub const SETTINGS_STORAGE_KEY: &str = "neurascan.settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppView {
    Home,
    Scan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultsTab {
    Results,
    Visualization,
    Details,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Workflow => "Workflow",
        UiErrorCategory::Preview => "Preview",
        UiErrorCategory::Internal => "Internal",
    }
}

fn lighten_color(c: egui::Color32, t: f32) -> egui::Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |channel: u8| -> u8 {
        let channel = channel as f32;
        (channel + (255.0 - channel) * t).round().clamp(0.0, 255.0) as u8
    };
    egui::Color32::from_rgba_unmultiplied(mix(c.r()), mix(c.g()), mix(c.b()), c.a())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThemePreset {
    Dark,
    Light,
}

impl ThemePreset {
    fn label(self) -> &'static str {
        match self {
            ThemePreset::Dark => "Dark",
            ThemePreset::Light => "Light",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ThemeSettings {
    preset: ThemePreset,
    accent_color: egui::Color32,
    text_scale: f32,
}

impl ThemeSettings {
    fn neura_default() -> Self {
        Self {
            preset: ThemePreset::Dark,
            accent_color: egui::Color32::from_rgb(59, 130, 246),
            text_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PersistedThemePreset {
    Dark,
    Light,
}

impl From<ThemePreset> for PersistedThemePreset {
    fn from(preset: ThemePreset) -> Self {
        match preset {
            ThemePreset::Dark => PersistedThemePreset::Dark,
            ThemePreset::Light => PersistedThemePreset::Light,
        }
    }
}

impl From<PersistedThemePreset> for ThemePreset {
    fn from(preset: PersistedThemePreset) -> Self {
        match preset {
            PersistedThemePreset::Dark => ThemePreset::Dark,
            PersistedThemePreset::Light => ThemePreset::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSettings {
    theme_preset: PersistedThemePreset,
    accent_color: [u8; 4],
    text_scale: f32,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self::from_runtime(ThemeSettings::neura_default())
    }
}

impl PersistedSettings {
    fn into_runtime(self) -> ThemeSettings {
        ThemeSettings {
            preset: self.theme_preset.into(),
            accent_color: egui::Color32::from_rgba_unmultiplied(
                self.accent_color[0],
                self.accent_color[1],
                self.accent_color[2],
                self.accent_color[3],
            ),
            text_scale: self.text_scale.clamp(0.8, 1.4),
        }
    }

    fn from_runtime(theme: ThemeSettings) -> Self {
        Self {
            theme_preset: theme.preset.into(),
            accent_color: [
                theme.accent_color.r(),
                theme.accent_color.g(),
                theme.accent_color.b(),
                theme.accent_color.a(),
            ],
            text_scale: theme.text_scale,
        }
    }
}

fn file_size_megabytes(size_bytes: u64) -> String {
    format!("{:.2} MB", size_bytes as f64 / (1024.0 * 1024.0))
}

fn fitted_image_size(width: f32, height: f32, max_width: f32, max_height: f32) -> egui::Vec2 {
    let scale = (max_width / width).min(max_height / height).min(1.0);
    egui::vec2(width * scale, height * scale)
}

// Green -> yellow -> red ramp for the placeholder heatmap.
fn heat_color(heat: f32) -> [u8; 3] {
    let heat = heat.clamp(0.0, 1.0);
    if heat < 0.5 {
        let t = heat / 0.5;
        [(t * 255.0) as u8, 200, 40]
    } else {
        let t = (heat - 0.5) / 0.5;
        [255, (200.0 * (1.0 - t)) as u8, 30]
    }
}

fn render_heatmap_placeholder(size: usize, has_tumor: bool) -> egui::ColorImage {
    let center = size as f32 / 2.0;
    // Hotspot sits upper right to match the reported frontal lobe, right
    // hemisphere location; clear scans get a flat cool field instead.
    let (hot_x, hot_y) = if has_tumor {
        (center * 1.35, center * 0.7)
    } else {
        (center, center)
    };
    let max_dist = center * 1.2;

    let mut rgba = Vec::with_capacity(size * size * 4);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - hot_x;
            let dy = y as f32 - hot_y;
            let dist = (dx * dx + dy * dy).sqrt();
            let heat = (1.0 - dist / max_dist).clamp(0.0, 1.0);
            let heat = if has_tumor { heat.powf(1.5) } else { heat * 0.35 };
            let [r, g, b] = heat_color(heat);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    egui::ColorImage::from_rgba_unmultiplied([size, size], &rgba)
}

fn detail_row(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(label).weak());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(egui::RichText::new(value).strong());
        });
    });
}

fn info_box(ui: &mut egui::Ui, title: &str, body: &str) {
    egui::Frame::NONE
        .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(12, 10))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(title).strong());
            ui.add_space(4.0);
            ui.label(egui::RichText::new(body).weak().small());
        });
}

pub struct NeuraScanApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    view: AppView,
    results_tab: ResultsTab,

    // Mirror of the workflow state, rebuilt from worker events.
    phase: WorkflowPhase,
    file: Option<SelectedScan>,
    preview: Option<ScanPreview>,
    progress: u8,
    result: Option<ScanResult>,
    report: Option<AnalysisReport>,
    last_error: Option<ScanError>,

    // Set while a selection is resolving; the workflow stays Idle until
    // the preview lands, so the pending state is view-local.
    selecting_path: Option<PathBuf>,

    preview_texture: Option<TextureHandle>,
    heatmap_texture: Option<TextureHandle>,

    worker_ready: bool,
    status: String,
    status_banner: Option<StatusBanner>,

    theme: ThemeSettings,
    applied_theme: Option<ThemeSettings>,
    settings_open: bool,

    tick: u64,
}

impl NeuraScanApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        persisted_settings: Option<PersistedSettings>,
    ) -> Self {
        let theme = persisted_settings.unwrap_or_default().into_runtime();
        Self {
            cmd_tx,
            ui_rx,
            view: AppView::Home,
            results_tab: ResultsTab::Results,
            phase: WorkflowPhase::Idle,
            file: None,
            preview: None,
            progress: 0,
            result: None,
            report: None,
            last_error: None,
            selecting_path: None,
            preview_texture: None,
            heatmap_texture: None,
            worker_ready: false,
            status: "Starting scan worker...".to_string(),
            status_banner: None,
            theme,
            applied_theme: None,
            settings_open: false,
            tick: 0,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::WorkerReady => {
                    self.worker_ready = true;
                    self.status = "Ready".to_string();
                }
                UiEvent::Info(text) => {
                    self.status = text;
                }
                UiEvent::PhaseChanged(phase) => self.apply_phase(phase),
                UiEvent::UploadProgressed(progress) => {
                    self.progress = progress;
                }
                UiEvent::PreviewLoaded { file, preview } => {
                    self.file = Some(file);
                    self.preview = Some(preview);
                    self.preview_texture = None;
                    self.selecting_path = None;
                }
                UiEvent::ScanCompleted { result } => {
                    self.report = Some(AnalysisReport::from_result(&result));
                    self.result = Some(result);
                }
                UiEvent::ScanFailed { error } => {
                    self.selecting_path = None;
                    self.last_error = Some(error);
                }
                UiEvent::Error(error) => {
                    let message = if error.context() == UiErrorContext::WorkerStartup {
                        classify_worker_failure(error.message())
                    } else {
                        format!("{}: {}", err_label(error.category()), error.message())
                    };
                    tracing::warn!("ui: surfacing worker error: {message}");
                    self.status_banner = Some(StatusBanner {
                        severity: StatusBannerSeverity::Error,
                        message,
                    });
                }
            }
        }
    }

    fn apply_phase(&mut self, phase: WorkflowPhase) {
        if phase == WorkflowPhase::Idle {
            self.file = None;
            self.preview = None;
            self.preview_texture = None;
            self.heatmap_texture = None;
            self.progress = 0;
            self.result = None;
            self.report = None;
            self.last_error = None;
        }
        if phase == WorkflowPhase::ResultsReady {
            self.results_tab = ResultsTab::Results;
        }
        self.phase = phase;
        self.status = match phase {
            WorkflowPhase::Idle => {
                if self.worker_ready {
                    "Ready".to_string()
                } else {
                    self.status.clone()
                }
            }
            WorkflowPhase::PreviewReady => "Preview ready".to_string(),
            WorkflowPhase::Uploading => "Uploading scan...".to_string(),
            WorkflowPhase::Processing => "Analyzing scan...".to_string(),
            WorkflowPhase::ResultsReady => "Analysis complete".to_string(),
            WorkflowPhase::Failed => "Scan failed".to_string(),
        };
    }

    fn dispatch_select_file(&mut self, path: PathBuf) {
        self.status_banner = None;
        self.last_error = None;
        self.selecting_path = Some(path.clone());
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SelectFile { path },
            &mut self.status,
        );
    }

    fn dispatch_start_upload(&mut self) {
        dispatch_backend_command(&self.cmd_tx, BackendCommand::StartUpload, &mut self.status);
    }

    fn dispatch_reset(&mut self) {
        self.selecting_path = None;
        self.status_banner = None;
        dispatch_backend_command(&self.cmd_tx, BackendCommand::Reset, &mut self.status);
    }

    fn pick_scan_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("MRI scans", &["png", "jpg", "jpeg", "dcm"])
            .add_filter("All files", &["*"])
            .pick_file()
        {
            self.dispatch_select_file(path);
        }
    }

    fn ensure_preview_texture(&mut self, ctx: &egui::Context) -> Option<TextureHandle> {
        if self.preview_texture.is_none() {
            let preview = self.preview.as_ref()?;
            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                [preview.width as usize, preview.height as usize],
                &preview.rgba,
            );
            self.preview_texture =
                Some(ctx.load_texture("scan-preview", color_image, egui::TextureOptions::LINEAR));
        }
        self.preview_texture.clone()
    }

    fn ensure_heatmap_texture(&mut self, ctx: &egui::Context) -> Option<TextureHandle> {
        if self.heatmap_texture.is_none() {
            let has_tumor = self.result.as_ref()?.has_tumor;
            let color_image = render_heatmap_placeholder(128, has_tumor);
            self.heatmap_texture =
                Some(ctx.load_texture("scan-heatmap", color_image, egui::TextureOptions::LINEAR));
        }
        self.heatmap_texture.clone()
    }

    fn apply_theme_if_needed(&mut self, ctx: &egui::Context) {
        if self.applied_theme == Some(self.theme) {
            return;
        }
        let mut visuals = match self.theme.preset {
            ThemePreset::Dark => egui::Visuals::dark(),
            ThemePreset::Light => egui::Visuals::light(),
        };
        visuals.selection.bg_fill = self.theme.accent_color;
        visuals.hyperlink_color = self.theme.accent_color;
        ctx.set_visuals(visuals);
        self.applied_theme = Some(self.theme);
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(8.0);
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        let scale = self.theme.text_scale;
        egui::TopBottomPanel::top("top_nav").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("\u{1F9E0}").size(20.0));
                ui.label(
                    egui::RichText::new("NeuraScan")
                        .strong()
                        .size(18.0 * scale),
                );
                ui.separator();
                if ui
                    .selectable_label(self.view == AppView::Home, "Home")
                    .clicked()
                {
                    self.view = AppView::Home;
                }
                if ui
                    .selectable_label(self.view == AppView::Scan, "Scan")
                    .clicked()
                {
                    self.view = AppView::Scan;
                }
                ui.add_enabled(false, egui::Button::new("History"))
                    .on_disabled_hover_text("Scan history is not available in this demo");
                ui.add_enabled(false, egui::Button::new("About"))
                    .on_disabled_hover_text("Not available in this demo");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("\u{2699}").on_hover_text("Appearance").clicked() {
                        self.settings_open = !self.settings_open;
                    }
                    let start = egui::Button::new(
                        egui::RichText::new("Start Scan")
                            .strong()
                            .color(egui::Color32::WHITE),
                    )
                    .fill(self.theme.accent_color);
                    if ui.add(start).clicked() {
                        self.view = AppView::Scan;
                    }
                });
            });
            ui.add_space(4.0);
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.status).weak());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.worker_ready {
                        ui.label(egui::RichText::new("worker online").weak().small());
                        ui.label(
                            egui::RichText::new("\u{25CF}")
                                .color(egui::Color32::from_rgb(70, 180, 90)),
                        );
                    } else {
                        ui.label(egui::RichText::new("worker starting").weak().small());
                        let dot = if (self.tick / 5) % 2 == 0 {
                            "\u{25CB}"
                        } else {
                            "\u{25CF}"
                        };
                        ui.label(egui::RichText::new(dot).weak());
                    }
                });
            });
        });
    }

    fn show_home_view(&mut self, ctx: &egui::Context) {
        let scale = self.theme.text_scale;
        let accent = self.theme.accent_color;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        let width = ui.available_width().clamp(520.0, 880.0);
                        ui.set_width(width);
                        ui.add_space(24.0);

                        // Hero
                        egui::Frame::NONE
                            .fill(lighten_color(ui.visuals().panel_fill, 0.02))
                            .corner_radius(14.0)
                            .stroke(egui::Stroke::new(
                                1.0,
                                ui.visuals().widgets.noninteractive.bg_stroke.color,
                            ))
                            .inner_margin(egui::Margin::symmetric(20, 18))
                            .show(ui, |ui| {
                                ui.label(
                                    egui::RichText::new("Advanced Brain Tumor Detection with AI")
                                        .strong()
                                        .size(30.0 * scale),
                                );
                                ui.add_space(6.0);
                                ui.label(
                                    egui::RichText::new(
                                        "Our cutting-edge AI technology helps medical professionals \
                                         detect and analyze brain tumors with unprecedented accuracy.",
                                    )
                                    .weak()
                                    .size(15.0 * scale),
                                );
                                ui.add_space(12.0);
                                ui.horizontal(|ui| {
                                    let start = egui::Button::new(
                                        egui::RichText::new("Start Scanning")
                                            .strong()
                                            .color(egui::Color32::WHITE),
                                    )
                                    .fill(accent)
                                    .min_size(egui::vec2(140.0, 36.0));
                                    if ui.add(start).clicked() {
                                        self.view = AppView::Scan;
                                    }
                                    ui.add_enabled(
                                        false,
                                        egui::Button::new("Learn More")
                                            .min_size(egui::vec2(120.0, 36.0)),
                                    )
                                    .on_disabled_hover_text("Not available in this demo");
                                });
                                ui.add_space(10.0);
                                ui.horizontal(|ui| {
                                    for badge in ["97% Accuracy", "HIPAA Compliant", "FDA Approved"]
                                    {
                                        ui.label(
                                            egui::RichText::new("\u{25CF}")
                                                .color(egui::Color32::from_rgb(70, 180, 90))
                                                .small(),
                                        );
                                        ui.label(egui::RichText::new(badge).small());
                                        ui.add_space(6.0);
                                    }
                                });
                            });

                        ui.add_space(24.0);
                        ui.label(
                            egui::RichText::new("Advanced Brain Tumor Detection")
                                .strong()
                                .size(24.0 * scale),
                        );
                        ui.add_space(4.0);
                        ui.label(
                            egui::RichText::new(
                                "Our AI-powered platform provides accurate and rapid detection of \
                                 brain tumors from MRI scans, helping medical professionals make \
                                 informed decisions.",
                            )
                            .weak(),
                        );
                        ui.add_space(14.0);

                        ui.columns(3, |columns| {
                            feature_card(
                                &mut columns[0],
                                "\u{2B06}",
                                "Easy Upload",
                                "Simply upload MRI scans in common formats including DICOM, JPG, and PNG.",
                                scale,
                            );
                            feature_card(
                                &mut columns[1],
                                "\u{1F9E0}",
                                "AI Analysis",
                                "Our advanced neural network analyzes the scan with 97% accuracy.",
                                scale,
                            );
                            feature_card(
                                &mut columns[2],
                                "\u{1F4C4}",
                                "Detailed Reports",
                                "Receive comprehensive reports with visualization of detected anomalies.",
                                scale,
                            );
                        });

                        ui.add_space(24.0);
                        egui::Frame::NONE
                            .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
                            .corner_radius(12.0)
                            .inner_margin(egui::Margin::symmetric(18, 14))
                            .show(ui, |ui| {
                                ui.label(
                                    egui::RichText::new("How It Works")
                                        .strong()
                                        .size(22.0 * scale),
                                );
                                ui.add_space(4.0);
                                ui.label(
                                    egui::RichText::new(
                                        "Our platform uses a state-of-the-art convolutional neural \
                                         network trained on thousands of MRI scans.",
                                    )
                                    .weak(),
                                );
                                ui.add_space(8.0);
                                for (index, step) in [
                                    "Upload your MRI scan",
                                    "AI processes and analyzes the image",
                                    "Review detailed results and visualization",
                                    "Export reports for medical professionals",
                                ]
                                .iter()
                                .enumerate()
                                {
                                    ui.horizontal(|ui| {
                                        ui.label(
                                            egui::RichText::new(format!("{}", index + 1))
                                                .strong()
                                                .color(accent),
                                        );
                                        ui.label(*step);
                                    });
                                }
                                ui.add_space(10.0);
                                let try_it = egui::Button::new(
                                    egui::RichText::new("Try It Now")
                                        .strong()
                                        .color(egui::Color32::WHITE),
                                )
                                .fill(accent)
                                .min_size(egui::vec2(120.0, 34.0));
                                if ui.add(try_it).clicked() {
                                    self.view = AppView::Scan;
                                }
                            });

                        ui.add_space(24.0);
                        ui.separator();
                        ui.add_space(6.0);
                        ui.label(
                            egui::RichText::new("\u{00A9} 2024 NeuraScan. All rights reserved.")
                                .weak()
                                .small(),
                        );
                        ui.label(
                            egui::RichText::new(
                                "This analysis is provided as a screening tool and should not \
                                 replace professional medical advice.",
                            )
                            .weak()
                            .small(),
                        );
                        ui.add_space(16.0);
                    });
                });
        });
    }

    fn show_scan_view(&mut self, ctx: &egui::Context) {
        let scale = self.theme.text_scale;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        let width = ui.available_width().clamp(480.0, 760.0);
                        ui.set_width(width);
                        ui.add_space(16.0);
                        ui.label(
                            egui::RichText::new("Brain Tumor Detection")
                                .strong()
                                .size(26.0 * scale),
                        );
                        ui.add_space(10.0);
                        self.show_status_banner(ui);

                        // The tab row disappears once a result or failure
                        // replaces the upload card.
                        if !matches!(
                            self.phase,
                            WorkflowPhase::ResultsReady | WorkflowPhase::Failed
                        ) {
                            ui.horizontal(|ui| {
                                let _ = ui.selectable_label(true, "Upload Scan");
                                ui.add_enabled(false, egui::Button::new("Capture Image"))
                                    .on_disabled_hover_text(
                                        "Camera capture is not available in this demo",
                                    );
                            });
                            ui.add_space(8.0);
                        }

                        match self.phase {
                            WorkflowPhase::Idle => self.show_upload_card(ui),
                            WorkflowPhase::PreviewReady | WorkflowPhase::Uploading => {
                                self.show_preview_card(ui)
                            }
                            WorkflowPhase::Processing => self.show_processing_card(ui),
                            WorkflowPhase::ResultsReady => self.show_results_card(ui),
                            WorkflowPhase::Failed => self.show_failure_card(ui),
                        }
                        ui.add_space(20.0);
                    });
                });
        });
    }

    fn show_upload_card(&mut self, ui: &mut egui::Ui) {
        let scale = self.theme.text_scale;
        let accent = self.theme.accent_color;
        egui::Frame::NONE
            .fill(lighten_color(ui.visuals().panel_fill, 0.02))
            .corner_radius(12.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20, 24))
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_min_height(280.0);
                    ui.add_space(18.0);
                    if let Some(path) = self.selecting_path.clone() {
                        ui.add(egui::Spinner::new().size(30.0));
                        ui.add_space(10.0);
                        ui.label(
                            egui::RichText::new("Loading preview...")
                                .strong()
                                .size(16.0 * scale),
                        );
                        let name = path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        ui.label(egui::RichText::new(name).weak());
                    } else {
                        ui.label(egui::RichText::new("\u{2B06}").size(40.0));
                        ui.add_space(8.0);
                        ui.label(
                            egui::RichText::new("Upload MRI Scan")
                                .strong()
                                .size(17.0 * scale),
                        );
                        ui.add_space(4.0);
                        ui.label(
                            egui::RichText::new(
                                "Drag and drop your MRI scan image or click to browse. We \
                                 support JPEG, PNG, and DICOM formats.",
                            )
                            .weak(),
                        );
                        ui.add_space(14.0);
                        let select = egui::Button::new(
                            egui::RichText::new("Select File")
                                .strong()
                                .color(egui::Color32::WHITE),
                        )
                        .fill(accent)
                        .min_size(egui::vec2(140.0, 38.0));
                        if ui.add(select).clicked() {
                            self.pick_scan_file();
                        }
                        ui.add_space(8.0);
                        ui.label(
                            egui::RichText::new("Maximum file size: 50MB")
                                .weak()
                                .small(),
                        );
                    }
                    ui.add_space(18.0);
                });
            });
    }

    fn show_preview_card(&mut self, ui: &mut egui::Ui) {
        let accent = self.theme.accent_color;
        let uploading = self.phase == WorkflowPhase::Uploading;
        let progress = self.progress;
        let file = self.file.clone();
        let texture = self.ensure_preview_texture(ui.ctx());

        egui::Frame::NONE
            .fill(lighten_color(ui.visuals().panel_fill, 0.02))
            .corner_radius(12.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20, 18))
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    if let Some(texture) = &texture {
                        let texture_size = texture.size_vec2();
                        let size = fitted_image_size(
                            texture_size.x,
                            texture_size.y,
                            ui.available_width() - 16.0,
                            400.0,
                        );
                        ui.add(egui::Image::new((texture.id(), size)).corner_radius(8.0));
                        ui.add_space(12.0);
                    }

                    if let Some(file) = &file {
                        ui.horizontal(|ui| {
                            ui.label(format!("File: {}", file.file_name));
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    ui.label(file_size_megabytes(file.size_bytes));
                                    if let Some(mime) = &file.mime_type {
                                        ui.label(egui::RichText::new(mime).weak().small());
                                    }
                                },
                            );
                        });
                        ui.add_space(8.0);
                    }

                    if uploading {
                        ui.horizontal(|ui| {
                            ui.label("Uploading...");
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    ui.label(format!("{progress}%"));
                                },
                            );
                        });
                        ui.add(
                            egui::ProgressBar::new(f32::from(progress) / 100.0)
                                .desired_width(f32::INFINITY),
                        );
                        ui.add_space(8.0);
                    }

                    let half =
                        (ui.available_width() - ui.spacing().item_spacing.x).max(0.0) / 2.0;
                    ui.horizontal(|ui| {
                        let cancel = egui::Button::new("Cancel").min_size(egui::vec2(half, 36.0));
                        if ui.add(cancel).clicked() {
                            self.dispatch_reset();
                        }
                        if uploading {
                            ui.add(egui::Spinner::new().size(16.0));
                            let _ = ui.add_enabled(
                                false,
                                egui::Button::new("Uploading...")
                                    .min_size(egui::vec2(half - 24.0, 36.0)),
                            );
                        } else {
                            let process = egui::Button::new(
                                egui::RichText::new("Process Scan")
                                    .strong()
                                    .color(egui::Color32::WHITE),
                            )
                            .fill(accent)
                            .min_size(egui::vec2(half, 36.0));
                            if ui.add(process).clicked() {
                                self.dispatch_start_upload();
                            }
                        }
                    });
                });
            });
    }

    fn show_processing_card(&mut self, ui: &mut egui::Ui) {
        let scale = self.theme.text_scale;
        egui::Frame::NONE
            .fill(lighten_color(ui.visuals().panel_fill, 0.02))
            .corner_radius(12.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20, 24))
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_min_height(320.0);
                    ui.add_space(60.0);
                    ui.add(egui::Spinner::new().size(48.0));
                    ui.add_space(18.0);
                    ui.label(
                        egui::RichText::new("Processing Your Scan")
                            .strong()
                            .size(19.0 * scale),
                    );
                    ui.add_space(6.0);
                    ui.label(
                        egui::RichText::new(
                            "Our AI is analyzing your MRI scan. This typically takes 10-15 \
                             seconds.",
                        )
                        .weak(),
                    );
                });
            });
    }

    fn show_results_card(&mut self, ui: &mut egui::Ui) {
        let Some(report) = self.report.clone() else {
            return;
        };
        let Some(result) = self.result.clone() else {
            return;
        };
        let preview_texture = self.ensure_preview_texture(ui.ctx());
        let heatmap_texture = self.ensure_heatmap_texture(ui.ctx());
        let scale = self.theme.text_scale;
        let accent = self.theme.accent_color;
        let verdict_color = if result.has_tumor {
            egui::Color32::from_rgb(220, 80, 80)
        } else {
            egui::Color32::from_rgb(70, 180, 90)
        };

        egui::Frame::NONE
            .fill(lighten_color(ui.visuals().panel_fill, 0.02))
            .corner_radius(12.0)
            .stroke(egui::Stroke::new(
                1.0,
                ui.visuals().widgets.noninteractive.bg_stroke.color,
            ))
            .inner_margin(egui::Margin::symmetric(20, 18))
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(if result.has_tumor {
                            "\u{26A0}"
                        } else {
                            "\u{1F9E0}"
                        })
                        .size(34.0)
                        .color(verdict_color),
                    );
                    ui.label(
                        egui::RichText::new(&report.headline)
                            .strong()
                            .size(22.0 * scale)
                            .color(verdict_color),
                    );
                    ui.label(
                        egui::RichText::new(format!("Confidence: {}%", report.confidence_percent))
                            .weak(),
                    );
                });
                ui.add_space(12.0);

                ui.horizontal(|ui| {
                    for (tab, label) in [
                        (ResultsTab::Results, "Results"),
                        (ResultsTab::Visualization, "Visualization"),
                        (ResultsTab::Details, "Details"),
                    ] {
                        if ui
                            .selectable_label(self.results_tab == tab, label)
                            .clicked()
                        {
                            self.results_tab = tab;
                        }
                    }
                });
                ui.separator();
                ui.add_space(8.0);

                match self.results_tab {
                    ResultsTab::Results => {
                        ui.columns(2, |columns| {
                            let left = &mut columns[0];
                            left.label(
                                egui::RichText::new("Scan Analysis")
                                    .strong()
                                    .size(16.0 * scale),
                            );
                            left.add_space(6.0);
                            detail_row(left, "Diagnosis:", &report.diagnosis);
                            if let Some(tumor_type) = &report.tumor_type {
                                detail_row(left, "Tumor Type:", tumor_type);
                            }
                            detail_row(
                                left,
                                "Confidence:",
                                &format!("{}%", report.confidence_percent),
                            );
                            detail_row(
                                left,
                                "Analysis Date:",
                                &report
                                    .analyzed_at
                                    .with_timezone(&Local)
                                    .format("%Y-%m-%d")
                                    .to_string(),
                            );
                            left.add_space(12.0);
                            left.label(
                                egui::RichText::new("Recommendations")
                                    .strong()
                                    .size(16.0 * scale),
                            );
                            left.add_space(4.0);
                            left.label(egui::RichText::new(&report.recommendation).weak());

                            let right = &mut columns[1];
                            right.label(
                                egui::RichText::new("Original Scan")
                                    .strong()
                                    .size(16.0 * scale),
                            );
                            right.add_space(6.0);
                            if let Some(texture) = &preview_texture {
                                let texture_size = texture.size_vec2();
                                let size = fitted_image_size(
                                    texture_size.x,
                                    texture_size.y,
                                    right.available_width(),
                                    280.0,
                                );
                                right.add(
                                    egui::Image::new((texture.id(), size)).corner_radius(8.0),
                                );
                            }
                        });
                    }
                    ResultsTab::Visualization => {
                        ui.columns(2, |columns| {
                            if let Some(texture) = &preview_texture {
                                let panel = &mut columns[0];
                                let texture_size = texture.size_vec2();
                                let size = fitted_image_size(
                                    texture_size.x,
                                    texture_size.y,
                                    panel.available_width(),
                                    280.0,
                                );
                                panel.add(
                                    egui::Image::new((texture.id(), size)).corner_radius(8.0),
                                );
                                panel.label(egui::RichText::new("Original Scan").weak().small());
                            }
                            if let Some(texture) = &heatmap_texture {
                                let panel = &mut columns[1];
                                let size = fitted_image_size(
                                    128.0,
                                    128.0,
                                    panel.available_width(),
                                    280.0,
                                );
                                panel.add(
                                    egui::Image::new((texture.id(), size)).corner_radius(8.0),
                                );
                                panel.label(egui::RichText::new("AI Heatmap").weak().small());
                            }
                        });
                        ui.add_space(10.0);
                        info_box(
                            ui,
                            "About This Visualization",
                            "The heatmap overlay shows areas where our AI has detected \
                             potential abnormalities. Red and yellow areas indicate higher \
                             probability of tumor presence, while green areas represent lower \
                             probability. This visualization is meant to assist medical \
                             professionals and should not be used as the sole basis for \
                             diagnosis.",
                        );
                    }
                    ResultsTab::Details => {
                        ui.label(
                            egui::RichText::new("Technical Details")
                                .strong()
                                .size(16.0 * scale),
                        );
                        ui.add_space(6.0);
                        detail_row(ui, "Model Version:", &report.technical.model_version);
                        detail_row(ui, "Analysis ID:", &report.technical.analysis_id);
                        detail_row(ui, "Processing Time:", &report.technical.processing_time);
                        detail_row(ui, "Image Resolution:", &report.technical.image_resolution);

                        if let Some(characteristics) = &report.tumor_characteristics {
                            ui.add_space(12.0);
                            ui.label(
                                egui::RichText::new("Tumor Characteristics")
                                    .strong()
                                    .size(16.0 * scale),
                            );
                            ui.add_space(6.0);
                            detail_row(ui, "Estimated Size:", &characteristics.estimated_size);
                            detail_row(ui, "Location:", &characteristics.location);
                            detail_row(ui, "Boundary:", &characteristics.boundary);
                            detail_row(ui, "Density:", &characteristics.density);
                        }

                        ui.add_space(12.0);
                        info_box(
                            ui,
                            "Disclaimer",
                            "This analysis is provided as a screening tool and should not \
                             replace professional medical advice. Always consult with a \
                             qualified healthcare provider for diagnosis and treatment options.",
                        );
                    }
                }

                ui.add_space(14.0);
                ui.separator();
                ui.horizontal(|ui| {
                    ui.add_enabled(false, egui::Button::new("Download Report"))
                        .on_disabled_hover_text("Report export is not available in this demo");
                    ui.add_enabled(false, egui::Button::new("Share"))
                        .on_disabled_hover_text("Sharing is not available in this demo");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let new_scan = egui::Button::new(
                            egui::RichText::new("New Scan")
                                .strong()
                                .color(egui::Color32::WHITE),
                        )
                        .fill(accent);
                        if ui.add(new_scan).clicked() {
                            self.dispatch_reset();
                        }
                    });
                });
            });
    }

    fn show_failure_card(&mut self, ui: &mut egui::Ui) {
        let scale = self.theme.text_scale;
        let message = self
            .last_error
            .as_ref()
            .map(|error| error.message.clone())
            .unwrap_or_else(|| "The scan could not be analyzed.".to_string());

        egui::Frame::NONE
            .fill(egui::Color32::from_rgb(111, 53, 53))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
            .corner_radius(12.0)
            .inner_margin(egui::Margin::symmetric(20, 18))
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("\u{26A0}")
                            .size(34.0)
                            .color(egui::Color32::WHITE),
                    );
                    ui.label(
                        egui::RichText::new("Analysis Failed")
                            .strong()
                            .size(19.0 * scale)
                            .color(egui::Color32::WHITE),
                    );
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new(message).color(egui::Color32::WHITE));
                    ui.add_space(12.0);
                    if ui
                        .add(egui::Button::new("Try Again").min_size(egui::vec2(120.0, 34.0)))
                        .clicked()
                    {
                        self.dispatch_reset();
                    }
                });
            });
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.settings_open;
        egui::Window::new("Appearance")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Theme");
                    egui::ComboBox::from_id_salt("theme_preset")
                        .selected_text(self.theme.preset.label())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(
                                &mut self.theme.preset,
                                ThemePreset::Dark,
                                ThemePreset::Dark.label(),
                            );
                            ui.selectable_value(
                                &mut self.theme.preset,
                                ThemePreset::Light,
                                ThemePreset::Light.label(),
                            );
                        });
                });
                ui.horizontal(|ui| {
                    ui.label("Accent color");
                    let mut accent = self.theme.accent_color;
                    if ui.color_edit_button_srgba(&mut accent).changed() {
                        self.theme.accent_color = accent;
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Text scale");
                    ui.add(
                        egui::Slider::new(&mut self.theme.text_scale, 0.8..=1.4).step_by(0.05),
                    );
                });
                ui.add_space(6.0);
                if ui.button("Reset to defaults").clicked() {
                    self.theme = ThemeSettings::neura_default();
                }
            });
        self.settings_open = open;
    }
}

fn feature_card(ui: &mut egui::Ui, icon: &str, title: &str, description: &str, scale: f32) {
    egui::Frame::NONE
        .fill(ui.visuals().faint_bg_color.gamma_multiply(0.55))
        .corner_radius(12.0)
        .stroke(egui::Stroke::new(
            1.0,
            ui.visuals().widgets.noninteractive.bg_stroke.color,
        ))
        .inner_margin(egui::Margin::symmetric(14, 12))
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(icon).size(28.0));
                ui.add_space(4.0);
                ui.label(egui::RichText::new(title).strong().size(16.0 * scale));
                ui.add_space(4.0);
                ui.label(egui::RichText::new(description).weak().small());
            });
        });
}

impl eframe::App for NeuraScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.tick = self.tick.wrapping_add(1);

        self.process_ui_events();
        self.apply_theme_if_needed(ctx);

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        match self.view {
            AppView::Home => self.show_home_view(ctx),
            AppView::Scan => self.show_scan_view(ctx),
        }
        if self.settings_open {
            self.show_settings_window(ctx);
        }

        if self.phase.is_busy() || self.selecting_path.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings::from_runtime(self.theme);
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
