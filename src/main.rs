//! Main application for the YouTube Downloader GUI

// Runtime configuration
mod config;
// Download worker thread and its events
mod downloader;
// Error types
mod error;
// Boundary trait for the extraction tool
mod extractor;
// URL -> metadata
mod metadata;
// Data models for videos, searches and download progress
mod model;
// Progress parsing utilities
mod progress;
// Query -> search results
mod search;
// Thumbnail fetching module
mod thumbnail;
// UI state and event handlers
mod view;
// yt-dlp process driver
mod ytdlp;

use config::AppConfig;
use extractor::Extractor;
use model::Mode;
use view::{Notice, NoticeLevel, ViewState};
use ytdlp::YtDlp;

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{ColorImage, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection, MessageDialog for notices
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    runtime::{Handle, Runtime},
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: loads config, initializes runtime and launches GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_tracing(&config.log_filter);
    if let Some(err) = config_error {
        error!(%err, "ignoring config file");
    }
    info!("tubegrab v{} starting", env!("CARGO_PKG_VERSION"));

    let rt = RUNTIME.get_or_try_init(|| Runtime::new().map(Arc::new))?;
    let extractor: Arc<dyn Extractor> = Arc::new(YtDlp::new(&config, rt.handle().clone()));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("YouTube Downloader")
            .with_inner_size([800.0, 400.0])
            .with_resizable(false),
        ..Default::default()
    };
    let dark_mode = config.dark_mode;
    let handle = rt.handle().clone();
    eframe::run_native(
        "YouTube Downloader",
        options,
        Box::new(move |cc| {
            let visuals = if dark_mode { Visuals::dark() } else { Visuals::light() };
            cc.egui_ctx.set_visuals(visuals);
            Box::new(TubeGrabApp::new(cc.egui_ctx.clone(), &config, extractor, handle))
        }),
    )?;
    Ok(())
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Application state for the GUI
struct TubeGrabApp {
    /// Everything the widgets show
    view: ViewState,
    /// Used by background fetches to wake the UI
    ctx: egui::Context,
    /// yt-dlp, or a stand-in
    extractor: Arc<dyn Extractor>,
    /// Runtime for download workers and thumbnail fetches
    runtime: Handle,
    /// Texture of the current preview, if loaded
    thumbnail: Option<egui::TextureHandle>,
    /// URL of the preview we are waiting for
    thumbnail_url: Option<String>,
    thumbnail_tx: UnboundedSender<(String, ColorImage)>,
    thumbnail_rx: UnboundedReceiver<(String, ColorImage)>,
}

impl TubeGrabApp {
    fn new(
        ctx: egui::Context,
        config: &AppConfig,
        extractor: Arc<dyn Extractor>,
        runtime: Handle,
    ) -> Self {
        let (thumbnail_tx, thumbnail_rx) = unbounded_channel();
        Self {
            view: ViewState::new(config.format.clone()),
            ctx,
            extractor,
            runtime,
            thumbnail: None,
            thumbnail_url: None,
            thumbnail_tx,
            thumbnail_rx,
        }
    }

    /// Runs the resolver the current mode calls for
    fn submit_input(&mut self) {
        match self.view.mode {
            Mode::Url => self.view.show_info(self.extractor.as_ref()),
            Mode::Search => self.view.run_search(self.extractor.as_ref()),
        }
        self.refresh_thumbnail();
    }

    fn select_result(&mut self, index: usize) {
        if let Err(err) = self.view.select_result(self.extractor.as_ref(), index) {
            self.view.info_text = err.to_string();
        }
        self.refresh_thumbnail();
    }

    /// Drops the old preview and fetches the new one, if any
    fn refresh_thumbnail(&mut self) {
        self.thumbnail = None;
        self.thumbnail_url = self.view.take_thumbnail_request();
        let Some(url) = self.thumbnail_url.clone() else {
            return;
        };
        let tx = self.thumbnail_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                let _ = tx.send((url, img));
                ctx.request_repaint();
            }
        });
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for TubeGrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1. Apply worker progress, then show any dialogs it produced
        self.view.poll_download();
        for notice in self.view.take_notices() {
            show_notice(&notice);
        }

        // 2. Load finished thumbnail fetches; stale ones are dropped
        while let Ok((url, img)) = self.thumbnail_rx.try_recv() {
            if self.thumbnail_url.as_deref() == Some(url.as_str()) {
                self.thumbnail = Some(ctx.load_texture(&url, img, TextureOptions::default()));
            }
        }

        // 3. Left panel: info text, preview, search results
        let mut clicked_result = None;
        egui::SidePanel::left("info_panel")
            .exact_width(300.0)
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        ui.add(egui::Label::new(&self.view.info_text).wrap(true));
                        if let Some(tex) = &self.thumbnail {
                            ui.add(egui::Image::new(tex).max_width(280.0));
                        }
                        if self.view.has_results() {
                            ui.separator();
                            for (idx, line) in self.view.search_lines().iter().enumerate() {
                                if ui.selectable_label(false, line).clicked() {
                                    clicked_result = Some(idx);
                                }
                            }
                        }
                    });
            });
        if let Some(idx) = clicked_result {
            self.select_result(idx);
        }

        // 4. Main panel: mode, input, folder, progress and actions
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.horizontal(|ui| {
                    if ui.radio(self.view.mode == Mode::Url, "URL").clicked() {
                        self.view.set_mode(Mode::Url);
                    }
                    if ui.radio(self.view.mode == Mode::Search, "Search").clicked() {
                        self.view.set_mode(Mode::Search);
                    }
                });

                let mut submit = false;
                if self.view.mode == Mode::Search && ui.button("Search").clicked() {
                    submit = true;
                }

                ui.label(self.view.input_label());
                let input = ui.add(egui::TextEdit::singleline(&mut self.view.input).desired_width(360.0));
                if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
                if self.view.mode == Mode::Url && ui.button("Show info").clicked() {
                    submit = true;
                }
                if submit {
                    self.submit_input();
                }

                if ui.button("Choose folder...").clicked() {
                    let mut dialog = FileDialog::new();
                    if let Some(dir) = self.view.destination() {
                        dialog = dialog.set_directory(dir);
                    }
                    self.view.choose_destination(dialog.pick_folder());
                }
                ui.colored_label(egui::Color32::LIGHT_BLUE, self.view.destination_label());

                ui.add_space(8.0);
                ui.label(self.view.progress.label());
                ui.add(
                    egui::ProgressBar::new(self.view.progress.fraction())
                        .desired_width(400.0)
                        .show_percentage(),
                );
                ui.add_space(8.0);

                let downloading = self.view.is_downloading();
                if ui
                    .add_enabled(!downloading, egui::Button::new("Download Video"))
                    .clicked()
                {
                    self.view
                        .start_download(&self.runtime, Arc::clone(&self.extractor));
                }
                if let Some(folder) = self.view.finished_folder() {
                    if ui.button("Open Folder").clicked() {
                        open_folder(folder.to_path_buf());
                    }
                }
                if ui.button("Exit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });

        // Request periodic repaint for progress updates
        if self.view.is_downloading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/// Blocking native dialog for a notice
fn show_notice(notice: &Notice) {
    let level = match notice.level {
        NoticeLevel::Warning => MessageLevel::Warning,
        NoticeLevel::Error => MessageLevel::Error,
        NoticeLevel::Info => MessageLevel::Info,
    };
    MessageDialog::new()
        .set_level(level)
        .set_title(notice.title)
        .set_description(&notice.message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Opens `folder` in the platform file manager
fn open_folder(folder: PathBuf) {
    std::thread::spawn(move || {
        #[cfg(target_os = "windows")]
        let result = std::process::Command::new("explorer").arg(&folder).spawn();
        #[cfg(target_os = "macos")]
        let result = std::process::Command::new("open").arg(&folder).spawn();
        #[cfg(all(unix, not(target_os = "macos")))]
        let result = std::process::Command::new("xdg-open").arg(&folder).spawn();
        if let Err(err) = result {
            error!(%err, folder = %folder.display(), "cannot open folder");
        }
    });
}
