//! Main Retro HUB window
//!
//! This module provides the launcher UI:
//! - Console selector, search box and rescan button
//! - Cover grid laid out by the library session
//! - Status bar with library and emulator state
//! - Detail window and error dialog

use super::description::DescriptionWindow;
use super::theme::{self, Accent};
use egui::{Color32, ColorImage, RichText, TextureHandle, TextureOptions, Vec2};
use retrohub::emulator::ExitOutcome;
use retrohub::session::PresentationItem;
use retrohub::{Config, CoverState, FolderKey, LibrarySession, LibraryStatus, Placeholder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const TITLE_HEIGHT: f32 = 40.0;
const MAX_TITLE_CHARS: usize = 24;

/// Main application state
pub struct RetroHubApp {
    session: LibrarySession,
    /// Where the last console is remembered; `None` means the default file
    config_path: Option<PathBuf>,
    /// `current_console` as loaded; the file is rewritten only if it changed
    saved_console: String,
    search_query: String,

    /// Cover textures by game; rebuilt when a cover arrives
    cover_textures: HashMap<FolderKey, TextureHandle>,

    accent: Accent,
    details: Option<DescriptionWindow>,
    error_message: Option<String>,
    minimized: bool,
    theme_applied: bool,
}

impl RetroHubApp {
    pub fn new(
        ctx: &egui::Context,
        config: Config,
        config_path: Option<PathBuf>,
        console: Option<String>,
    ) -> Self {
        let saved_console = config.current_console.clone();
        let initial = console.unwrap_or_else(|| saved_console.clone());

        let mut session = LibrarySession::new(config);
        let repaint = ctx.clone();
        session.set_waker(Arc::new(move || repaint.request_repaint()));

        let mut app = Self {
            session,
            config_path,
            saved_console,
            search_query: String::new(),
            cover_textures: HashMap::new(),
            accent: Accent::default(),
            details: None,
            error_message: None,
            minimized: false,
            theme_applied: false,
        };
        app.select_console(&initial);
        app
    }

    fn select_console(&mut self, key: &str) {
        match self.session.switch_console(key) {
            Ok(()) => {
                self.search_query.clear();
                if let Some(profile) = self.session.current_profile() {
                    self.accent = Accent::from_hex(&profile.gradient_start, &profile.gradient_end);
                }
            }
            Err(e) => {
                log::error!("Failed to select console {}: {}", key, e);
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn rescan(&mut self) {
        if let Err(e) = self.session.rescan() {
            log::error!("Failed to rescan library: {}", e);
            self.error_message = Some(e.to_string());
        }
    }

    /// Apply background events to the UI state
    fn process_session_updates(&mut self, ctx: &egui::Context) {
        let update = self.session.pump();

        if update.reset {
            self.cover_textures.clear();
            self.details = None;
        } else if update.relayout {
            retain_known(&mut self.cover_textures, &self.session);
        }

        for key in &update.covers {
            let Some(item) = self.session.item(key) else {
                continue;
            };
            if let CoverState::Ready(cover) = &item.cover {
                let image = ColorImage::from_rgba_unmultiplied(
                    [cover.width as usize, cover.height as usize],
                    &cover.rgba,
                );
                let texture = ctx.load_texture(format!("cover_{}", key), image, TextureOptions::LINEAR);
                self.cover_textures.insert(key.clone(), texture);
            }
        }

        if let Some(closed) = update.emulator_closed {
            log::info!("Emulator closed for {}: {:?}", closed.rom.display(), closed.outcome);
            if let ExitOutcome::LaunchFailed(reason) = &closed.outcome {
                self.error_message = Some(format!("Could not start the emulator:\n{}", reason));
            }
            if self.minimized {
                ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
                ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
                self.minimized = false;
            }
        }
    }

    fn launch(&mut self, ctx: &egui::Context, key: &FolderKey) {
        match self.session.launch(key) {
            Ok(true) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                self.minimized = true;
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("Failed to launch {}: {}", key, e);
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn open_details(&mut self, ctx: &egui::Context, key: &FolderKey) {
        match self.session.details(key) {
            Some(details) => self.details = Some(DescriptionWindow::new(ctx, details)),
            None => log::warn!("No details for {}", key),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let consoles: Vec<(String, String)> = self
            .session
            .config()
            .consoles
            .iter()
            .map(|(key, profile)| (key.clone(), profile.name.clone()))
            .collect();
        let current = self.session.current_console().map(str::to_string);
        let mut selected = None;
        let mut rescan = false;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                for (key, name) in &consoles {
                    let active = current.as_deref() == Some(key.as_str());
                    if ui
                        .selectable_label(active, RichText::new(name).size(15.0))
                        .clicked()
                        && !active
                    {
                        selected = Some(key.clone());
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add_enabled(
                            self.session.status() != LibraryStatus::Scanning,
                            egui::Button::new("Rescan"),
                        )
                        .on_hover_text("Scan the library folder again")
                        .clicked()
                    {
                        rescan = true;
                    }

                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.search_query)
                            .desired_width(220.0)
                            .hint_text("Search..."),
                    );
                    if response.changed() {
                        self.session.set_search(&self.search_query);
                    }
                });
            });
            ui.add_space(6.0);
        });

        if let Some(key) = selected {
            self.select_console(&key);
        }
        if rescan {
            self.rescan();
        }
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    match self.session.status() {
                        LibraryStatus::Idle => {
                            ui.label("No console selected");
                        }
                        LibraryStatus::Scanning => {
                            ui.spinner();
                            ui.label("Scanning...");
                        }
                        LibraryStatus::Ready => {
                            ui.label(format!(
                                "{} of {} games",
                                self.session.visible_entries().len(),
                                self.session.entries().len()
                            ));
                        }
                        LibraryStatus::RootMissing(root) => {
                            ui.colored_label(
                                Color32::from_rgb(255, 180, 0),
                                format!("Folder not found: {}", root.display()),
                            );
                        }
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.session.emulator_running() {
                            ui.colored_label(Color32::from_rgb(100, 200, 100), "Emulator running");
                        } else if let Some(profile) = self.session.current_profile() {
                            ui.label(&profile.name);
                        }
                    });
                });
            });
    }

    fn render_grid(&mut self, ctx: &egui::Context) {
        let mut to_launch = None;
        let mut to_describe = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::new())
            .show(ctx, |ui| {
                theme::paint_gradient(ui.painter(), ui.max_rect(), self.accent);

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        let metrics = self.session.config().grid;
                        let width = ui.available_width() - 2.0 * metrics.spacing;
                        let placement = self.session.layout(width).clone();

                        let content_width = metrics.content_width(placement.columns);
                        let left = ((ui.available_width() - content_width) / 2.0).max(0.0);
                        ui.add_space(metrics.spacing);

                        if let Some(placeholder) = &placement.placeholder {
                            let text = match placeholder {
                                Placeholder::Loading => "Loading...".to_string(),
                                Placeholder::NotFound(message) => message.clone(),
                            };
                            let (rect, _) = ui.allocate_exact_size(
                                Vec2::new(ui.available_width(), metrics.item_height),
                                egui::Sense::hover(),
                            );
                            ui.painter().text(
                                rect.center(),
                                egui::Align2::CENTER_CENTER,
                                text,
                                egui::FontId::proportional(18.0),
                                Color32::WHITE,
                            );
                            return;
                        }

                        let (grid_rect, _) = ui.allocate_exact_size(
                            Vec2::new(
                                ui.available_width(),
                                metrics.content_height(placement.rows()) + metrics.spacing,
                            ),
                            egui::Sense::hover(),
                        );
                        let origin = grid_rect.min + Vec2::new(left, 0.0);

                        for cell in &placement.cells {
                            let Some(item) = self.session.item(&cell.key) else {
                                continue;
                            };
                            let (x, y) = metrics.cell_origin(cell.row, cell.col);
                            let card_rect = egui::Rect::from_min_size(
                                origin + Vec2::new(x, y),
                                Vec2::new(metrics.item_width, metrics.item_height),
                            );

                            let response = ui
                                .interact(card_rect, ui.id().with(&cell.key), egui::Sense::click())
                                .on_hover_text(&item.tooltip);

                            if ui.is_rect_visible(card_rect) {
                                draw_card(ui, card_rect, &response, item, self.cover_textures.get(&cell.key));
                            }

                            if response.double_clicked() {
                                to_launch = Some(cell.key.clone());
                            } else if response.secondary_clicked() {
                                to_describe = Some(cell.key.clone());
                            }
                        }
                    });
            });

        if let Some(key) = to_launch {
            self.launch(ctx, &key);
        }
        if let Some(key) = to_describe {
            self.open_details(ctx, &key);
        }
    }

    fn render_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(details) = &self.details {
            if !details.show(ctx) {
                self.details = None;
            }
        }

        if let Some(message) = self.error_message.clone() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(12.0);
                    if ui.button("OK").clicked() {
                        self.error_message = None;
                    }
                });
        }
    }
}

/// Drop entries for games the session no longer knows (pruned by a rescan)
fn retain_known<T>(by_game: &mut HashMap<FolderKey, T>, session: &LibrarySession) {
    by_game.retain(|key, _| session.item(key).is_some());
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

/// Draw a game card: cover (or placeholder) above the title
fn draw_card(
    ui: &egui::Ui,
    rect: egui::Rect,
    response: &egui::Response,
    item: &PresentationItem,
    texture: Option<&TextureHandle>,
) {
    let visuals = ui.style().interact(response);
    let painter = ui.painter();

    let bg_color = if response.hovered() {
        theme::CARD_FILL_HOVER
    } else {
        theme::CARD_FILL
    };
    painter.rect(
        rect,
        4.0,
        bg_color,
        egui::Stroke::new(2.0, visuals.bg_stroke.color),
        egui::StrokeKind::Outside,
    );

    let cover_rect = egui::Rect::from_min_size(
        rect.min + Vec2::new(8.0, 8.0),
        Vec2::new(rect.width() - 16.0, rect.height() - TITLE_HEIGHT - 16.0),
    );

    match (texture, &item.cover) {
        (Some(texture), CoverState::Ready(cover)) => {
            let (width, height) = cover.fit_within(cover_rect.width(), cover_rect.height());
            let image_rect =
                egui::Rect::from_center_size(cover_rect.center(), Vec2::new(width, height));
            painter.image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        (_, CoverState::Loading) => {
            painter.rect_filled(cover_rect, 2.0, theme::COVER_PLACEHOLDER);
            painter.text(
                cover_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Loading...",
                egui::FontId::proportional(12.0),
                Color32::from_gray(160),
            );
        }
        _ => {
            painter.rect_filled(cover_rect, 2.0, theme::COVER_PLACEHOLDER);
        }
    }

    let title_pos = egui::pos2(rect.center().x, rect.bottom() - TITLE_HEIGHT + 4.0);
    painter.text(
        title_pos,
        egui::Align2::CENTER_TOP,
        truncate_title(&item.title),
        egui::FontId::proportional(13.0),
        Color32::WHITE,
    );
}

impl eframe::App for RetroHubApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            ctx.set_visuals(theme::dark_visuals());
            self.theme_applied = true;
        }

        self.process_session_updates(ctx);

        self.render_top_bar(ctx);
        self.render_status_bar(ctx);
        self.render_grid(ctx);
        self.render_dialogs(ctx);

        // Background work reports through channels; keep polling while it runs.
        if self.session.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.shutdown();

        let config = self.session.config();
        if config.current_console == self.saved_console {
            return;
        }
        let saved = match &self.config_path {
            Some(path) => config.save_to(path),
            None => config.save(),
        };
        if let Err(e) = saved {
            log::error!("Failed to save configuration: {}", e);
        }
    }
}
