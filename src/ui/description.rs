//! Game detail window: description text and screenshots

use egui::{ColorImage, TextureHandle, TextureOptions};
use retrohub::image_loader::decode_image;
use retrohub::session::GameDetails;

pub struct DescriptionWindow {
    details: GameDetails,
    screenshots: Vec<TextureHandle>,
}

impl DescriptionWindow {
    /// Screenshots are decoded right away; unreadable ones are skipped
    pub fn new(ctx: &egui::Context, details: GameDetails) -> Self {
        let mut screenshots = Vec::new();
        for (i, path) in details.screenshots.iter().enumerate() {
            match decode_image(path) {
                Ok(image) => {
                    let color_image = ColorImage::from_rgba_unmultiplied(
                        [image.width as usize, image.height as usize],
                        &image.rgba,
                    );
                    screenshots.push(ctx.load_texture(
                        format!("screenshot_{}_{}", details.title, i),
                        color_image,
                        TextureOptions::LINEAR,
                    ));
                }
                Err(e) => log::warn!("Failed to load screenshot {}: {}", path.display(), e),
            }
        }

        Self {
            details,
            screenshots,
        }
    }

    /// Draw the window; returns `false` once the user closed it
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let mut open = true;

        egui::Window::new(self.details.title.as_str())
            .id(egui::Id::new("game_details"))
            .open(&mut open)
            .collapsible(false)
            .default_size([520.0, 560.0])
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.label(&self.details.text);

                        if !self.screenshots.is_empty() {
                            ui.add_space(12.0);
                            ui.separator();
                            ui.add_space(8.0);
                        }

                        let max_width = ui.available_width();
                        for texture in &self.screenshots {
                            let size = texture.size_vec2();
                            let scale = if size.x > max_width { max_width / size.x } else { 1.0 };
                            ui.add(egui::Image::new(egui::load::SizedTexture::new(
                                texture.id(),
                                size * scale,
                            )));
                            ui.add_space(8.0);
                        }
                    });
            });

        open
    }
}
