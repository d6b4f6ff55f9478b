//! Look and feel: dark visuals plus the per-console accent gradient

use egui::{Color32, Mesh, Pos2, Rect};

pub const CARD_FILL: Color32 = Color32::from_rgb(40, 45, 60);
pub const CARD_FILL_HOVER: Color32 = Color32::from_rgb(60, 65, 80);
pub const COVER_PLACEHOLDER: Color32 = Color32::from_rgb(30, 30, 40);

/// Dark theme applied once on startup
pub fn dark_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    // Deep charcoal background
    visuals.panel_fill = Color32::from_rgb(18, 18, 24);
    visuals.window_fill = Color32::from_rgb(24, 24, 32);
    visuals.extreme_bg_color = Color32::from_rgb(12, 12, 16);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(35, 35, 45);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(50, 50, 65);

    visuals.widgets.noninteractive.corner_radius = egui::CornerRadius::same(8);
    visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(6);
    visuals.widgets.hovered.corner_radius = egui::CornerRadius::same(6);
    visuals.widgets.active.corner_radius = egui::CornerRadius::same(6);

    visuals
}

/// Parse "#RRGGBB" (the leading '#' is optional)
pub fn parse_hex_color(hex: &str) -> Option<Color32> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Console accent colours, falling back to neutral greys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accent {
    pub start: Color32,
    pub end: Color32,
}

impl Default for Accent {
    fn default() -> Self {
        Self {
            start: Color32::from_rgb(0x1E, 0x1E, 0x1E),
            end: Color32::from_rgb(0x40, 0x40, 0x40),
        }
    }
}

impl Accent {
    pub fn from_hex(start: &str, end: &str) -> Self {
        let fallback = Self::default();
        let start = parse_hex_color(start).unwrap_or_else(|| {
            log::warn!("Invalid gradient colour {:?}", start);
            fallback.start
        });
        let end = parse_hex_color(end).unwrap_or_else(|| {
            log::warn!("Invalid gradient colour {:?}", end);
            fallback.end
        });
        Self { start, end }
    }
}

/// Fill `rect` with a diagonal gradient from the top-left to the bottom-right
pub fn paint_gradient(painter: &egui::Painter, rect: Rect, accent: Accent) {
    let mid = lerp_color(accent.start, accent.end, 0.5);
    let mut mesh = Mesh::default();
    mesh.colored_vertex(rect.left_top(), accent.start);
    mesh.colored_vertex(rect.right_top(), mid);
    mesh.colored_vertex(rect.right_bottom(), accent.end);
    mesh.colored_vertex(Pos2::new(rect.left(), rect.bottom()), mid);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}
