//! Retro HUB desktop UI built on egui/eframe
//!
//! The window shows one console library at a time: console buttons and a
//! search box on top, the cover grid in the middle and a status line at the
//! bottom. All library work is delegated to [`retrohub::LibrarySession`].

mod app;
mod description;
mod theme;

pub use app::RetroHubApp;
