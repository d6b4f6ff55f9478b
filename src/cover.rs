//! Cover art lookup by naming convention
//!
//! A game folder may carry its artwork in three places, checked in order:
//!
//! 1. `images/cartridge.<ext>`
//! 2. `cover.<ext>` next to the game
//! 3. `images/cover.<ext>`
//!
//! File names are compared case-insensitively; within one step the first
//! matching extension (in configured order) wins.

use crate::extensions::ExtensionSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-game artwork folder
pub const IMAGES_DIR: &str = "images";

/// Find the cover image of a game folder
///
/// Returns `None` when no file matches; callers show a placeholder.
pub fn resolve_cover(game_folder: &Path, extensions: &ExtensionSet) -> Option<PathBuf> {
    let images_dir = game_folder.join(IMAGES_DIR);
    let in_images = list_files(&images_dir);
    let in_folder = list_files(game_folder);

    find_named(&in_images, "cartridge", extensions)
        .or_else(|| find_named(&in_folder, "cover", extensions))
        .or_else(|| find_named(&in_images, "cover", extensions))
}

/// Is this file one of the cover images (and so not a screenshot)?
pub fn is_cover_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.contains("cartridge") || lower.contains("cover")
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn find_named(files: &[PathBuf], stem: &str, extensions: &ExtensionSet) -> Option<PathBuf> {
    extensions.iter().find_map(|ext| {
        let wanted = format!("{}.{}", stem, ext);
        files
            .iter()
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.eq_ignore_ascii_case(&wanted))
                    .unwrap_or(false)
            })
            .cloned()
    })
}
