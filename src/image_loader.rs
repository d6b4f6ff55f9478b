//! Cover decoding off the UI thread
//!
//! One loader per discovered game resolves the cover file, decodes it at full
//! resolution and hands the RGBA pixels back to the UI thread. Scaling to the
//! card is left to the receiver so a relayout never needs a second decode.

use crate::cover::resolve_cover;
use crate::error::Result;
use crate::extensions::ExtensionSet;
use crate::library::FolderKey;
use crate::worker::Worker;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Decoded image, unscaled, 8-bit RGBA
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedCover {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedCover {
    /// Largest size with the same aspect ratio that fits in the box
    pub fn fit_within(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        if self.width == 0 || self.height == 0 || max_width <= 0.0 || max_height <= 0.0 {
            return (0.0, 0.0);
        }
        let scale = (max_width / self.width as f32).min(max_height / self.height as f32);
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

impl std::fmt::Debug for DecodedCover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedCover")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Result of one cover load; `cover` is `None` when the card keeps its placeholder
#[derive(Debug, Clone)]
pub struct CoverEvent {
    pub key: FolderKey,
    pub cover: Option<Arc<DecodedCover>>,
}

/// Decode any supported image file
pub fn decode_image(path: &Path) -> Result<DecodedCover> {
    let img = image::open(path)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedCover {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Resolve and decode the cover of a game folder
pub fn load_cover(game_folder: &Path, extensions: &ExtensionSet) -> Option<DecodedCover> {
    let path = resolve_cover(game_folder, extensions)?;
    match decode_image(&path) {
        Ok(cover) => {
            log::debug!(
                "Decoded cover {} ({}x{})",
                path.display(),
                cover.width,
                cover.height
            );
            Some(cover)
        }
        Err(e) => {
            log::warn!("Failed to decode cover {}: {}", path.display(), e);
            None
        }
    }
}

/// Start a background cover load for one game
///
/// Exactly one [`CoverEvent`] is sent unless the worker is cancelled first.
pub fn spawn_cover_loader(
    key: FolderKey,
    game_folder: PathBuf,
    extensions: ExtensionSet,
    sender: Sender<CoverEvent>,
) -> Result<Worker> {
    let name = format!("cover-{}", key);
    let worker = Worker::spawn(name, move |cancel| {
        if cancel.is_cancelled() {
            return;
        }
        let cover = load_cover(&game_folder, &extensions).map(Arc::new);
        if cancel.is_cancelled() {
            return;
        }
        let _ = sender.send(CoverEvent { key, cover });
    })?;
    Ok(worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
        img.save(path).unwrap();
    }

    fn exts() -> ExtensionSet {
        ExtensionSet::new([".png", ".jpg"])
    }

    #[test]
    fn test_load_cover_keeps_original_size() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("images/cartridge.png"), 64, 32);

        let cover = load_cover(dir.path(), &exts()).unwrap();
        assert_eq!((cover.width, cover.height), (64, 32));
        assert_eq!(cover.rgba.len(), 64 * 32 * 4);
        assert_eq!(&cover.rgba[..4], &[200, 40, 40, 255]);
    }

    #[test]
    fn test_corrupt_cover_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cover.png"), b"not a png").unwrap();
        assert!(load_cover(dir.path(), &exts()).is_none());
    }

    #[test]
    fn test_loader_sends_event() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("cover.png"), 8, 8);

        let (tx, rx) = channel();
        let mut worker = spawn_cover_loader(
            FolderKey::from("Mario"),
            dir.path().to_path_buf(),
            exts(),
            tx.clone(),
        )
        .unwrap();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.join();
        assert_eq!(event.key, FolderKey::from("Mario"));
        assert_eq!(event.cover.unwrap().width, 8);

        let empty = tempfile::tempdir().unwrap();
        let mut worker =
            spawn_cover_loader(FolderKey::from("None"), empty.path().to_path_buf(), exts(), tx)
                .unwrap();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.join();
        assert!(event.cover.is_none());
    }

    #[test]
    fn test_fit_within() {
        let cover = DecodedCover {
            width: 200,
            height: 100,
            rgba: Vec::new(),
        };
        assert_eq!(cover.fit_within(100.0, 100.0), (100.0, 50.0));
        assert_eq!(cover.fit_within(400.0, 50.0), (100.0, 50.0));
        assert_eq!(cover.fit_within(0.0, 50.0), (0.0, 0.0));
    }
}
