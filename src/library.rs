//! Library scanner - discover games under a console's root folder
//!
//! Each immediate sub-folder of the root is one candidate game:
//!
//! ```text
//! <root>/<game>/Rom/*.<ext>        preferred ROM location
//! <root>/<game>/**/*.<ext>         fallback, `images/` excluded
//! <root>/<game>/images/*           cover art and screenshots
//! <root>/<game>/index.html         description page
//! ```
//!
//! A folder without a ROM file is not a game and is skipped silently.
//! Newly discovered games are reported one by one as they are found so the
//! UI can populate progressively; the complete list follows at the end.

use crate::cover::{is_cover_name, IMAGES_DIR};
use crate::error::{LauncherError, Result};
use crate::extensions::ExtensionSet;
use crate::metadata;
use crate::worker::{CancelToken, Worker};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use walkdir::WalkDir;

/// Name of the preferred ROM sub-folder
pub const ROM_DIR: &str = "Rom";

// Guards against pathological nesting in the fallback walk
const MAX_ROM_SEARCH_DEPTH: usize = 10;

/// Identifies a game within one console library: its folder name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderKey(String);

impl FolderKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FolderKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FolderKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// One discovered, playable game
#[derive(Debug, Clone, PartialEq)]
pub struct GameEntry {
    /// Display name (the folder name)
    pub title: String,

    /// Cache key
    pub folder_name: FolderKey,

    /// Absolute game folder
    pub folder_path: PathBuf,

    /// Absolute ROM / disc image path
    pub rom_path: PathBuf,

    /// Five-line summary from `index.html`, or the "unavailable" placeholder
    pub summary: String,

    /// Screenshot files relative to `folder_path`
    pub screenshots: Vec<PathBuf>,
}

impl GameEntry {
    /// Screenshot files as absolute paths
    pub fn screenshot_paths(&self) -> Vec<PathBuf> {
        self.screenshots
            .iter()
            .map(|rel| self.folder_path.join(rel))
            .collect()
    }

    /// Does the title contain the (already lowercased) query?
    pub fn matches_query(&self, query_lower: &str) -> bool {
        query_lower.is_empty() || self.title.to_lowercase().contains(query_lower)
    }
}

/// Progress of a scan pass, in emission order
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A game not present in the reuse cache was found
    GameFound(GameEntry),
    /// The root folder doesn't exist; an empty `Finished` follows
    RootMissing(PathBuf),
    /// Full list of the pass, cached and new entries alike; always last
    Finished(Vec<GameEntry>),
}

/// How a scan pass ended
#[derive(Debug)]
pub enum ScanOutcome {
    Completed(Vec<GameEntry>),
    Cancelled,
}

/// Scanner for one console library
#[derive(Debug, Clone)]
pub struct LibraryScanner {
    root: PathBuf,
    rom_extensions: ExtensionSet,
    image_extensions: ExtensionSet,
}

impl LibraryScanner {
    pub fn new(root: PathBuf, rom_extensions: ExtensionSet, image_extensions: ExtensionSet) -> Self {
        Self {
            root,
            rom_extensions,
            image_extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run one scan pass
    ///
    /// Entries in `existing` are reused (only their paths are refreshed) and
    /// are not reported through `GameFound`. Cancellation is checked between
    /// game folders; a cancelled pass emits nothing further.
    pub fn scan<F>(
        &self,
        existing: &HashMap<FolderKey, GameEntry>,
        cancel: &CancelToken,
        mut emit: F,
    ) -> ScanOutcome
    where
        F: FnMut(ScanEvent),
    {
        let folders = match self.game_folders() {
            Ok(folders) => folders,
            Err(e) => {
                log::error!("{}", e);
                emit(ScanEvent::RootMissing(self.root.clone()));
                emit(ScanEvent::Finished(Vec::new()));
                return ScanOutcome::Completed(Vec::new());
            }
        };

        log::info!("Scanning library: {}", self.root.display());

        let mut entries = Vec::new();
        let mut cached = 0;
        let mut skipped = 0;

        for (folder_name, folder_path) in folders {
            if cancel.is_cancelled() {
                log::info!("Library scan cancelled: {}", self.root.display());
                return ScanOutcome::Cancelled;
            }

            if let Some(known) = existing.get(&folder_name) {
                let mut entry = known.clone();
                if let Some(rom_path) = find_rom_file(&folder_path, &self.rom_extensions) {
                    entry.rom_path = rom_path;
                }
                entry.folder_path = folder_path;
                entries.push(entry);
                cached += 1;
                continue;
            }

            match self.load_entry(folder_name, folder_path) {
                Some(entry) => {
                    log::debug!("Found game: {}", entry.title);
                    emit(ScanEvent::GameFound(entry.clone()));
                    entries.push(entry);
                }
                None => skipped += 1,
            }
        }

        if cancel.is_cancelled() {
            log::info!("Library scan cancelled: {}", self.root.display());
            return ScanOutcome::Cancelled;
        }

        log::info!(
            "Library scan complete: {} games ({} reused, {} new, {} folders without ROM)",
            entries.len(),
            cached,
            entries.len() - cached,
            skipped
        );

        emit(ScanEvent::Finished(entries.clone()));
        ScanOutcome::Completed(entries)
    }

    /// Immediate sub-folders of the root, sorted by name
    fn game_folders(&self) -> Result<Vec<(FolderKey, PathBuf)>> {
        if !self.root.is_dir() {
            return Err(LauncherError::RootNotFound(self.root.clone()));
        }

        let folders = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                (FolderKey::from(name), e.into_path())
            })
            .collect();

        Ok(folders)
    }

    /// Build an entry for a new folder; `None` if it holds no ROM
    fn load_entry(&self, folder_name: FolderKey, folder_path: PathBuf) -> Option<GameEntry> {
        let rom_path = find_rom_file(&folder_path, &self.rom_extensions)?;
        let summary = metadata::load_summary(&folder_path);
        let screenshots = collect_screenshots(&folder_path, &self.image_extensions);

        Some(GameEntry {
            title: folder_name.as_str().to_string(),
            folder_name,
            folder_path,
            rom_path,
            summary,
            screenshots,
        })
    }
}

fn is_named(path: &Path, name: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.eq_ignore_ascii_case(name))
        .unwrap_or(false)
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

/// Locate the ROM of a game folder
///
/// The `Rom` sub-folder is searched first; otherwise the whole folder is
/// walked, never descending into `images/`.
pub fn find_rom_file(game_folder: &Path, extensions: &ExtensionSet) -> Option<PathBuf> {
    if extensions.is_empty() {
        return None;
    }

    let rom_dir = fs::read_dir(game_folder)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.is_dir() && is_named(p, ROM_DIR));

    if let Some(rom_dir) = rom_dir {
        if let Some(rom) = sorted_files(&rom_dir)
            .into_iter()
            .find(|p| extensions.matches(p))
        {
            return Some(rom);
        }
    }

    WalkDir::new(game_folder)
        .max_depth(MAX_ROM_SEARCH_DEPTH)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && is_named(e.path(), IMAGES_DIR)))
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && extensions.matches(e.path()))
        .map(|e| e.into_path())
}

/// Screenshot files of a game folder, relative to it
///
/// Every image in `images/` except the cover art, in name order.
pub fn collect_screenshots(game_folder: &Path, extensions: &ExtensionSet) -> Vec<PathBuf> {
    sorted_files(&game_folder.join(IMAGES_DIR))
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            (!is_cover_name(&name) && extensions.matches(&path))
                .then(|| Path::new(IMAGES_DIR).join(name))
        })
        .collect()
}

/// A scan pass running in the background
pub struct ScanJob {
    worker: Worker,
    events: Receiver<ScanEvent>,
}

impl ScanJob {
    /// Events delivered so far, without blocking
    pub fn poll(&self) -> impl Iterator<Item = ScanEvent> + '_ {
        self.events.try_iter()
    }

    /// Block until the next event; `None` once the pass has ended
    pub fn recv(&self) -> Option<ScanEvent> {
        self.events.recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stop the pass and wait for the thread; pending events are discarded
    pub fn cancel_and_join(mut self) {
        self.worker.cancel_and_join();
    }

    pub fn join(mut self) {
        self.worker.join();
    }
}

/// Start a scan pass on a background worker
pub fn spawn_scan(
    scanner: LibraryScanner,
    existing: HashMap<FolderKey, GameEntry>,
) -> Result<ScanJob> {
    let (tx, rx) = channel();
    let root = scanner.root().to_path_buf();

    let worker = Worker::spawn("library-scan", move |cancel| {
        scanner.scan(&existing, &cancel, |event| {
            let _ = tx.send(event);
        });
    })?;

    log::info!("Started library scan in background: {}", root.display());

    Ok(ScanJob { worker, events: rx })
}
