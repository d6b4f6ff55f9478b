//! Library session - the controller behind the launcher window
//!
//! A session owns everything tied to the console being browsed: the scan
//! pass, the cover loaders, the item cache, the search filter and the
//! emulator monitor. All events are drained on the UI thread by [`pump`], so
//! state is only ever mutated from one place.
//!
//! [`pump`]: LibrarySession::pump

use crate::config::{Config, ConsoleProfile};
use crate::emulator::{EmulatorClosed, EmulatorMonitor, LaunchRequest, Waker};
use crate::error::{LauncherError, Result};
use crate::extensions::ExtensionSet;
use crate::grid::{self, GridPlacement, ItemCache};
use crate::image_loader::{spawn_cover_loader, CoverEvent, DecodedCover};
use crate::library::{spawn_scan, FolderKey, GameEntry, LibraryScanner, ScanEvent, ScanJob};
use crate::metadata;
use crate::worker::Worker;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Cover of one card
#[derive(Debug, Clone)]
pub enum CoverState {
    Loading,
    Ready(Arc<DecodedCover>),
    /// No cover file, or it couldn't be decoded
    Missing,
}

/// Per-game card data, created once per discovered game
#[derive(Debug, Clone)]
pub struct PresentationItem {
    pub title: String,
    pub tooltip: String,
    pub folder_path: PathBuf,
    pub rom_path: PathBuf,
    pub cover: CoverState,
}

impl PresentationItem {
    fn from_entry(entry: &GameEntry) -> Self {
        Self {
            title: entry.title.clone(),
            tooltip: format!("{}\n\n{}", entry.title, entry.summary),
            folder_path: entry.folder_path.clone(),
            rom_path: entry.rom_path.clone(),
            cover: CoverState::Loading,
        }
    }
}

/// Everything the detail window shows
#[derive(Debug, Clone)]
pub struct GameDetails {
    pub title: String,
    pub html: String,
    pub text: String,
    pub screenshots: Vec<PathBuf>,
}

/// What changed during one [`LibrarySession::pump`]
#[derive(Debug, Default)]
pub struct SessionUpdate {
    /// The visible list changed; lay out again
    pub relayout: bool,
    /// Items whose cover state changed
    pub covers: Vec<FolderKey>,
    pub emulator_closed: Option<EmulatorClosed>,
    /// The item cache was cleared (console switch); drop anything keyed by it
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryStatus {
    /// No console selected
    Idle,
    Scanning,
    Ready,
    RootMissing(PathBuf),
}

pub struct LibrarySession {
    config: Config,
    console: Option<String>,

    /// Complete list of the last finished pass
    entries: Vec<GameEntry>,
    /// `entries` narrowed by the search query
    filtered: Vec<GameEntry>,
    query: String,

    items: ItemCache<PresentationItem>,
    scan: Option<ScanJob>,
    scan_completed: bool,
    root_missing: Option<PathBuf>,

    loaders: Vec<Worker>,
    cover_tx: Sender<CoverEvent>,
    cover_rx: Receiver<CoverEvent>,

    emulator: EmulatorMonitor,
    /// A launch whose `EmulatorClosed` hasn't been drained yet
    awaiting_emulator: bool,

    placement: GridPlacement,
    placement_dirty: bool,
    reset_pending: bool,
    shut_down: bool,
}

impl LibrarySession {
    /// Create an idle session; call [`switch_console`](Self::switch_console) to start
    pub fn new(config: Config) -> Self {
        let (cover_tx, cover_rx) = channel();
        Self {
            config,
            console: None,
            entries: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
            items: ItemCache::new(),
            scan: None,
            scan_completed: false,
            root_missing: None,
            loaders: Vec::new(),
            cover_tx,
            cover_rx,
            emulator: EmulatorMonitor::new(),
            awaiting_emulator: false,
            placement: GridPlacement::loading(1),
            placement_dirty: true,
            reset_pending: false,
            shut_down: false,
        }
    }

    /// Run `waker` whenever a background event needs the UI's attention
    /// even though nothing else is driving [`pump`](Self::pump)
    pub fn set_waker(&mut self, waker: Waker) {
        self.emulator.set_waker(waker);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_console(&self) -> Option<&str> {
        self.console.as_deref()
    }

    pub fn current_profile(&self) -> Option<&ConsoleProfile> {
        self.console
            .as_deref()
            .and_then(|key| self.config.consoles.get(key))
    }

    /// All games of the last finished pass
    pub fn entries(&self) -> &[GameEntry] {
        &self.entries
    }

    /// Games matching the current search
    pub fn visible_entries(&self) -> &[GameEntry] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn item(&self, key: &FolderKey) -> Option<&PresentationItem> {
        self.items.get(key).map(|cached| &cached.item)
    }

    pub fn items(&self) -> &ItemCache<PresentationItem> {
        &self.items
    }

    pub fn emulator_running(&self) -> bool {
        self.emulator.is_running()
    }

    /// Is any background work still expected to produce events?
    ///
    /// Only [`pump`](Self::pump) clears the conditions checked here, and only
    /// after the matching events were drained.
    pub fn is_busy(&self) -> bool {
        self.scan.is_some() || !self.loaders.is_empty() || self.awaiting_emulator
    }

    pub fn status(&self) -> LibraryStatus {
        if self.console.is_none() {
            LibraryStatus::Idle
        } else if self.scan.is_some() {
            LibraryStatus::Scanning
        } else if let Some(root) = &self.root_missing {
            LibraryStatus::RootMissing(root.clone())
        } else {
            LibraryStatus::Ready
        }
    }

    /// Make `key` the current console and start scanning its library
    ///
    /// Selecting the current console again does nothing.
    pub fn switch_console(&mut self, key: &str) -> Result<()> {
        self.config.console(key)?;
        if self.console.as_deref() == Some(key) {
            return Ok(());
        }

        log::info!("Switching console to {}", key);
        self.stop_background_work();

        self.items.clear();
        self.entries.clear();
        self.filtered.clear();
        self.query.clear();
        self.root_missing = None;
        self.scan_completed = false;
        self.reset_pending = true;
        self.placement_dirty = true;
        self.console = Some(key.to_string());
        self.config.current_console = key.to_string();

        self.start_scan(HashMap::new())
    }

    /// Scan the current console again, keeping the items already on screen
    pub fn rescan(&mut self) -> Result<()> {
        if self.console.is_none() {
            return Ok(());
        }
        if let Some(job) = self.scan.take() {
            job.cancel_and_join();
        }

        let existing: HashMap<FolderKey, GameEntry> = self
            .entries
            .iter()
            .map(|e| (e.folder_name.clone(), e.clone()))
            .collect();
        log::info!("Rescanning library ({} known games)", existing.len());

        self.root_missing = None;
        self.placement_dirty = true;
        self.start_scan(existing)
    }

    /// Filter the grid by a case-insensitive title substring
    pub fn set_search(&mut self, text: &str) {
        let query = text.trim().to_lowercase();
        if query != self.query {
            self.query = query;
            self.refilter();
        }
    }

    /// Drain pending scan, cover and emulator events
    pub fn pump(&mut self) -> SessionUpdate {
        let mut update = SessionUpdate {
            reset: std::mem::take(&mut self.reset_pending),
            ..Default::default()
        };

        self.pump_scan(&mut update);

        // Prune before draining: a loader that exits now has already queued
        // its event, which the drain below picks up.
        self.loaders.retain(|w| !w.is_finished());
        self.pump_covers(&mut update);

        update.emulator_closed = self.emulator.poll_closed();
        if update.emulator_closed.is_some() {
            self.awaiting_emulator = false;
        }

        if self.placement_dirty {
            update.relayout = true;
        }
        update
    }

    fn pump_scan(&mut self, update: &mut SessionUpdate) {
        let Some(job) = &self.scan else {
            return;
        };

        // Checked before draining so a final event can't slip in between.
        let thread_done = job.is_finished();
        let events: Vec<ScanEvent> = job.poll().collect();

        let mut finished = false;
        for event in events {
            match event {
                ScanEvent::GameFound(entry) => self.add_item(&entry),
                ScanEvent::RootMissing(root) => {
                    log::warn!("Library folder missing: {}", root.display());
                    self.root_missing = Some(root);
                }
                ScanEvent::Finished(list) => {
                    self.finish_scan(list);
                    finished = true;
                }
            }
        }

        if finished || thread_done {
            if !finished {
                log::error!("Library scan ended without a result");
                self.scan_completed = true;
                self.placement_dirty = true;
            }
            if let Some(job) = self.scan.take() {
                job.join();
            }
            update.relayout = true;
        }
    }

    fn pump_covers(&mut self, update: &mut SessionUpdate) {
        while let Ok(CoverEvent { key, cover }) = self.cover_rx.try_recv() {
            match self.items.get_mut(&key) {
                Some(item) => {
                    item.cover = match cover {
                        Some(cover) => CoverState::Ready(cover),
                        None => CoverState::Missing,
                    };
                    update.covers.push(key);
                }
                None => log::debug!("Dropping cover for unknown item {}", key),
            }
        }
    }

    fn add_item(&mut self, entry: &GameEntry) {
        let key = entry.folder_name.clone();
        if !self.items.insert(key.clone(), PresentationItem::from_entry(entry)) {
            return;
        }

        let extensions = ExtensionSet::new(&self.config.image_extensions);
        match spawn_cover_loader(
            key.clone(),
            entry.folder_path.clone(),
            extensions,
            self.cover_tx.clone(),
        ) {
            Ok(worker) => self.loaders.push(worker),
            Err(e) => {
                log::error!("Failed to start cover loader for {}: {}", key, e);
                if let Some(item) = self.items.get_mut(&key) {
                    item.cover = CoverState::Missing;
                }
            }
        }
    }

    fn finish_scan(&mut self, list: Vec<GameEntry>) {
        let keys: HashSet<&FolderKey> = list.iter().map(|e| &e.folder_name).collect();
        let before = self.items.len();
        self.items.retain(|key| keys.contains(key));
        if self.items.len() != before {
            log::info!("Removed {} vanished games", before - self.items.len());
        }

        for entry in &list {
            if let Some(item) = self.items.get_mut(&entry.folder_name) {
                item.folder_path = entry.folder_path.clone();
                item.rom_path = entry.rom_path.clone();
            }
        }

        self.entries = list;
        self.scan_completed = true;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = self
            .entries
            .iter()
            .filter(|e| e.matches_query(&self.query))
            .cloned()
            .collect();
        self.placement_dirty = true;
    }

    fn empty_message(&self) -> String {
        if let Some(root) = &self.root_missing {
            format!("Folder not found: {}", root.display())
        } else if !self.query.is_empty() {
            format!("No games match \"{}\"", self.query)
        } else {
            "No games found".to_string()
        }
    }

    /// Current grid placement for a viewport width
    ///
    /// Recomputed only when the column count or the visible list changed.
    pub fn layout(&mut self, viewport_width: f32) -> &GridPlacement {
        let columns = self.config.grid.columns_for(viewport_width);
        if self.placement_dirty || self.placement.columns != columns {
            self.placement = if self.scan.is_some() && !self.scan_completed {
                self.items.hide_all();
                GridPlacement::loading(columns)
            } else {
                let message = self.empty_message();
                grid::layout(
                    &mut self.items,
                    &self.filtered,
                    viewport_width,
                    &self.config.grid,
                    &message,
                )
            };
            self.placement_dirty = false;
        }
        &self.placement
    }

    /// Launch the emulator for a game
    ///
    /// Returns `Ok(false)` when the request was ignored (unknown game or an
    /// emulator already running).
    pub fn launch(&mut self, key: &FolderKey) -> Result<bool> {
        if self.emulator.is_running() {
            log::warn!("Emulator already running; ignoring {}", key);
            return Ok(false);
        }

        let Some(rom) = self.item(key).map(|item| item.rom_path.clone()) else {
            log::warn!("Launch requested for unknown game {}", key);
            return Ok(false);
        };
        let Some(profile) = self.current_profile() else {
            return Ok(false);
        };

        let emulator = profile.emulator_in(&self.config.base_dir);
        if !emulator.is_file() {
            return Err(LauncherError::EmulatorNotFound(emulator));
        }
        let extra_args = profile.extra_args().map(str::to_string);

        let launched = self
            .emulator
            .launch(LaunchRequest::new(emulator, rom, extra_args));
        if launched {
            self.awaiting_emulator = true;
        }
        Ok(launched)
    }

    /// Description page and screenshots of a game
    pub fn details(&self, key: &FolderKey) -> Option<GameDetails> {
        let entry = self.entries.iter().find(|e| &e.folder_name == key)?;
        let html = metadata::load_full_description(&entry.folder_path);
        let text = metadata::html_to_text(&html);
        Some(GameDetails {
            title: entry.title.clone(),
            html,
            text,
            screenshots: entry.screenshot_paths(),
        })
    }

    fn stop_background_work(&mut self) {
        if let Some(job) = self.scan.take() {
            job.cancel_and_join();
        }
        for mut loader in self.loaders.drain(..) {
            loader.request_cancel();
            loader.join();
        }
        // Any cover still queued belongs to the old library.
        let (cover_tx, cover_rx) = channel();
        self.cover_tx = cover_tx;
        self.cover_rx = cover_rx;
    }

    fn start_scan(&mut self, existing: HashMap<FolderKey, GameEntry>) -> Result<()> {
        let key = self.console.clone().unwrap_or_default();
        let profile = self.config.console(&key)?;
        let scanner = LibraryScanner::new(
            profile.root_in(&self.config.base_dir),
            ExtensionSet::new(&profile.rom_extensions),
            ExtensionSet::new(&self.config.image_extensions),
        );
        self.scan = Some(spawn_scan(scanner, existing)?);
        Ok(())
    }

    /// Cancel and join every worker; a running emulator is left alone
    ///
    /// Later calls do nothing.
    pub fn shutdown(&mut self) {
        if std::mem::replace(&mut self.shut_down, true) {
            return;
        }
        log::info!("Shutting down library session");
        self.stop_background_work();
        self.emulator.shutdown();
        self.awaiting_emulator = false;
    }
}

impl Drop for LibrarySession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    fn test_config(base: &Path) -> Config {
        let mut config = Config::default();
        config.base_dir = base.to_path_buf();
        for profile in config.consoles.values_mut() {
            profile.emulator = PathBuf::from("emu").join("run");
        }
        config
    }

    fn wait_ready(session: &mut LibrarySession) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.status() == LibraryStatus::Scanning {
            assert!(Instant::now() < deadline, "scan did not finish");
            session.pump();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_unknown_console() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LibrarySession::new(test_config(dir.path()));
        assert!(matches!(
            session.switch_console("ATARI"),
            Err(LauncherError::UnknownConsole(_))
        ));
        assert_eq!(session.status(), LibraryStatus::Idle);
    }

    #[test]
    fn test_loading_placeholder_then_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("SEGA").unwrap();

        wait_ready(&mut session);
        assert_eq!(
            session.status(),
            LibraryStatus::RootMissing(dir.path().join("Sega"))
        );
        let placement = session.layout(780.0);
        assert!(matches!(
            &placement.placeholder,
            Some(grid::Placeholder::NotFound(msg)) if msg.contains("Sega")
        ));
    }

    #[test]
    fn test_search_filters_visible_list() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Dendy/Super Mario/mario.nes"));
        touch(&dir.path().join("Dendy/Contra/contra.nes"));
        touch(&dir.path().join("Dendy/Mario 3/Rom/smb3.nes"));

        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("DENDY").unwrap();
        wait_ready(&mut session);

        assert_eq!(session.entries().len(), 3);
        assert_eq!(session.layout(780.0).cells.len(), 3);

        session.set_search("  MARIO ");
        let titles: Vec<&str> = session
            .visible_entries()
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Mario 3", "Super Mario"]);
        assert_eq!(session.layout(780.0).cells.len(), 2);
        assert_eq!(session.items().len(), 3);

        session.set_search("zelda");
        let placement = session.layout(780.0);
        assert!(placement.cells.is_empty());
        assert!(matches!(
            &placement.placeholder,
            Some(grid::Placeholder::NotFound(msg)) if msg.contains("zelda")
        ));
    }

    #[test]
    fn test_rescan_prunes_vanished_games() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Dendy/Alpha/alpha.nes"));
        touch(&dir.path().join("Dendy/Beta/beta.nes"));

        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("DENDY").unwrap();
        wait_ready(&mut session);
        assert_eq!(session.items().len(), 2);

        fs::remove_dir_all(dir.path().join("Dendy/Beta")).unwrap();
        touch(&dir.path().join("Dendy/Gamma/gamma.nes"));
        session.rescan().unwrap();
        wait_ready(&mut session);

        let names: Vec<&str> = session.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
        assert_eq!(session.items().len(), 2);
        assert!(session.item(&FolderKey::from("Beta")).is_none());
    }

    #[test]
    fn test_launch_without_emulator() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Dendy/Alpha/alpha.nes"));

        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("DENDY").unwrap();
        wait_ready(&mut session);

        let key = FolderKey::from("Alpha");
        assert!(matches!(
            session.launch(&key),
            Err(LauncherError::EmulatorNotFound(path)) if path == dir.path().join("emu/run")
        ));
        assert!(!session.launch(&FolderKey::from("Nope")).unwrap());
    }

    #[test]
    fn test_idle_only_once_covers_are_drained() {
        for _ in 0..20 {
            let dir = tempfile::tempdir().unwrap();
            let game = dir.path().join("Dendy/Battletoads");
            touch(&game.join("Rom/toads.nes"));
            fs::create_dir_all(game.join("images")).unwrap();
            image::RgbaImage::from_pixel(400, 400, image::Rgba([0, 90, 0, 255]))
                .save(game.join("images").join("cartridge.png"))
                .unwrap();

            let mut session = LibrarySession::new(test_config(dir.path()));
            session.switch_console("DENDY").unwrap();

            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                session.pump();
                if !session.is_busy() {
                    break;
                }
                assert!(Instant::now() < deadline, "session stayed busy");
                std::thread::sleep(Duration::from_millis(1));
            }

            let item = session.item(&FolderKey::from("Battletoads")).unwrap();
            assert!(
                matches!(item.cover, CoverState::Ready(_)),
                "idle while the cover is still queued"
            );
        }
    }

    #[test]
    fn test_shutdown_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Dendy/Alpha/alpha.nes"));

        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("DENDY").unwrap();
        session.shutdown();
        assert!(session.shut_down);
        assert!(!session.is_busy());

        session.shutdown();
        assert!(!session.is_busy());
    }

    #[test]
    fn test_switch_remembers_console() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = LibrarySession::new(test_config(dir.path()));
        assert_eq!(session.config().current_console, "DENDY");

        session.switch_console("SONY").unwrap();
        assert_eq!(session.config().current_console, "SONY");
        assert!(session.switch_console("ATARI").is_err());
        assert_eq!(session.config().current_console, "SONY");
    }

    #[test]
    fn test_details() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Dendy/Tetris");
        touch(&game.join("tetris.nes"));
        touch(&game.join("images/shot.png"));
        fs::write(game.join("index.html"), "<h1>Tetris</h1><p>Falling blocks</p>").unwrap();

        let mut session = LibrarySession::new(test_config(dir.path()));
        session.switch_console("DENDY").unwrap();
        wait_ready(&mut session);

        let details = session.details(&FolderKey::from("Tetris")).unwrap();
        assert_eq!(details.title, "Tetris");
        assert_eq!(details.text, "Tetris\n\nFalling blocks");
        assert_eq!(details.screenshots, vec![game.join("images").join("shot.png")]);
        assert!(session.details(&FolderKey::from("Other")).is_none());
    }
}
