//! Grid layout engine
//!
//! Places a list of games into a responsive column/row grid. Presentation
//! items live in an [`ItemCache`] keyed by folder name and are never rebuilt
//! by a layout pass: each pass hides every cached item, then assigns cells to
//! (and shows) the items of the requested entries. Running the same pass
//! twice yields the same placement, so it is safe to lay out again on every
//! resize and every search keystroke.

use crate::library::{FolderKey, GameEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Card size and spacing, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    #[serde(default = "default_item_width")]
    pub item_width: f32,
    #[serde(default = "default_item_height")]
    pub item_height: f32,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
}

fn default_item_width() -> f32 {
    180.0
}

fn default_item_height() -> f32 {
    220.0
}

fn default_spacing() -> f32 {
    15.0
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            item_width: default_item_width(),
            item_height: default_item_height(),
            spacing: default_spacing(),
        }
    }
}

impl GridMetrics {
    pub fn columns_for(&self, viewport_width: f32) -> usize {
        column_count(viewport_width, self.item_width, self.spacing)
    }

    /// Top-left corner of a cell relative to the grid origin
    pub fn cell_origin(&self, row: usize, col: usize) -> (f32, f32) {
        (
            col as f32 * (self.item_width + self.spacing),
            row as f32 * (self.item_height + self.spacing),
        )
    }

    /// Height occupied by `rows` rows; the filler below them takes no space
    pub fn content_height(&self, rows: usize) -> f32 {
        if rows == 0 {
            0.0
        } else {
            rows as f32 * (self.item_height + self.spacing) - self.spacing
        }
    }

    /// Width spanned by `columns` columns
    pub fn content_width(&self, columns: usize) -> f32 {
        if columns == 0 {
            0.0
        } else {
            columns as f32 * (self.item_width + self.spacing) - self.spacing
        }
    }
}

/// Number of columns that fit in the viewport, never less than one
pub fn column_count(viewport_width: f32, item_width: f32, spacing: f32) -> usize {
    let stride = item_width + spacing;
    if !viewport_width.is_finite() || !stride.is_finite() || viewport_width <= 0.0 || stride <= 0.0 {
        return 1;
    }
    ((viewport_width / stride).floor() as usize).max(1)
}

/// A cached item plus its current placement
#[derive(Debug)]
pub struct CachedItem<T> {
    pub item: T,
    visible: bool,
    cell: Option<(usize, usize)>,
}

impl<T> CachedItem<T> {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cell(&self) -> Option<(usize, usize)> {
        self.cell
    }

    fn hide(&mut self) {
        self.visible = false;
        self.cell = None;
    }
}

/// Stable store of presentation items keyed by folder name
#[derive(Debug)]
pub struct ItemCache<T> {
    items: HashMap<FolderKey, CachedItem<T>>,
}

impl<T> Default for ItemCache<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
        }
    }
}

impl<T> ItemCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hidden item; returns `false` (and keeps the old one) if the key exists
    pub fn insert(&mut self, key: FolderKey, item: T) -> bool {
        if self.items.contains_key(&key) {
            return false;
        }
        self.items.insert(
            key,
            CachedItem {
                item,
                visible: false,
                cell: None,
            },
        );
        true
    }

    pub fn contains(&self, key: &FolderKey) -> bool {
        self.items.contains_key(key)
    }

    pub fn get(&self, key: &FolderKey) -> Option<&CachedItem<T>> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: &FolderKey) -> Option<&mut T> {
        self.items.get_mut(key).map(|c| &mut c.item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drop every item whose key fails the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&FolderKey) -> bool) {
        self.items.retain(|key, _| keep(key));
    }

    pub fn hide_all(&mut self) {
        for cached in self.items.values_mut() {
            cached.hide();
        }
    }

    pub fn visible_count(&self) -> usize {
        self.items.values().filter(|c| c.visible).count()
    }

    fn place(&mut self, key: &FolderKey, row: usize, col: usize) -> bool {
        match self.items.get_mut(key) {
            Some(cached) => {
                cached.visible = true;
                cached.cell = Some((row, col));
                true
            }
            None => false,
        }
    }
}

/// One placed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub key: FolderKey,
    pub row: usize,
    pub col: usize,
}

/// Centred message spanning the whole first row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    NotFound(String),
}

/// Result of a layout pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlacement {
    pub columns: usize,
    pub cells: Vec<GridCell>,
    pub placeholder: Option<Placeholder>,
    /// First row below the content; it absorbs the remaining height
    pub filler_row: usize,
}

impl GridPlacement {
    /// Placement shown while the library is being scanned
    pub fn loading(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            cells: Vec::new(),
            placeholder: Some(Placeholder::Loading),
            filler_row: 1,
        }
    }

    /// Rows taken by items or the placeholder
    pub fn rows(&self) -> usize {
        self.filler_row
    }
}

/// Lay `entries` out over the cached items
///
/// Entries without a cached item (not yet reported by the scanner) are
/// skipped for this pass and don't take a cell. An empty `entries` shows the
/// not-found placeholder and no items.
pub fn layout<T>(
    cache: &mut ItemCache<T>,
    entries: &[GameEntry],
    viewport_width: f32,
    metrics: &GridMetrics,
    empty_message: &str,
) -> GridPlacement {
    let columns = metrics.columns_for(viewport_width);
    cache.hide_all();

    if entries.is_empty() {
        return GridPlacement {
            columns,
            cells: Vec::new(),
            placeholder: Some(Placeholder::NotFound(empty_message.to_string())),
            filler_row: 1,
        };
    }

    let mut cells = Vec::with_capacity(entries.len());
    for entry in entries {
        let index = cells.len();
        let (row, col) = (index / columns, index % columns);
        if cache.place(&entry.folder_name, row, col) {
            cells.push(GridCell {
                key: entry.folder_name.clone(),
                row,
                col,
            });
        } else {
            log::debug!("No cached item for {}; skipped this pass", entry.folder_name);
        }
    }

    let filler_row = cells.len().div_ceil(columns);

    GridPlacement {
        columns,
        cells,
        placeholder: None,
        filler_row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str) -> GameEntry {
        GameEntry {
            title: name.to_string(),
            folder_name: FolderKey::from(name),
            folder_path: PathBuf::from("/roms").join(name),
            rom_path: PathBuf::from("/roms").join(name).join("game.nes"),
            summary: String::new(),
            screenshots: Vec::new(),
        }
    }

    fn cache_of(names: &[&str]) -> ItemCache<String> {
        let mut cache = ItemCache::new();
        for name in names {
            cache.insert(FolderKey::from(*name), name.to_string());
        }
        cache
    }

    #[test]
    fn test_column_count() {
        assert_eq!(column_count(780.0, 180.0, 15.0), 4);
        assert_eq!(column_count(194.0, 180.0, 15.0), 1);
        assert_eq!(column_count(0.0, 180.0, 15.0), 1);
        assert_eq!(column_count(-10.0, 180.0, 15.0), 1);
        assert_eq!(column_count(500.0, 0.0, 0.0), 1);
        assert_eq!(column_count(f32::NAN, 180.0, 15.0), 1);
        assert_eq!(column_count(1950.0, 180.0, 15.0), 10);
    }

    #[test]
    fn test_rows_and_columns() {
        let names = ["a", "b", "c", "d", "e", "f"];
        let mut cache = cache_of(&names);
        let entries: Vec<GameEntry> = names.iter().map(|n| entry(n)).collect();

        let placement = layout(&mut cache, &entries, 780.0, &GridMetrics::default(), "none");

        assert_eq!(placement.columns, 4);
        assert_eq!(placement.placeholder, None);
        let cells: Vec<(usize, usize)> = placement.cells.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1)]);
        assert_eq!(placement.filler_row, 2);
        assert_eq!(cache.get(&FolderKey::from("e")).unwrap().cell(), Some((1, 0)));
    }

    #[test]
    fn test_filtered_items_are_hidden_not_removed() {
        let mut cache = cache_of(&["mario", "zelda", "contra"]);
        let metrics = GridMetrics::default();

        layout(&mut cache, &[entry("mario"), entry("zelda"), entry("contra")], 780.0, &metrics, "none");
        assert_eq!(cache.visible_count(), 3);

        let placement = layout(&mut cache, &[entry("zelda")], 780.0, &metrics, "none");
        assert_eq!(placement.cells.len(), 1);
        assert_eq!(placement.cells[0].row, 0);
        assert_eq!(placement.cells[0].col, 0);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.visible_count(), 1);
        assert!(!cache.get(&FolderKey::from("mario")).unwrap().is_visible());
        assert_eq!(cache.get(&FolderKey::from("mario")).unwrap().cell(), None);
    }

    #[test]
    fn test_layout_is_idempotent() {
        let mut cache = cache_of(&["a", "b", "c", "d", "e"]);
        let entries: Vec<GameEntry> = ["a", "b", "c", "d", "e"].iter().map(|n| entry(n)).collect();
        let metrics = GridMetrics::default();

        // A previous empty state must not leak into the next pass.
        layout(&mut cache, &[], 600.0, &metrics, "none");
        let first = layout(&mut cache, &entries, 600.0, &metrics, "none");
        let second = layout(&mut cache, &entries, 600.0, &metrics, "none");

        assert_eq!(first, second);
        assert_eq!(second.placeholder, None);
        assert_eq!(cache.visible_count(), 5);
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn test_empty_entries_show_placeholder() {
        let mut cache = cache_of(&["a", "b"]);
        layout(&mut cache, &[entry("a"), entry("b")], 1000.0, &GridMetrics::default(), "none");

        let placement = layout(&mut cache, &[], 1000.0, &GridMetrics::default(), "No games found");
        assert_eq!(placement.columns, 5);
        assert_eq!(
            placement.placeholder,
            Some(Placeholder::NotFound("No games found".to_string()))
        );
        assert!(placement.cells.is_empty());
        assert_eq!(cache.visible_count(), 0);
    }

    #[test]
    fn test_uncached_entries_are_skipped() {
        let mut cache = cache_of(&["a", "c"]);
        let placement = layout(
            &mut cache,
            &[entry("a"), entry("b"), entry("c")],
            390.0,
            &GridMetrics::default(),
            "none",
        );
        let keys: Vec<&str> = placement.cells.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!((placement.cells[1].row, placement.cells[1].col), (0, 1));
        assert_eq!(placement.filler_row, 1);
    }

    #[test]
    fn test_insert_keeps_existing_item() {
        let mut cache = cache_of(&["a"]);
        assert!(!cache.insert(FolderKey::from("a"), "other".to_string()));
        assert_eq!(cache.get(&FolderKey::from("a")).unwrap().item, "a");
    }

    #[test]
    fn test_metrics_geometry() {
        let metrics = GridMetrics::default();
        assert_eq!(metrics.cell_origin(1, 2), (390.0, 235.0));
        assert_eq!(metrics.content_height(2), 455.0);
        assert_eq!(metrics.content_width(4), 765.0);
        assert_eq!(metrics.content_height(0), 0.0);
    }
}
