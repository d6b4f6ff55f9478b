//! Configuration management for Retro HUB
//!
//! Handles loading and saving of the console profiles (ROM roots, emulator
//! paths, launch arguments, accent colours), the image extensions used for
//! covers and screenshots, and the grid metrics.

use crate::error::{LauncherError, Result};
use crate::grid::GridMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Static configuration of one console platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleProfile {
    /// Display name
    pub name: String,

    /// Library root (one sub-folder per game); relative to the base directory
    pub root: PathBuf,

    /// Allowed ROM extensions, e.g. ".nes"
    #[serde(default)]
    pub rom_extensions: Vec<String>,

    /// Emulator executable; relative to the base directory
    pub emulator: PathBuf,

    /// Extra launch arguments, shell-quoted
    #[serde(default)]
    pub fullscreen_arg: String,

    /// Background gradient, "#RRGGBB"
    #[serde(default = "default_gradient_start")]
    pub gradient_start: String,

    #[serde(default = "default_gradient_end")]
    pub gradient_end: String,
}

impl ConsoleProfile {
    /// Library root resolved against the base directory
    pub fn root_in(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.root)
    }

    /// Emulator path resolved against the base directory
    pub fn emulator_in(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.emulator)
    }

    /// Launch arguments, `None` when blank
    pub fn extra_args(&self) -> Option<&str> {
        let arg = self.fullscreen_arg.trim();
        (!arg.is_empty()).then_some(arg)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Console shown on startup
    #[serde(default = "default_console")]
    pub current_console: String,

    /// Extensions recognised for covers and screenshots
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Console profiles by key
    #[serde(default = "default_consoles")]
    pub consoles: BTreeMap<String, ConsoleProfile>,

    /// Card size and spacing
    #[serde(default)]
    pub grid: GridMetrics,

    /// Directory relative paths are resolved against
    #[serde(skip, default = "base_dir")]
    pub base_dir: PathBuf,
}

fn default_console() -> String {
    "DENDY".to_string()
}

fn default_gradient_start() -> String {
    "#1E1E1E".to_string()
}

fn default_gradient_end() -> String {
    "#404040".to_string()
}

fn default_image_extensions() -> Vec<String> {
    [".png", ".jpg", ".jpeg"].iter().map(|s| s.to_string()).collect()
}

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_consoles() -> BTreeMap<String, ConsoleProfile> {
    let mut consoles = BTreeMap::new();
    consoles.insert(
        "DENDY".to_string(),
        ConsoleProfile {
            name: "Dendy".to_string(),
            root: PathBuf::from("Dendy"),
            rom_extensions: exts(&[".nes", ".rar"]),
            emulator: ["Emulator", "FCE Ultra X Rus", "fceux64 rus.exe"].iter().collect(),
            fullscreen_arg: String::new(),
            gradient_start: "#0A001A".to_string(),
            gradient_end: "#8A2BE2".to_string(),
        },
    );
    consoles.insert(
        "SEGA".to_string(),
        ConsoleProfile {
            name: "Sega".to_string(),
            root: PathBuf::from("Sega"),
            rom_extensions: exts(&[".gen", ".smd", ".bin", ".zip"]),
            emulator: ["Emulator", "Gens32", "Gens32Surreal.exe"].iter().collect(),
            fullscreen_arg: String::new(),
            gradient_start: "#000A0A".to_string(),
            gradient_end: "#7FFF00".to_string(),
        },
    );
    consoles.insert(
        "SONY".to_string(),
        ConsoleProfile {
            name: "Sony PlayStation".to_string(),
            root: PathBuf::from("Sony"),
            rom_extensions: exts(&[".iso", ".bin", ".img", ".cue", ".zip"]),
            emulator: ["Emulator", "DuckStation", "duckstation-qt-x64-ReleaseLTCG.exe"]
                .iter()
                .collect(),
            fullscreen_arg: "-fullscreen".to_string(),
            gradient_start: "#1A1A00".to_string(),
            gradient_end: "#FFFF00".to_string(),
        },
    );
    consoles
}

/// Directory of the running executable, or the working directory
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_console: default_console(),
            consoles: default_consoles(),
            image_extensions: default_image_extensions(),
            grid: GridMetrics::default(),
            base_dir: base_dir(),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("retrohub");
            fs::create_dir_all(&app_dir).ok();
            app_dir.join("config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }

    /// Load configuration from the default location
    ///
    /// A missing or broken file is not fatal: defaults are used instead.
    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => {
                    log::info!("Loaded configuration from: {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::error!("Failed to load config file: {}", e);
                }
            }
        }

        log::info!("Using default configuration");
        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        log::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Look up a console profile
    pub fn console(&self, key: &str) -> Result<&ConsoleProfile> {
        self.consoles
            .get(key)
            .ok_or_else(|| LauncherError::UnknownConsole(key.to_string()))
    }
}
