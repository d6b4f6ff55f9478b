use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Unknown console: {0}")]
    UnknownConsole(String),
    #[error("ROM folder not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("Emulator not found: {}", .0.display())]
    EmulatorNotFound(PathBuf),
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
