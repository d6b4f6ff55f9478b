//! Retro HUB - browse console game libraries and launch them in emulators
//!
//! The library holds everything that doesn't need a window: scanning game
//! folders, reading their metadata and covers, laying cards out on a grid and
//! supervising the emulator process. The desktop UI lives in the binary.

pub mod config;
pub mod cover;
pub mod emulator;
pub mod error;
pub mod extensions;
pub mod grid;
pub mod image_loader;
pub mod library;
pub mod metadata;
pub mod session;
pub mod worker;

pub use config::{Config, ConsoleProfile};
pub use error::{LauncherError, Result};
pub use grid::{GridMetrics, GridPlacement, Placeholder};
pub use library::{FolderKey, GameEntry};
pub use session::{CoverState, LibrarySession, LibraryStatus, SessionUpdate};
