//! Download YouTube videos and playlists, optionally as audio only, reporting
//! progress and log lines to any listener.
// Clippy project config
#![warn(clippy::unwrap_used)]

use directories::ProjectDirs;
use error::Error;
pub use error::Result;
use std::path::PathBuf;

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod request;
pub mod resolver;

pub use events::{DownloadEvent, EventSink, Percentage};
pub use orchestrator::{ItemFailurePolicy, Orchestrator, RunHandle, RunOutcome};
pub use request::{classify, DownloadFormat, DownloadRequest, UrlKind};

pub fn get_data_dir() -> Result<PathBuf> {
    let directory = if let Ok(s) = std::env::var("GDOWNLOADER_DATA_DIR") {
        PathBuf::from(s)
    } else if let Some(proj_dirs) = ProjectDirs::from("com", "gemii", "gdownloader") {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        return Err(Error::DirectoryName);
    };
    Ok(directory)
}

pub fn get_config_dir() -> Result<PathBuf> {
    let directory = if let Ok(s) = std::env::var("GDOWNLOADER_CONFIG_DIR") {
        PathBuf::from(s)
    } else if let Some(proj_dirs) = ProjectDirs::from("com", "gemii", "gdownloader") {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        return Err(Error::DirectoryName);
    };
    Ok(directory)
}
