use crate::get_config_dir;
use crate::orchestrator::ItemFailurePolicy;
use crate::request::DownloadFormat;
use crate::Result;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "config.toml";
// How many bytes rusty_ytdl receives before the progress callback runs.
const DEFAULT_CHUNK_SIZE_BYTES: u64 = 100000;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub download_format: DownloadFormat,
    /// Falls back to the user's download directory when unset.
    pub download_dir: Option<PathBuf>,
    pub on_item_error: ItemFailurePolicy,
    pub chunk_size_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_format: DownloadFormat::default(),
            download_dir: None,
            on_item_error: ItemFailurePolicy::default(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let config_dir = get_config_dir()?;
        if let Ok(config_file) = std::fs::read_to_string(config_dir.join(CONFIG_FILE_NAME)) {
            Self::from_toml(&config_file)
        } else {
            Ok(Self::default())
        }
    }
    pub fn from_toml(config_file: &str) -> Result<Self> {
        Ok(toml::from_str(config_file)?)
    }
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(|| {
                UserDirs::new()
                    .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::error::Error;
    use crate::orchestrator::ItemFailurePolicy;
    use crate::request::DownloadFormat;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }
    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            download_format = "audio"
            download_dir = "/tmp/music"
            on_item_error = "skip"
            chunk_size_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                download_format: DownloadFormat::Audio,
                download_dir: Some(PathBuf::from("/tmp/music")),
                on_item_error: ItemFailurePolicy::Skip,
                chunk_size_bytes: 4096,
            }
        );
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/music"));
    }
    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_toml(r#"on_item_error = "skip""#).unwrap();
        assert_eq!(config.on_item_error, ItemFailurePolicy::Skip);
        assert_eq!(config.download_format, DownloadFormat::Video);
        assert_eq!(config.chunk_size_bytes, Config::default().chunk_size_bytes);
    }
    #[test]
    fn test_invalid_config() {
        let config = Config::from_toml(r#"download_format = "flac""#);
        assert!(matches!(config, Err(Error::TomlDeserialization(_))));
    }
}
