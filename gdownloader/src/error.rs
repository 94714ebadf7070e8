use crate::request::DownloadFormat;
use std::fmt::Display;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    DirectoryName,
    EmptyUrl,
    RunInProgress,
    /// Playlist url could not be turned into a list of video urls.
    Expansion {
        playlist_url: String,
        reason: String,
    },
    /// The video has no stream of the requested kind.
    StreamUnavailable(DownloadFormat),
    Resolver(rusty_ytdl::VideoError),
    Client(rusty_ytdl::reqwest::Error),
    Io(std::io::Error),
    Join(JoinError),
    TomlDeserialization(toml::de::Error),
}
impl Error {
    pub fn new_expansion_error(playlist_url: impl Into<String>, reason: impl Display) -> Self {
        Self::Expansion {
            playlist_url: playlist_url.into(),
            reason: reason.to_string(),
        }
    }
}
impl std::error::Error for Error {}
impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DirectoryName => write!(f, "Error generating application directory for your host system. Set GDOWNLOADER_CONFIG_DIR and GDOWNLOADER_DATA_DIR to choose them manually."),
            Error::EmptyUrl => write!(f, "No YouTube URL or playlist URL was provided"),
            Error::RunInProgress => write!(f, "A download is already running, cancel it before starting another"),
            Error::Expansion { playlist_url, reason } => write!(f, "Unable to list the videos of playlist {playlist_url} <{reason}>"),
            Error::StreamUnavailable(format) => write!(f, "No {} stream available", format.stream_description()),
            Error::Resolver(e) => write!(f, "{e}"),
            Error::Client(e) => write!(f, "Http client error <{e}>"),
            Error::Io(e) => write!(f, "Standard io error <{e}>"),
            Error::Join(e) => write!(f, "Join error <{e}>"),
            Error::TomlDeserialization(e) => write!(f, "Toml deserialization error:\n{e}"),
        }
    }
}
impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
impl From<JoinError> for Error {
    fn from(value: JoinError) -> Self {
        Error::Join(value)
    }
}
impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::TomlDeserialization(value)
    }
}
impl From<rusty_ytdl::VideoError> for Error {
    fn from(value: rusty_ytdl::VideoError) -> Self {
        Error::Resolver(value)
    }
}
impl From<rusty_ytdl::reqwest::Error> for Error {
    fn from(value: rusty_ytdl::reqwest::Error) -> Self {
        Error::Client(value)
    }
}
