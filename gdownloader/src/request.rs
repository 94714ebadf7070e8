use crate::error::Error;
use crate::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PLAYLIST_MARKER: &str = "playlist";

#[derive(ValueEnum, Copy, Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// Highest resolution stream containing both video and audio.
    #[default]
    Video,
    /// First audio-only stream.
    Audio,
}

impl DownloadFormat {
    /// Word used in log lines, e.g. "Downloaded audio (1/3): ...".
    pub fn noun(&self) -> &'static str {
        match self {
            DownloadFormat::Video => "video",
            DownloadFormat::Audio => "audio",
        }
    }
    pub fn stream_description(&self) -> &'static str {
        match self {
            DownloadFormat::Video => "video",
            DownloadFormat::Audio => "audio-only",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UrlKind {
    Single,
    Playlist,
}

/// Heuristic classification of a url: anything mentioning "playlist" (in any
/// case) is treated as a playlist.
pub fn classify(url: &str) -> UrlKind {
    if url.to_lowercase().contains(PLAYLIST_MARKER) {
        UrlKind::Playlist
    } else {
        UrlKind::Single
    }
}

/// A single request to download a video or playlist. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    url: String,
    destination: PathBuf,
    format: DownloadFormat,
}

impl DownloadRequest {
    pub fn new(
        url: impl AsRef<str>,
        destination: impl Into<PathBuf>,
        format: DownloadFormat,
    ) -> Result<Self> {
        let url = url.as_ref().trim();
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }
        Ok(Self {
            url: url.to_string(),
            destination: destination.into(),
            format,
        })
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn destination(&self) -> &Path {
        &self.destination
    }
    pub fn format(&self) -> DownloadFormat {
        self.format
    }
    pub fn url_kind(&self) -> UrlKind {
        classify(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, DownloadFormat, DownloadRequest, UrlKind};
    use crate::error::Error;

    #[test]
    fn test_classify_playlist_urls() {
        let urls = [
            "https://www.youtube.com/playlist?list=PL590L5WQmH8fJ54F369BLDSqIwcs-TCfs",
            "https://www.youtube.com/PLAYLIST?list=abc",
            "youtube.com/PlayList?list=abc",
        ];
        for url in urls {
            assert_eq!(classify(url), UrlKind::Playlist, "{url}");
        }
    }
    #[test]
    fn test_classify_single_urls() {
        let urls = [
            "https://www.youtube.com/watch?v=lYBUbBu4W08",
            "https://youtu.be/lYBUbBu4W08",
            "https://www.youtube.com/watch?v=lYBUbBu4W08&list=RDlYBUbBu4W08",
            "",
        ];
        for url in urls {
            assert_eq!(classify(url), UrlKind::Single, "{url}");
        }
    }
    #[test]
    fn test_request_trims_url() {
        let request =
            DownloadRequest::new("  https://youtu.be/abc \n", "out", DownloadFormat::Audio)
                .unwrap();
        assert_eq!(request.url(), "https://youtu.be/abc");
        assert_eq!(request.url_kind(), UrlKind::Single);
        assert_eq!(request.format(), DownloadFormat::Audio);
    }
    #[test]
    fn test_request_rejects_empty_url() {
        let request = DownloadRequest::new(" \t\n", "out", DownloadFormat::Video);
        assert!(matches!(request, Err(Error::EmptyUrl)));
    }
}
