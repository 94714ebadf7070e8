//! The capability the orchestrator downloads through: turning urls into
//! videos, picking a stream, and transferring it to disk.
use crate::Result;
use std::future::Future;
use std::path::{Path, PathBuf};

pub mod native;
mod utils;

pub use native::NativeResolver;

pub trait Resolver: Send + Sync + 'static {
    type Video: VideoHandle;
    /// Ordered video urls of a playlist, as provided by the backend.
    fn expand_playlist(&self, playlist_url: &str)
        -> impl Future<Output = Result<Vec<String>>> + Send;
    fn open_video(&self, url: &str) -> impl Future<Output = Result<Self::Video>> + Send;
}

pub trait VideoHandle: Send + Sync {
    type Stream: MediaStream;
    fn title(&self) -> &str;
    /// The first stream that carries audio and no video, if any.
    fn select_audio_only_stream(&self) -> Option<Self::Stream>;
    /// The highest resolution stream carrying both video and audio. None only
    /// if the video has no such stream at all.
    fn select_highest_resolution_stream(&self) -> Option<Self::Stream>;
}

pub trait MediaStream: Send {
    /// Size in bytes as known from the stream's metadata. 0 if the metadata
    /// doesn't say.
    fn filesize(&self) -> u64;
    /// Download into the `destination` directory, calling
    /// `on_progress(filesize, bytes_remaining)` after every chunk. The
    /// filesize passed is the one the transfer resolved, which may be known
    /// even when `filesize()` returned 0. Returns the path of the written file.
    fn download<F>(
        self,
        destination: &Path,
        on_progress: F,
    ) -> impl Future<Output = Result<PathBuf>> + Send
    where
        F: FnMut(u64, u64) + Send;
}
