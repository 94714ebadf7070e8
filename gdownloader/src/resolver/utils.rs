use crate::Result;
use bytes::Bytes;
use rusty_ytdl::VideoError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const PARTIAL_FILE_SUFFIX: &str = ".part";
const FALLBACK_FILE_STEM: &str = "video";

/// Helper function to use rusty_ytdl::stream::Stream is if it were a
/// futures::Stream.
pub fn into_futures_stream(
    youtube_stream: Box<dyn rusty_ytdl::stream::Stream + Send + Sync>,
) -> impl futures::Stream<Item = Result<Bytes, VideoError>> + Send {
    // Second value of initialisation tuple represents if the previous iteration of
    // the stream errored. If so, stream will close, as no future iterations of
    // the stream are expected to return Ok.
    futures::stream::unfold((youtube_stream, false), |(state, err)| async move {
        if err {
            return None;
        };
        match state.chunk().await {
            // Return error value on this iteration, on the next iteration return None.
            Err(e) => Some((Err(e), (state, true))),
            Ok(Some(bytes)) => Some((Ok(bytes), (state, false))),
            // Stream has closed.
            Ok(None) => None,
        }
    })
}

/// Strip characters that are not allowed in file names on common platforms.
pub fn sanitize_file_name(title: &str) -> String {
    const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '%'];
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !FORBIDDEN.contains(c))
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();
    if cleaned.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn partial_path(target: &Path) -> PathBuf {
    let mut path = OsString::from(target.as_os_str());
    path.push(PARTIAL_FILE_SUFFIX);
    PathBuf::from(path)
}

/// `<stem>.<extension>` in `destination`, or `<stem> (n).<extension>` with
/// the lowest n not already taken, so a video never overwrites an earlier one
/// with the same title.
pub async fn available_path(destination: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    let wanted = destination.join(format!("{stem}.{extension}"));
    let mut candidate = wanted.clone();
    let mut n = 1;
    while tokio::fs::try_exists(&candidate).await? {
        candidate = destination.join(format!("{stem} ({n}).{extension}"));
        n += 1;
    }
    if candidate != wanted {
        info!(
            "{} already exists, saving to {} instead",
            wanted.display(),
            candidate.display()
        );
    }
    Ok(candidate)
}

/// A file that is being written to. Unless persisted, it is removed from disk
/// when dropped, so an interrupted transfer doesn't leave a truncated file
/// behind.
pub struct PartialFile {
    path: PathBuf,
    file: Option<fs_err::tokio::File>,
    persisted: bool,
}

impl PartialFile {
    pub async fn create(path: PathBuf) -> Result<Self> {
        let file = fs_err::tokio::File::create(path.clone()).await?;
        Ok(Self {
            path,
            file: Some(file),
            persisted: false,
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf).await?;
        }
        Ok(())
    }
    /// Flush and close the file, then move it to `target`.
    pub async fn persist(mut self, target: &Path) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        fs_err::tokio::rename(&self.path, target).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        drop(self.file.take());
        if let Err(e) = fs_err::remove_file(&self.path) {
            warn!("Unable to remove partial download: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{available_path, partial_path, sanitize_file_name, PartialFile};
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("AC/DC - Back In Black: \"Live\"?"),
            "ACDC - Back In Black Live"
        );
        assert_eq!(sanitize_file_name("  Trailing dots... "), "Trailing dots");
        assert_eq!(sanitize_file_name("Tab\tand\nnewline"), "Tabandnewline");
        assert_eq!(sanitize_file_name("???"), "video");
    }
    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("out/song.mp4")),
            Path::new("out/song.mp4.part")
        );
    }
    #[tokio::test]
    async fn test_available_path_avoids_existing_files() {
        let dir = tempdir().unwrap();
        let first = available_path(dir.path(), "Song", "mp4").await.unwrap();
        assert_eq!(first, dir.path().join("Song.mp4"));
        std::fs::write(&first, b"first").unwrap();
        let second = available_path(dir.path(), "Song", "mp4").await.unwrap();
        assert_eq!(second, dir.path().join("Song (1).mp4"));
        std::fs::write(&second, b"second").unwrap();
        let third = available_path(dir.path(), "Song", "mp4").await.unwrap();
        assert_eq!(third, dir.path().join("Song (2).mp4"));
        // Same title in another container doesn't collide.
        let audio = available_path(dir.path(), "Song", "webm").await.unwrap();
        assert_eq!(audio, dir.path().join("Song.webm"));
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
    }
    #[tokio::test]
    async fn test_persisted_file_is_moved() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp4");
        let mut file = PartialFile::create(partial_path(&target)).await.unwrap();
        file.write_all(b"some bytes").await.unwrap();
        file.persist(&target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"some bytes");
        assert!(!partial_path(&target).exists());
    }
    #[tokio::test]
    async fn test_dropped_file_is_removed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp4");
        let mut file = PartialFile::create(partial_path(&target)).await.unwrap();
        file.write_all(b"half a song").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
        assert!(!target.exists());
    }
}
