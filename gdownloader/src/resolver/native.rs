use super::utils::{
    available_path, into_futures_stream, partial_path, sanitize_file_name, PartialFile,
};
use super::{MediaStream, Resolver, VideoHandle};
use crate::error::Error;
use crate::Result;
use futures::StreamExt;
use rusty_ytdl::search::{Playlist, PlaylistSearchOptions};
use rusty_ytdl::{
    DownloadOptions, RequestOptions, Video, VideoFormat, VideoOptions, VideoQuality,
    VideoSearchOptions,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolver backed by rusty_ytdl, talking to YouTube directly.
pub struct NativeResolver {
    options: VideoOptions,
}

impl NativeResolver {
    /// `dl_chunk_size` controls how often a transfer reports progress.
    pub fn new(dl_chunk_size: u64) -> Result<Self> {
        let client = rusty_ytdl::reqwest::Client::builder()
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            options: VideoOptions {
                quality: VideoQuality::Highest,
                filter: VideoSearchOptions::VideoAudio,
                download_options: DownloadOptions {
                    dl_chunk_size: Some(dl_chunk_size),
                },
                request_options: RequestOptions {
                    client: Some(client),
                    ..Default::default()
                },
            },
        })
    }
}

impl Resolver for NativeResolver {
    type Video = NativeVideo;
    fn expand_playlist(
        &self,
        playlist_url: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        let playlist_url = playlist_url.to_string();
        let options = PlaylistSearchOptions {
            limit: u64::MAX,
            request_options: Some(self.options.request_options.clone()),
            fetch_all: true,
        };
        async move {
            let playlist = Playlist::get(&playlist_url, Some(&options))
                .await
                .map_err(|e| Error::new_expansion_error(&playlist_url, e))?;
            info!(
                "Expanded playlist {playlist_url} to {} videos",
                playlist.videos.len()
            );
            Ok(playlist.videos.into_iter().map(|video| video.url).collect())
        }
    }
    fn open_video(&self, url: &str) -> impl Future<Output = Result<NativeVideo>> + Send {
        let url = url.to_string();
        let options = self.options.clone();
        async move {
            let video = Video::new_with_options(&url, options.clone())?;
            let info = video.get_info().await?;
            debug!("Found {} formats for {url}", info.formats.len());
            Ok(NativeVideo {
                url,
                title: info.video_details.title,
                formats: info.formats,
                options,
            })
        }
    }
}

pub struct NativeVideo {
    url: String,
    title: String,
    formats: Vec<VideoFormat>,
    options: VideoOptions,
}

impl NativeVideo {
    fn stream_for(&self, format: &VideoFormat) -> NativeStream {
        NativeStream {
            url: self.url.clone(),
            title: self.title.clone(),
            format: format.clone(),
            options: self.options.clone(),
        }
    }
    fn select_with(&self, select: fn(&[StreamTraits]) -> Option<usize>) -> Option<NativeStream> {
        let traits: Vec<StreamTraits> = self.formats.iter().map(StreamTraits::from).collect();
        select(&traits)
            .and_then(|index| self.formats.get(index))
            .map(|format| self.stream_for(format))
    }
}

impl VideoHandle for NativeVideo {
    type Stream = NativeStream;
    fn title(&self) -> &str {
        &self.title
    }
    fn select_audio_only_stream(&self) -> Option<NativeStream> {
        self.select_with(first_audio_only)
    }
    fn select_highest_resolution_stream(&self) -> Option<NativeStream> {
        self.select_with(highest_resolution)
    }
}

/// The parts of a format that stream selection looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StreamTraits {
    has_audio: bool,
    has_video: bool,
    height: u64,
    bitrate: u64,
}

impl From<&VideoFormat> for StreamTraits {
    fn from(format: &VideoFormat) -> Self {
        Self {
            has_audio: format.has_audio,
            has_video: format.has_video,
            height: format.height.unwrap_or_default(),
            bitrate: format.bitrate,
        }
    }
}

/// Index of the first stream with audio and no video, in backend order.
fn first_audio_only(formats: &[StreamTraits]) -> Option<usize> {
    formats
        .iter()
        .position(|format| format.has_audio && !format.has_video)
}

/// Index of the tallest stream carrying both video and audio, higher bitrate
/// breaking ties.
fn highest_resolution(formats: &[StreamTraits]) -> Option<usize> {
    formats
        .iter()
        .enumerate()
        .filter(|(_, format)| format.has_audio && format.has_video)
        .max_by_key(|(_, format)| (format.height, format.bitrate))
        .map(|(index, _)| index)
}

pub struct NativeStream {
    url: String,
    title: String,
    format: VideoFormat,
    options: VideoOptions,
}

impl MediaStream for NativeStream {
    fn filesize(&self) -> u64 {
        self.format
            .content_length
            .as_deref()
            .and_then(|len| len.parse().ok())
            .unwrap_or_default()
    }
    fn download<F>(
        self,
        destination: &Path,
        mut on_progress: F,
    ) -> impl Future<Output = Result<PathBuf>> + Send
    where
        F: FnMut(u64, u64) + Send,
    {
        let destination = destination.to_path_buf();
        async move {
            fs_err::tokio::create_dir_all(&destination).await?;
            let target = available_path(
                &destination,
                &sanitize_file_name(&self.title),
                &self.format.mime_type.container,
            )
            .await?;
            let metadata_filesize = self.filesize();
            let itag = self.format.itag;
            // Pin rusty_ytdl to exactly the format that was selected.
            let options = VideoOptions {
                filter: VideoSearchOptions::Custom(Arc::new(move |format: &VideoFormat| {
                    format.itag == itag
                })),
                ..self.options
            };
            let video = Video::new_with_options(&self.url, options)?;
            let stream = video.stream().await?;
            let filesize = match metadata_filesize {
                0 => stream.content_length() as u64,
                known => known,
            };
            let mut remaining = filesize;
            let mut file = PartialFile::create(partial_path(&target)).await?;
            info!("Downloading {} to {}", self.url, file.path().display());
            let chunks = into_futures_stream(stream);
            futures::pin_mut!(chunks);
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                remaining = remaining.saturating_sub(chunk.len() as u64);
                on_progress(filesize, remaining);
            }
            file.persist(&target).await?;
            Ok(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{first_audio_only, highest_resolution, StreamTraits};
    use pretty_assertions::assert_eq;

    fn progressive(height: u64, bitrate: u64) -> StreamTraits {
        StreamTraits {
            has_audio: true,
            has_video: true,
            height,
            bitrate,
        }
    }
    fn audio_only(bitrate: u64) -> StreamTraits {
        StreamTraits {
            has_audio: true,
            bitrate,
            ..Default::default()
        }
    }
    fn video_only(height: u64) -> StreamTraits {
        StreamTraits {
            has_video: true,
            height,
            bitrate: 5_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_audio_only_keeps_backend_order() {
        let formats = [progressive(360, 500_000), audio_only(48_000), audio_only(160_000)];
        assert_eq!(first_audio_only(&formats), Some(1));
    }
    #[test]
    fn test_no_audio_only_stream() {
        let formats = [progressive(720, 1_000_000), video_only(1080)];
        assert_eq!(first_audio_only(&formats), None);
    }
    #[test]
    fn test_highest_resolution_prefers_height() {
        let formats = [
            progressive(360, 900_000),
            progressive(720, 500_000),
            progressive(480, 800_000),
        ];
        assert_eq!(highest_resolution(&formats), Some(1));
    }
    #[test]
    fn test_highest_resolution_bitrate_breaks_ties() {
        let formats = [progressive(720, 500_000), progressive(720, 700_000)];
        assert_eq!(highest_resolution(&formats), Some(1));
        let formats = [progressive(720, 700_000), progressive(720, 500_000)];
        assert_eq!(highest_resolution(&formats), Some(0));
    }
    #[test]
    fn test_highest_resolution_ignores_adaptive_streams() {
        // Taller video-only and richer audio-only streams are never picked.
        let formats = [video_only(2160), audio_only(320_000), progressive(360, 400_000)];
        assert_eq!(highest_resolution(&formats), Some(2));
        let formats = [video_only(2160), audio_only(320_000)];
        assert_eq!(highest_resolution(&formats), None);
    }
}
