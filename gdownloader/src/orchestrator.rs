//! Turns a single DownloadRequest into a sequence of item downloads, running
//! on its own task and reporting to an EventSink.
use crate::core::oneshot_send_or_debug;
use crate::error::Error;
use crate::events::{EventSink, Percentage, ProgressTracker};
use crate::request::{DownloadFormat, DownloadRequest, UrlKind};
use crate::resolver::{MediaStream, Resolver, VideoHandle};
use crate::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What to do when one item of a playlist fails.
#[derive(ValueEnum, Copy, Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemFailurePolicy {
    /// Report the error and stop the run.
    #[default]
    Abort,
    /// Report the error and carry on with the next item.
    Skip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        total: usize,
        downloaded: usize,
        failed: usize,
    },
    Aborted {
        total: usize,
        downloaded: usize,
    },
    Cancelled,
}

pub struct KillRequest;

/// Handle to a run in progress.
pub struct RunHandle {
    kill: Option<oneshot::Sender<KillRequest>>,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Ask the run to stop. It stops at its next await point, which is at the
    /// latest after the chunk currently being received.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.kill.take() {
            oneshot_send_or_debug(tx, KillRequest);
        }
    }
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
    pub async fn wait(self) -> Result<RunOutcome> {
        Ok(self.join.await?)
    }
}

/// Marks the orchestrator busy for as long as it is alive.
struct ActiveRun(Arc<AtomicBool>);

impl ActiveRun {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::RunInProgress)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug)]
struct ItemPosition {
    index: usize,
    total: usize,
}

pub struct Orchestrator<R> {
    resolver: Arc<R>,
    policy: ItemFailurePolicy,
    active: Arc<AtomicBool>,
}

impl<R: Resolver> Orchestrator<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver: Arc::new(resolver),
            policy: ItemFailurePolicy::default(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }
    pub fn with_failure_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.policy = policy;
        self
    }
    /// Start a run on a new task. Only one run may be active at a time; a
    /// second call before the first has finished returns
    /// Error::RunInProgress.
    /// # Panics
    /// If called outside of a Tokio runtime.
    pub fn run<S: EventSink>(&self, request: DownloadRequest, sink: S) -> Result<RunHandle> {
        let active = ActiveRun::acquire(&self.active)?;
        let (kill_tx, mut kill_rx) = oneshot::channel();
        let resolver = self.resolver.clone();
        let policy = self.policy;
        let join = tokio::spawn(async move {
            let _active = active;
            info!("Starting run for {}", request.url());
            tokio::select! {
                outcome = run_request(resolver.as_ref(), &request, &sink, policy) => outcome,
                Ok(KillRequest) = &mut kill_rx => {
                    warn!("Run for {} cancelled by caller", request.url());
                    sink.log("Download cancelled".to_string());
                    RunOutcome::Cancelled
                }
            }
        });
        Ok(RunHandle {
            kill: Some(kill_tx),
            join,
        })
    }
}

async fn run_request<R: Resolver, S: EventSink>(
    resolver: &R,
    request: &DownloadRequest,
    sink: &S,
    policy: ItemFailurePolicy,
) -> RunOutcome {
    let urls = match request.url_kind() {
        UrlKind::Playlist => match resolver.expand_playlist(request.url()).await {
            Ok(urls) => {
                sink.log(format!("Total videos in playlist: {}", urls.len()));
                urls
            }
            Err(e) => {
                report_error(sink, request.url(), &e);
                return RunOutcome::Aborted {
                    total: 0,
                    downloaded: 0,
                };
            }
        },
        UrlKind::Single => vec![request.url().to_string()],
    };
    let total = urls.len();
    let mut downloaded = 0;
    let mut failed = 0;
    for (index, url) in urls.iter().enumerate() {
        let position = ItemPosition {
            index: index + 1,
            total,
        };
        match download_item(resolver, request, url, position, sink).await {
            Ok(path) => {
                info!("Saved {url} to {}", path.display());
                downloaded += 1;
            }
            Err(e) => match policy {
                ItemFailurePolicy::Abort => {
                    report_error(sink, request.url(), &e);
                    return RunOutcome::Aborted { total, downloaded };
                }
                ItemFailurePolicy::Skip => {
                    report_error(sink, url, &e);
                    failed += 1;
                }
            },
        }
    }
    info!("Run finished, {downloaded}/{total} downloaded");
    RunOutcome::Completed {
        total,
        downloaded,
        failed,
    }
}

async fn download_item<R: Resolver, S: EventSink>(
    resolver: &R,
    request: &DownloadRequest,
    url: &str,
    position: ItemPosition,
    sink: &S,
) -> Result<PathBuf> {
    sink.progress(Percentage(0));
    let video = resolver.open_video(url).await?;
    let format = request.format();
    let stream = match format {
        DownloadFormat::Audio => video.select_audio_only_stream(),
        DownloadFormat::Video => video.select_highest_resolution_stream(),
    }
    .ok_or(Error::StreamUnavailable(format))?;
    debug!(
        "Selected {} stream for {url}, {} bytes according to metadata",
        format.noun(),
        stream.filesize()
    );
    let mut tracker = ProgressTracker::default();
    let path = stream
        .download(request.destination(), |filesize, bytes_remaining| {
            if let Some(percentage) = tracker.update(filesize, bytes_remaining) {
                debug!("{url}: {percentage}");
                sink.progress(percentage);
            }
        })
        .await?;
    sink.log(format!(
        "Downloaded {} ({}/{}): {}",
        format.noun(),
        position.index,
        position.total,
        video.title()
    ));
    Ok(path)
}

fn report_error<S: EventSink>(sink: &S, url: &str, e: &Error) {
    error!("Error downloading {url}: {e}");
    sink.log(format!("Error downloading {url}: {e}"));
}
