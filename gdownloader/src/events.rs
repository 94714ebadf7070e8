use crate::core::send_or_error;
use std::fmt::Display;
use tokio::sync::mpsc;

// As this is a simple wrapper type we implement Copy for ease of handling
#[derive(Clone, PartialEq, Eq, Copy, Debug, Default, PartialOrd, Ord)]
pub struct Percentage(pub u8);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DownloadEvent {
    Progress(Percentage),
    Log(String),
}

/// Consumer of the events emitted during a run. Implementations must not
/// block, as progress is reported from inside the transfer loop.
pub trait EventSink: Send + Sync + 'static {
    fn send_event(&self, event: DownloadEvent);
    fn progress(&self, percentage: Percentage) {
        self.send_event(DownloadEvent::Progress(percentage))
    }
    fn log(&self, line: String) {
        self.send_event(DownloadEvent::Log(line))
    }
}

impl EventSink for mpsc::UnboundedSender<DownloadEvent> {
    fn send_event(&self, event: DownloadEvent) {
        send_or_error(self, event)
    }
}

/// floor(100 * (filesize - bytes_remaining) / filesize), or None if the
/// filesize is unknown.
pub fn progress_percentage(filesize: u64, bytes_remaining: u64) -> Option<Percentage> {
    if filesize == 0 {
        return None;
    }
    let downloaded = filesize.saturating_sub(bytes_remaining) as u128;
    let percentage = downloaded * 100 / filesize as u128;
    Some(Percentage(percentage.min(100) as u8))
}

/// Turns progress callbacks for a single stream into a non-decreasing sequence
/// of distinct percentages. The item's 0% is assumed to have been reported
/// already.
#[derive(Default)]
pub struct ProgressTracker {
    last: Percentage,
}

impl ProgressTracker {
    /// Returns a percentage only when it has advanced since the last one.
    pub fn update(&mut self, filesize: u64, bytes_remaining: u64) -> Option<Percentage> {
        let percentage = progress_percentage(filesize, bytes_remaining)?;
        if percentage <= self.last {
            return None;
        }
        self.last = percentage;
        Some(percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::{progress_percentage, DownloadEvent, EventSink, Percentage, ProgressTracker};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_progress_percentage_floor() {
        assert_eq!(progress_percentage(1000, 750), Some(Percentage(25)));
        assert_eq!(progress_percentage(1000, 0), Some(Percentage(100)));
        assert_eq!(progress_percentage(1000, 1000), Some(Percentage(0)));
        assert_eq!(progress_percentage(3, 2), Some(Percentage(33)));
        assert_eq!(progress_percentage(1000, 1), Some(Percentage(99)));
    }
    #[test]
    fn test_progress_percentage_out_of_range_inputs() {
        // More remaining than the total clamps to 0 rather than wrapping.
        assert_eq!(progress_percentage(1000, 5000), Some(Percentage(0)));
        assert_eq!(progress_percentage(u64::MAX, 0), Some(Percentage(100)));
        assert_eq!(progress_percentage(0, 0), None);
    }
    #[test]
    fn test_tracker_only_reports_advances() {
        let mut tracker = ProgressTracker::default();
        let reported: Vec<_> = [1000, 995, 750, 750, 800, 500, 0, 0]
            .into_iter()
            .filter_map(|remaining| tracker.update(1000, remaining))
            .collect();
        assert_eq!(
            reported,
            vec![Percentage(25), Percentage(50), Percentage(100)]
        );
    }
    #[test]
    fn test_tracker_unknown_filesize() {
        let mut tracker = ProgressTracker::default();
        assert_eq!(tracker.update(0, 0), None);
    }
    #[test]
    fn test_tracker_filesize_learned_mid_transfer() {
        let mut tracker = ProgressTracker::default();
        assert_eq!(tracker.update(0, 0), None);
        assert_eq!(tracker.update(400, 300), Some(Percentage(25)));
        assert_eq!(tracker.update(400, 0), Some(Percentage(100)));
    }
    #[test]
    fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.progress(Percentage(42));
        tx.log("hello".to_string());
        assert_eq!(rx.try_recv().unwrap(), DownloadEvent::Progress(Percentage(42)));
        assert_eq!(rx.try_recv().unwrap(), DownloadEvent::Log("hello".to_string()));
    }
    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage(7).to_string(), "7%");
    }
}
