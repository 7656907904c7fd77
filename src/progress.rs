//! Progress reporting between the organize worker and its front end

use crate::engine::RunSummary;
use serde::Serialize;
use std::sync::mpsc::Sender;

/// One progress update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Index of the last attempted file (1-based), 0 before any file
    pub current: usize,
    /// Number of candidates found by the scan
    pub total: usize,
    /// Human-readable description
    pub message: String,
}

impl ProgressEvent {
    pub fn new(current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
        }
    }

    /// Completion ratio in `0.0..=1.0`
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Consumer of progress events, implemented by the presentation layer
pub trait ProgressSink {
    fn on_progress(&mut self, event: ProgressEvent);
}

/// Everything a background run sends to its front end, in order
#[derive(Debug, Clone)]
pub enum RunEvent {
    Progress(ProgressEvent),
    /// Always the last event of a run
    Finished(RunSummary),
}

/// Forwards progress over a channel; a dropped receiver is ignored
impl ProgressSink for Sender<RunEvent> {
    fn on_progress(&mut self, event: ProgressEvent) {
        let _ = self.send(RunEvent::Progress(event));
    }
}

/// Collects events in memory
impl ProgressSink for Vec<ProgressEvent> {
    fn on_progress(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}
