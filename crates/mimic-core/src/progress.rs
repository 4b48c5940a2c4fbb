//! Progress reporting for long-running analysis.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// 0–100, never decreasing within a run
    pub percent: u8,
    pub status: String,
    pub seconds_remaining: Option<u64>,
}

/// Callback invoked at every state boundary.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Wraps an optional callback and keeps reported percentages monotonic.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callback: Option<ProgressCallback>,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last_percent: 0,
        }
    }

    /// Emits an update. Values below the last report are raised to it and
    /// values above 100 are capped.
    pub fn report(
        &mut self,
        percent: u8,
        status: impl Into<String>,
        remaining: Option<Duration>,
    ) {
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        if let Some(callback) = &self.callback {
            callback(ProgressUpdate {
                percent,
                status: status.into(),
                seconds_remaining: remaining.map(|d| d.as_secs()),
            });
        }
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("has_callback", &self.callback.is_some())
            .field("last_percent", &self.last_percent)
            .finish()
    }
}
