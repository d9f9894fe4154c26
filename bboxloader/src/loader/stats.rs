//! Loader counters.

use std::fmt;

/// Snapshot of what a loader has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Settle events handled
    pub settle_events: u64,
    /// Planning passes that found new tiles
    pub plans: u64,
    /// Tiles marked as requested
    pub tiles_requested: u64,
    /// Fetches handed to the feature source
    pub fetches_issued: u64,
    /// Fetches that resolved with an error
    pub fetches_failed: u64,
    /// Features displayed or upgraded
    pub features_accepted: u64,
    /// Features ignored because a finer version is already displayed
    pub features_rejected: u64,
    /// Malformed features dropped under the skip policy
    pub features_skipped: u64,
    /// Batches aborted under the strict policy
    pub batches_aborted: u64,
}

impl fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "settles={} plans={} tiles={} fetches={} (failed {}) features: accepted={} rejected={} skipped={} aborted_batches={}",
            self.settle_events,
            self.plans,
            self.tiles_requested,
            self.fetches_issued,
            self.fetches_failed,
            self.features_accepted,
            self.features_rejected,
            self.features_skipped,
            self.batches_aborted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_summary() {
        let stats = LoaderStats {
            settle_events: 3,
            plans: 2,
            tiles_requested: 12,
            fetches_issued: 2,
            features_accepted: 5,
            ..Default::default()
        };

        let line = stats.to_string();
        assert!(line.starts_with("settles=3 plans=2 tiles=12 fetches=2 (failed 0)"));
        assert!(line.contains("accepted=5"));
    }
}
