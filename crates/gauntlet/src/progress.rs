//! Push-model progress reporting.
//!
//! Stages never poll anything; they push `(stage, percent, message)` updates
//! into a sink as work happens. The binary installs a logging sink; tests
//! install a recording one; `NullProgress` is for callers that don't care.

use crate::state_machine::FunnelStage;

pub trait ProgressSink: Send + Sync {
    /// `percent` is 0–100 within the named stage.
    fn update(&self, stage: FunnelStage, percent: u8, message: &str);
}

/// Discards all updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _stage: FunnelStage, _percent: u8, _message: &str) {}
}

/// Forwards updates to the log.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, stage: FunnelStage, percent: u8, message: &str) {
        tracing::info!(%stage, percent, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records updates for assertion.
    pub struct RecordingProgress {
        pub updates: Mutex<Vec<(FunnelStage, u8, String)>>,
    }

    impl RecordingProgress {
        pub fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressSink for RecordingProgress {
        fn update(&self, stage: FunnelStage, percent: u8, message: &str) {
            self.updates
                .lock()
                .unwrap()
                .push((stage, percent, message.to_string()));
        }
    }

    #[test]
    fn test_recording_sink_captures_updates() {
        let sink = RecordingProgress::new();
        sink.update(FunnelStage::PainResearch, 10, "searching");
        sink.update(FunnelStage::PainResearch, 80, "analyzing");

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].1, 10);
        assert_eq!(updates[1].2, "analyzing");
    }

    #[test]
    fn test_null_sink_accepts_updates() {
        NullProgress.update(FunnelStage::Survey, 100, "done");
    }
}
