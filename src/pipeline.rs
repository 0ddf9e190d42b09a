/// Per-telegram processing: validate, decode, snapshot, aggregate, summarize
use log::{debug, error};
use time::OffsetDateTime;

use crate::aggregation::AggregationWindow;
use crate::models::{Reading, SummaryRecord};
use crate::output::Emitter;
use crate::serial::RawFrame;
use crate::telegram::{validate, ValidationError};

/// What happened to one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rejected(ValidationError),
    Accepted(Reading),
    Closed(Reading, SummaryRecord),
}

pub struct Pipeline {
    window: AggregationWindow,
    emitter: Emitter,
}

impl Pipeline {
    pub fn new(window: AggregationWindow, emitter: Emitter) -> Self {
        Pipeline { window, emitter }
    }

    /// Readings in the open window, discarded if the program stops now
    pub fn pending_samples(&self) -> u32 {
        self.window.samples()
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Run one frame through the whole chain
    ///
    /// Rejected frames are reported and leave the window untouched,
    /// including its closure tracking. Output failures are logged and
    /// never stop the pipeline.
    pub async fn process(&mut self, frame: &RawFrame, now: OffsetDateTime) -> Outcome {
        let reading = match validate(frame) {
            Ok(telegram) => telegram.decode(),
            Err(defects) => {
                if let Err(e) = self.emitter.rejected(frame, defects).await {
                    error!("Failed to report rejected frame: {}", e);
                }
                return Outcome::Rejected(defects);
            }
        };
        debug!("Accepted reading {}", reading);

        if let Err(e) = self.emitter.snapshot(&reading).await {
            error!("Failed to write snapshot: {}", e);
        }

        match self.window.push(&reading, now) {
            Some(summary) => {
                if let Err(e) = self.emitter.summary(&summary).await {
                    error!("Failed to emit summary: {}", e);
                }
                Outcome::Closed(reading, summary)
            }
            None => Outcome::Accepted(reading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{SnapshotWriter, SummarySink};
    use tempfile::{tempdir, TempDir};
    use time::UtcOffset;

    const START: i64 = 1_700_000_040;
    const GOOD: &[u8] = b"W+07.6016300N99901.2N?151515151515?1889\x03";
    const BAD_CHECKSUM: &[u8] = b"W+07.6016300N99901.2N?151515151515?0000\x03";

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    async fn pipeline(dir: &TempDir) -> Pipeline {
        let snapshot = SnapshotWriter::new(dir.path().join("eltakoms-ttyS1"));
        let summary = SummarySink::log_file(dir.path().join("eltakoms-ttyS1.log"))
            .await
            .unwrap();
        Pipeline::new(
            AggregationWindow::new(60),
            Emitter::new(snapshot, summary, UtcOffset::UTC),
        )
    }

    #[tokio::test]
    async fn accepted_frame_updates_snapshot() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline(&dir).await;

        let outcome = pipeline.process(&RawFrame::from(GOOD), at(START)).await;
        assert!(matches!(outcome, Outcome::Accepted(r) if r.wind_tenths == 12));
        assert_eq!(pipeline.pending_samples(), 1);

        let snapshot = std::fs::read_to_string(dir.path().join("eltakoms-ttyS1")).unwrap();
        assert!(snapshot.starts_with("t+07.6s01w63e00od999v01.2r\n"));
    }

    #[tokio::test]
    async fn rejected_frame_touches_no_output() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline(&dir).await;

        let outcome = pipeline
            .process(&RawFrame::from(BAD_CHECKSUM), at(START))
            .await;
        assert_eq!(outcome, Outcome::Rejected(ValidationError::CHECKSUM));
        assert_eq!(pipeline.pending_samples(), 0);
        assert!(!dir.path().join("eltakoms-ttyS1").exists());

        let log = std::fs::read_to_string(dir.path().join("eltakoms-ttyS1.log")).unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn counter_tracks_only_accepted_frames() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline(&dir).await;

        let mut accepted = 0;
        for i in 0..50 {
            let frame = if i % 3 == 0 { BAD_CHECKSUM } else { GOOD };
            let outcome = pipeline.process(&RawFrame::from(frame), at(START + i)).await;
            if !matches!(outcome, Outcome::Rejected(_)) {
                accepted += 1;
            }
            assert_eq!(pipeline.pending_samples(), accepted);
        }
    }

    #[tokio::test]
    async fn rejected_frames_do_not_advance_window_phase() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline(&dir).await;

        pipeline.process(&RawFrame::from(GOOD), at(START + 50)).await;
        // A rejected frame past the boundary must not consume the wrap
        pipeline
            .process(&RawFrame::from(BAD_CHECKSUM), at(START + 61))
            .await;
        let outcome = pipeline.process(&RawFrame::from(GOOD), at(START + 62)).await;

        match outcome {
            Outcome::Closed(_, summary) => assert_eq!(summary.samples, 2),
            other => panic!("expected window to close, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn closed_windows_are_appended_to_log() {
        let dir = tempdir().unwrap();
        let mut pipeline = pipeline(&dir).await;

        let mut closes = 0;
        for i in 0..125 {
            let outcome = pipeline.process(&RawFrame::from(GOOD), at(START + i)).await;
            if matches!(outcome, Outcome::Closed(..)) {
                closes += 1;
            }
        }
        assert_eq!(closes, 2);

        let log = std::fs::read_to_string(dir.path().join("eltakoms-ttyS1.log")).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines
            .iter()
            .all(|line| line.ends_with(" t+07.6s01w63e00od999v01.2r")));
    }
}
