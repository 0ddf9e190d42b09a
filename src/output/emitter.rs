/// Routes readings, summaries and diagnostics to their outputs
use log::{error, info, warn};
use std::io;
use time::UtcOffset;

use crate::models::{Reading, SummaryRecord};
use crate::output::snapshot::SnapshotWriter;
use crate::output::summary::{SummarySink, SYSLOG_TAG};
use crate::output::syslog::Severity;
use crate::serial::RawFrame;
use crate::telegram::ValidationError;

pub struct Emitter {
    snapshot: SnapshotWriter,
    summary: SummarySink,
    local_offset: UtcOffset,
}

impl Emitter {
    pub fn new(snapshot: SnapshotWriter, summary: SummarySink, local_offset: UtcOffset) -> Self {
        Emitter {
            snapshot,
            summary,
            local_offset,
        }
    }

    pub async fn snapshot(&self, reading: &Reading) -> io::Result<()> {
        self.snapshot.write(reading).await
    }

    pub async fn summary(&self, record: &SummaryRecord) -> io::Result<()> {
        info!(
            "Window closed: {} ({} samples)",
            record.values, record.samples
        );
        self.summary.emit(record, self.local_offset).await
    }

    /// Report a rejected frame to the diagnostic outputs
    ///
    /// Always logged; also forwarded to syslog when that is the summary sink.
    pub async fn rejected(&self, frame: &RawFrame, defects: ValidationError) -> io::Result<()> {
        let message = format!("Error {} reading sensordata: {}", defects, frame);
        warn!("{}", message);
        match self.summary.syslog() {
            Some(syslog) => {
                syslog
                    .send(Severity::Info, &format!("{}: {}", SYSLOG_TAG, message))
                    .await
            }
            None => Ok(()),
        }
    }

    /// Lifecycle notices such as startup and shutdown
    pub async fn notice(&self, severity: Severity, message: &str) -> io::Result<()> {
        match severity {
            Severity::Err => error!("{}", message),
            Severity::Info => info!("{}", message),
        }
        match self.summary.syslog() {
            Some(syslog) => syslog.send(severity, message).await,
            None => Ok(()),
        }
    }
}
