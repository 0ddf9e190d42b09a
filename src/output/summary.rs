/// Destinations for closed-window summaries
use std::io;
use std::path::PathBuf;
use time::UtcOffset;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::models::SummaryRecord;
use crate::output::syslog::{Severity, Syslog};
use crate::utils::format_datetime;

/// Tag in front of every message this program sends to syslog
pub const SYSLOG_TAG: &str = "ELTAKO-MS";

/// Where summaries go: appended to a log file, or sent to syslog
#[derive(Debug)]
pub enum SummarySink {
    File(PathBuf),
    Syslog(Syslog),
}

impl SummarySink {
    /// Open a log file sink, checking up front that it can be appended to
    pub async fn log_file(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(SummarySink::File(path))
    }

    /// Format one summary the way this sink records it
    ///
    /// The file sink prefixes the local time of the record; syslog adds
    /// its own timestamp and gets the tagged compact line only.
    pub fn render(&self, record: &SummaryRecord, local_offset: UtcOffset) -> String {
        match self {
            SummarySink::File(_) => format!(
                "{} {}\n",
                format_datetime(&record.time.to_offset(local_offset)),
                record.values
            ),
            SummarySink::Syslog(_) => format!("{}: {}", SYSLOG_TAG, record.values),
        }
    }

    pub async fn emit(&self, record: &SummaryRecord, local_offset: UtcOffset) -> io::Result<()> {
        let line = self.render(record, local_offset);
        match self {
            SummarySink::File(path) => {
                let mut file = OpenOptions::new().append(true).open(path).await?;
                file.write_all(line.as_bytes()).await?;
                file.flush().await
            }
            SummarySink::Syslog(syslog) => syslog.send(Severity::Info, &line).await,
        }
    }

    /// The syslog connection, when summaries go to syslog
    pub fn syslog(&self) -> Option<&Syslog> {
        match self {
            SummarySink::Syslog(syslog) => Some(syslog),
            SummarySink::File(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use tempfile::tempdir;
    use time::OffsetDateTime;

    fn record() -> SummaryRecord {
        SummaryRecord {
            values: Reading {
                temperature_tenths: 76,
                sun_south: 1,
                sun_west: 63,
                sun_east: 0,
                obscure: false,
                dawn: 999,
                wind_tenths: 12,
                rain: false,
            },
            time: OffsetDateTime::from_unix_timestamp(1_207_242_200).unwrap(),
            samples: 60,
        }
    }

    #[tokio::test]
    async fn file_sink_appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eltakoms-ttyS1.log");
        let sink = SummarySink::log_file(&path).await.unwrap();

        sink.emit(&record(), UtcOffset::UTC).await.unwrap();
        sink.emit(&record(), UtcOffset::UTC).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "2008-04-03 17:03:20 t+07.6s01w63e00od999v01.2r\n\
             2008-04-03 17:03:20 t+07.6s01w63e00od999v01.2r\n"
        );
    }

    #[tokio::test]
    async fn file_sink_uses_local_offset() {
        let dir = tempdir().unwrap();
        let sink = SummarySink::log_file(dir.path().join("x.log")).await.unwrap();
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();
        assert!(sink.render(&record(), offset).starts_with("2008-04-03 19:03:20 "));
    }

    #[tokio::test]
    async fn missing_log_directory_fails_at_open() {
        let dir = tempdir().unwrap();
        let result = SummarySink::log_file(dir.path().join("missing/dir/x.log")).await;
        assert!(result.is_err());
    }
}
