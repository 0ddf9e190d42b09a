/// Latest-reading snapshot file for pickup by other programs
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use crate::models::Reading;

/// Render the snapshot: compact line first, then one labelled line per value
pub fn render_snapshot(reading: &Reading) -> String {
    format!(
        "{}\n\
         Temperature : {:+.1}\n\
         Sun South   : {}\n\
         Sun West    : {}\n\
         Sun East    : {}\n\
         Obscure     : {}\n\
         Dawn        : {}\n\
         Wind        : {:.1}\n\
         Rain        : {}\n",
        reading,
        reading.temperature(),
        reading.sun_south,
        reading.sun_west,
        reading.sun_east,
        reading.obscure_flag(),
        reading.dawn,
        reading.wind_speed(),
        reading.rain_flag(),
    )
}

/// Overwrites one well-known file with every accepted reading
///
/// The content is written to a sibling staging file and renamed into
/// place, so readers see either the previous or the new snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    staging: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging_name = path.file_name().map(OsString::from).unwrap_or_default();
        staging_name.push(".tmp");
        let staging = path.with_file_name(staging_name);
        SnapshotWriter { path, staging }
    }

    pub async fn write(&self, reading: &Reading) -> io::Result<()> {
        tokio::fs::write(&self.staging, render_snapshot(reading)).await?;
        tokio::fs::rename(&self.staging, &self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reading() -> Reading {
        Reading {
            temperature_tenths: 76,
            sun_south: 1,
            sun_west: 63,
            sun_east: 0,
            obscure: false,
            dawn: 999,
            wind_tenths: 12,
            rain: false,
        }
    }

    #[test]
    fn renders_compact_and_labelled_lines() {
        let expected = "t+07.6s01w63e00od999v01.2r\n\
                        Temperature : +7.6\n\
                        Sun South   : 1\n\
                        Sun West    : 63\n\
                        Sun East    : 0\n\
                        Obscure     : o\n\
                        Dawn        : 999\n\
                        Wind        : 1.2\n\
                        Rain        : r\n";
        assert_eq!(render_snapshot(&reading()), expected);
    }

    #[tokio::test]
    async fn overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("eltakoms-ttyS1"));

        writer.write(&reading()).await.unwrap();
        let colder = Reading {
            temperature_tenths: -41,
            rain: true,
            ..reading()
        };
        writer.write(&colder).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("eltakoms-ttyS1")).unwrap();
        assert!(content.starts_with("t-04.1s01w63e00od999v01.2R\n"));
        assert!(content.contains("Temperature : -4.1\n"));
        assert_eq!(content.lines().count(), 9);
        assert!(!dir.path().join("eltakoms-ttyS1.tmp").exists());
    }
}
