/// Utility functions for data processing and formatting
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for the summary log
///
/// Converts an OffsetDateTime to YYYY-MM-DD HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Integer average rounded half away from zero
///
/// Returns `None` for an empty sample set instead of dividing by zero.
pub fn rounded_average(sum: i64, count: u32) -> Option<i64> {
    if count == 0 {
        return None;
    }
    let count = i64::from(count);
    Some((2 * sum + sum.signum() * count) / (2 * count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(rounded_average(5, 2), Some(3));
        assert_eq!(rounded_average(-5, 2), Some(-3));
        assert_eq!(rounded_average(4, 3), Some(1));
        assert_eq!(rounded_average(-4, 3), Some(-1));
        assert_eq!(rounded_average(-1, 4), Some(0));
        assert_eq!(rounded_average(0, 7), Some(0));
    }

    #[test]
    fn empty_average_is_none() {
        assert_eq!(rounded_average(0, 0), None);
    }

    #[test]
    fn formats_summary_timestamp() {
        let dt = OffsetDateTime::from_unix_timestamp(1_207_242_200).unwrap();
        assert_eq!(format_datetime(&dt), "2008-04-03 17:03:20");
    }
}
