/// Rolling aggregation of accepted readings into interval summaries
use log::debug;
use time::{Duration, OffsetDateTime};

use crate::models::{Reading, SummaryRecord};
use crate::utils::rounded_average;

/// A summary closed within this share (percent) of the interval is stamped
/// with the interval boundary instead of the closing reading's time
const SNAP_PERCENT: i64 = 5;

/// Running sums and extremes for the current interval
///
/// The sensor sends no window markers, so a window closes when the phase
/// of the wall clock within the interval (`unix seconds mod interval`)
/// wraps around between two consecutive accepted readings. This assumes
/// readings arrive more often than once per interval and in time order; a
/// backwards clock step can close a window early. A gap of a full interval
/// or more since the previous reading closes the window as well, because
/// the wrap test alone misses it when the gap ends at a later phase.
#[derive(Debug, Clone)]
pub struct AggregationWindow {
    interval_secs: i64,
    samples: u32,
    temperature_sum: i64,
    sun_south_sum: i64,
    sun_west_sum: i64,
    sun_east_sum: i64,
    dawn_sum: i64,
    wind_max: u16,
    obscure_seen: bool,
    rain_seen: bool,
    previous_phase: Option<i64>,
    previous_time: Option<OffsetDateTime>,
}

impl AggregationWindow {
    pub fn new(interval_secs: u64) -> Self {
        AggregationWindow {
            interval_secs: i64::try_from(interval_secs).unwrap_or(i64::MAX).max(1),
            samples: 0,
            temperature_sum: 0,
            sun_south_sum: 0,
            sun_west_sum: 0,
            sun_east_sum: 0,
            dawn_sum: 0,
            wind_max: 0,
            obscure_seen: false,
            rain_seen: false,
            previous_phase: None,
            previous_time: None,
        }
    }

    /// Number of readings accumulated since the last close
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Position of `now` within the interval, in seconds
    pub fn phase(&self, now: OffsetDateTime) -> i64 {
        now.unix_timestamp().rem_euclid(self.interval_secs)
    }

    pub fn accumulate(&mut self, reading: &Reading) {
        self.temperature_sum += i64::from(reading.temperature_tenths);
        self.sun_south_sum += i64::from(reading.sun_south);
        self.sun_west_sum += i64::from(reading.sun_west);
        self.sun_east_sum += i64::from(reading.sun_east);
        self.dawn_sum += i64::from(reading.dawn);
        if reading.wind_tenths > self.wind_max {
            self.wind_max = reading.wind_tenths;
        }
        self.obscure_seen |= reading.obscure;
        self.rain_seen |= reading.rain;
        self.samples += 1;
    }

    /// Decide whether the reading taken at `now` closes the window
    ///
    /// The phase and time of `now` are remembered for the next call
    /// whatever the outcome. The first reading never closes a window.
    pub fn should_close(&mut self, now: OffsetDateTime) -> bool {
        let phase = self.phase(now);
        let wrapped = self.previous_phase.is_some_and(|previous| phase < previous);
        let stalled = self
            .previous_time
            .is_some_and(|previous| now - previous >= Duration::seconds(self.interval_secs));

        if stalled && !wrapped {
            debug!("No reading for a full interval, closing window");
        }

        self.previous_phase = Some(phase);
        self.previous_time = Some(now);
        wrapped || stalled
    }

    /// Turn the accumulated values into a summary and start a new window
    ///
    /// # Returns
    /// `None` when nothing was accumulated since the last close
    pub fn finalize(&mut self, now: OffsetDateTime) -> Option<SummaryRecord> {
        let samples = self.samples;
        let average = |sum: i64| rounded_average(sum, samples);

        // Averages stay inside the range of the individual readings
        let values = Reading {
            temperature_tenths: average(self.temperature_sum)? as i16,
            sun_south: average(self.sun_south_sum)? as u8,
            sun_west: average(self.sun_west_sum)? as u8,
            sun_east: average(self.sun_east_sum)? as u8,
            obscure: self.obscure_seen,
            dawn: average(self.dawn_sum)? as u16,
            wind_tenths: self.wind_max,
            rain: self.rain_seen,
        };

        let record = SummaryRecord {
            values,
            time: self.summary_time(now),
            samples,
        };
        self.reset();
        Some(record)
    }

    /// Accumulate a reading and close the window if it ends here
    ///
    /// The reading that crosses the boundary still counts towards the
    /// window it closes.
    pub fn push(&mut self, reading: &Reading, now: OffsetDateTime) -> Option<SummaryRecord> {
        self.accumulate(reading);
        if self.should_close(now) {
            self.finalize(now)
        } else {
            None
        }
    }

    fn summary_time(&self, now: OffsetDateTime) -> OffsetDateTime {
        let phase = self.phase(now);
        if phase * 100 <= self.interval_secs * SNAP_PERCENT {
            now.replace_nanosecond(0).unwrap_or(now) - Duration::seconds(phase)
        } else {
            now
        }
    }

    /// Clear accumulators, keeping the closure tracking state
    fn reset(&mut self) {
        *self = AggregationWindow {
            interval_secs: self.interval_secs,
            previous_phase: self.previous_phase,
            previous_time: self.previous_time,
            ..AggregationWindow::new(0)
        };
    }
}
