use std::fmt;

use time::OffsetDateTime;

/// Physical values decoded from one accepted telegram
///
/// Temperature and wind are kept as fixed-point tenths so that summing
/// thousands of readings never drifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub temperature_tenths: i16,
    pub sun_south: u8,
    pub sun_west: u8,
    pub sun_east: u8,
    pub obscure: bool,
    pub dawn: u16,
    pub wind_tenths: u16,
    pub rain: bool,
}

impl Reading {
    /// Temperature in degrees celsius
    pub fn temperature(&self) -> f32 {
        f32::from(self.temperature_tenths) / 10.0
    }

    /// Wind speed in meters per second
    pub fn wind_speed(&self) -> f32 {
        f32::from(self.wind_tenths) / 10.0
    }

    pub fn obscure_flag(&self) -> char {
        if self.obscure {
            'O'
        } else {
            'o'
        }
    }

    pub fn rain_flag(&self) -> char {
        if self.rain {
            'R'
        } else {
            'r'
        }
    }
}

/// Writes a tenths value as `DD.D`, the way the sensor itself encodes it
fn write_tenths(f: &mut fmt::Formatter<'_>, tenths: u16) -> fmt::Result {
    write!(f, "{:02}.{}", tenths / 10, tenths % 10)
}

/// Compact one-line form, e.g. `t+07.6s01w63e00od999v01.2r`
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.temperature_tenths < 0 { '-' } else { '+' };
        write!(f, "t{}", sign)?;
        write_tenths(f, self.temperature_tenths.unsigned_abs())?;
        write!(
            f,
            "s{:02}w{:02}e{:02}{}d{:03}v",
            self.sun_south,
            self.sun_west,
            self.sun_east,
            self.obscure_flag(),
            self.dawn
        )?;
        write_tenths(f, self.wind_tenths)?;
        write!(f, "{}", self.rain_flag())
    }
}

/// Aggregated values of one closed window
///
/// `values` holds rounded averages for temperature, sun and dawn, the
/// maximum wind speed, and whether rain or darkness was seen at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub values: Reading,
    pub time: OffsetDateTime,
    pub samples: u32,
}
