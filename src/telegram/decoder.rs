/// Field extraction and unit conversion for validated telegrams
use crate::models::Reading;
use crate::telegram::validator::{decimal_value, ValidTelegram};

// Field offsets within a telegram
const SIGN: usize = 1;
const TEMPERATURE: usize = 2;
const SUN_SOUTH: usize = 6;
const SUN_WEST: usize = 8;
const SUN_EAST: usize = 10;
const OBSCURITY: usize = 12;
const DAWN: usize = 13;
const WIND: usize = 16;
const RAIN: usize = 20;

impl ValidTelegram<'_> {
    /// Convert the telegram into physical values
    ///
    /// Validation already proved every field well-formed, so each field is
    /// read straight out of the frame. Fixed-point fields (`DD.D`) keep
    /// their implied decimal and come out as tenths.
    pub fn decode(&self) -> Reading {
        let field = |start: usize, len: usize| decimal_value(&self.bytes[start..start + len]);

        // At most 999 tenths and 99 for the sun pairs, so the casts are lossless
        let magnitude = field(TEMPERATURE, 4) as i16;
        let temperature_tenths = if self.bytes[SIGN] == b'-' {
            -magnitude
        } else {
            magnitude
        };

        Reading {
            temperature_tenths,
            sun_south: field(SUN_SOUTH, 2) as u8,
            sun_west: field(SUN_WEST, 2) as u8,
            sun_east: field(SUN_EAST, 2) as u8,
            obscure: self.bytes[OBSCURITY] == b'J',
            dawn: field(DAWN, 3) as u16,
            wind_tenths: field(WIND, 4) as u16,
            rain: self.bytes[RAIN] == b'J',
        }
    }
}
