//! Conversion of the packed base peak fields of a scan record into physical
//! mass and intensity values.
//!
//! Each [`DataFormat`] has exactly one intensity formula and one mass formula.
//! None of them can fail, an unrecognized format unpacks to zero.
use crate::bits::{extract, mask};

use super::constants::DataFormat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The exponent below which the high accuracy calibrated format's index
/// records need [`INDEX_EXPONENT_CORRECTION`] added
const INDEX_EXPONENT_THRESHOLD: u32 = 6;
const INDEX_EXPONENT_CORRECTION: u32 = 8;

/// `4^exponent` as a float
#[inline]
fn pow4(exponent: u32) -> f64 {
    (1u64 << (2 * exponent)) as f64
}

/// A scaled 8 bit magnitude, bits 3-10 times `4^(bits 0-2)`
#[inline]
fn small_magnitude(word: u32) -> f64 {
    extract(word, 3, 10) as f64 * pow4(extract(word, 0, 2))
}

/// Unpack a base peak intensity from the 16 bit packed intensity field and
/// the 32 bit packed base peak word of a scan record.
///
/// Formats whose records carry no separate intensity field should pass `0`
/// for `packed_intensity`.
pub fn unpack_intensity(packed_intensity: i16, packed_info: u32, format: DataFormat) -> f64 {
    match format {
        DataFormat::HighAccuracyCalibrated
        | DataFormat::SingleFloat
        | DataFormat::EnhancedUncalibrated
        | DataFormat::EnhancedCalibrated
        | DataFormat::MolecularWeight => {
            packed_intensity as f64 * pow4(packed_info & mask(0, 3))
        }
        DataFormat::Compressed => small_magnitude(packed_info),
        DataFormat::Standard
        | DataFormat::SIROrMRM
        | DataFormat::ScanningContinuum
        | DataFormat::MCA
        | DataFormat::MCAWithSD
        | DataFormat::MCB
        | DataFormat::MCBWithSD => small_magnitude(packed_intensity as u16 as u32),
        DataFormat::Other(_) => 0.0,
    }
}

/// Unpack a base peak mass from the 32 bit packed base peak word.
///
/// `index_context` is set when the word was read from a scan index file, which
/// stores a truncated exponent for [`DataFormat::HighAccuracyCalibrated`].
pub fn unpack_mass(packed_info: u32, format: DataFormat, index_context: bool) -> f64 {
    match format {
        DataFormat::HighAccuracyCalibrated
        | DataFormat::SingleFloat
        | DataFormat::EnhancedUncalibrated
        | DataFormat::EnhancedCalibrated => {
            let mantissa = packed_info >> 9;
            let mut exponent = extract(packed_info, 4, 8);
            if index_context
                && exponent < INDEX_EXPONENT_THRESHOLD
                && format == DataFormat::HighAccuracyCalibrated
            {
                exponent += INDEX_EXPONENT_CORRECTION;
            }
            mantissa as f64 / (1u64 << 23) as f64 * (1u64 << exponent) as f64
        }
        DataFormat::Compressed => (packed_info >> 11) as f64 / 128.0,
        DataFormat::Standard => (packed_info & mask(0, 23)) as f64 / 1024.0,
        // Uncalibrated data does not record a base peak mass
        DataFormat::SIROrMRM
        | DataFormat::ScanningContinuum
        | DataFormat::MCA
        | DataFormat::MCAWithSD
        | DataFormat::MCB
        | DataFormat::MCBWithSD => 0.0,
        DataFormat::MolecularWeight => (packed_info >> 4) as f64 / 128.0,
        DataFormat::Other(_) => 0.0,
    }
}

/// The most intense peak of a scan as summarized in the scan index
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasePeak {
    pub mass: f64,
    pub intensity: f64,
}

impl BasePeak {
    pub fn new(mass: f64, intensity: f64) -> Self {
        Self { mass, intensity }
    }

    /// Unpack both halves of a scan index record's base peak fields
    pub fn from_index_fields(packed_intensity: i16, packed_info: u32, format: DataFormat) -> Self {
        Self::new(
            unpack_mass(packed_info, format, true),
            unpack_intensity(packed_intensity, packed_info, format),
        )
    }
}
