//! Decoding of a function's scan index, `_FUNCnnn.IDX`.
//!
//! Each scan has one [`SCAN_RECORD_SIZE`] byte record. The record layout
//! depends on the owning function's [`DataFormat`]:
//!
//! | bytes | compressed format          | every other format          |
//! |-------|----------------------------|-----------------------------|
//! | 0-3   | peak data offset           | peak data offset            |
//! | 4-7   | packed scan info           | packed scan info            |
//! | 8-11  | total ion current          | total ion current           |
//! | 12-15 | scan time                  | scan time                   |
//! | 16-17 | base peak info (low half)  | packed base peak intensity  |
//! | 18-19 | base peak info (high half) | base peak info (low half)   |
//! | 20-21 | reserved                   | base peak info (high half)  |
use std::io::{self, Cursor};
use std::path::Path;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use log::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bits::{extract, mask, to_signed32, to_unsigned32};
use crate::io::utils::ContainerStorage;

use super::constants::{index_file_name, DataFormat, SCAN_RECORD_SIZE};
use super::functions::{scan_count_from_len, FunctionDescriptor};
use super::reader::WatersRawError;
use super::unpack::BasePeak;

bitflags! {
    /// The single bit flags of a scan's packed info word, at their native positions
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ScanFlags: u32 {
        const USE_FOLLOWING_CONTINUUM = 1 << 27;
        const CONTINUUM_OVERRIDE = 1 << 28;
        const CONTAINS_MOLECULAR_MASSES = 1 << 29;
        const CONTAINS_CALIBRATED_MASSES = 1 << 30;
        /// Bit 31, set when the packed word reads as a negative number
        const OVERLOAD = 1 << 31;
    }
}

impl ScanFlags {
    fn from_packed_info(packed_info: u32) -> Self {
        let mut flags = Self::from_bits_truncate(packed_info & mask(27, 30));
        if to_signed32(packed_info) < 0 {
            flags |= Self::OVERLOAD;
        }
        flags
    }
}

/// The summary of a single scan held in a function's scan index
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanIndexRecord {
    pub function: usize,
    /// The 1-based scan number within the function
    pub scan: usize,
    /// Byte offset of this scan's peaks in the function's peak data file
    pub offset: u32,
    pub peak_count: u32,
    pub segment: u8,
    pub flags: ScanFlags,
    pub total_ion_current: f32,
    /// Minutes
    pub scan_time: f32,
    pub base_peak: BasePeak,
    /// The precursor set mass of the owning function, zero when it does not
    /// fragment
    pub precursor_mass: f32,
    /// Not recorded in the scan index, always [`None`]
    pub low_mass: Option<f64>,
    /// Not recorded in the scan index, always [`None`]
    pub high_mass: Option<f64>,
}

impl ScanIndexRecord {
    /// Decode one scan record belonging to `function`.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if `record` is shorter than
    /// [`SCAN_RECORD_SIZE`].
    pub fn decode(function: &FunctionDescriptor, scan: usize, record: &[u8]) -> io::Result<Self> {
        if record.len() < SCAN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "scan record is {} bytes, expected {SCAN_RECORD_SIZE}",
                    record.len()
                ),
            ));
        }
        let format = function.data_format;
        let mut cursor = Cursor::new(record);

        let offset = to_unsigned32(cursor.read_i32::<LittleEndian>()?);
        let packed_scan = to_unsigned32(cursor.read_i32::<LittleEndian>()?);
        let total_ion_current = cursor.read_f32::<LittleEndian>()?;
        let scan_time = cursor.read_f32::<LittleEndian>()?;
        // The compressed layout ends in two reserved bytes instead of leading
        // with an intensity field
        let (packed_intensity, packed_base_peak) = if format.is_compressed() {
            (0, to_unsigned32(cursor.read_i32::<LittleEndian>()?))
        } else {
            let intensity = cursor.read_i16::<LittleEndian>()?;
            (intensity, to_unsigned32(cursor.read_i32::<LittleEndian>()?))
        };

        let precursor_mass = if function.is_fragmentation() {
            function.precursor_mass
        } else {
            0.0
        };

        let this = Self {
            function: function.function,
            scan,
            offset,
            peak_count: extract(packed_scan, 0, 21),
            segment: extract(packed_scan, 22, 26) as u8,
            flags: ScanFlags::from_packed_info(packed_scan),
            total_ion_current,
            scan_time,
            base_peak: BasePeak::from_index_fields(packed_intensity, packed_base_peak, format),
            precursor_mass,
            low_mass: None,
            high_mass: None,
        };
        trace!("Decoded scan {}:{scan} {this:?}", function.function);
        Ok(this)
    }

    pub fn uses_following_continuum(&self) -> bool {
        self.flags.contains(ScanFlags::USE_FOLLOWING_CONTINUUM)
    }

    pub fn continuum_override(&self) -> bool {
        self.flags.contains(ScanFlags::CONTINUUM_OVERRIDE)
    }

    pub fn contains_molecular_masses(&self) -> bool {
        self.flags.contains(ScanFlags::CONTAINS_MOLECULAR_MASSES)
    }

    pub fn contains_calibrated_masses(&self) -> bool {
        self.flags.contains(ScanFlags::CONTAINS_CALIBRATED_MASSES)
    }

    pub fn is_overloaded(&self) -> bool {
        self.flags.contains(ScanFlags::OVERLOAD)
    }

    pub fn base_peak_mass(&self) -> f64 {
        self.base_peak.mass
    }

    pub fn base_peak_intensity(&self) -> f64 {
        self.base_peak.intensity
    }
}

/// Read scan `scan` of `function` from the container at `directory`, seeking
/// directly to its record.
pub fn read_scan<S: ContainerStorage + ?Sized>(
    storage: &S,
    directory: &Path,
    function: &FunctionDescriptor,
    scan: usize,
) -> Result<ScanIndexRecord, WatersRawError> {
    if scan == 0 || scan > function.scan_count {
        return Err(WatersRawError::ScanNotFound {
            function: function.function,
            scan,
        });
    }
    let path = directory.join(index_file_name(function.function));
    let index_error = |source| WatersRawError::IndexReadError {
        function: function.function,
        source,
    };
    let mut buf = [0u8; SCAN_RECORD_SIZE];
    storage
        .read_at(&path, ((scan - 1) * SCAN_RECORD_SIZE) as u64, &mut buf)
        .map_err(index_error)?;
    ScanIndexRecord::decode(function, scan, &buf).map_err(index_error)
}

/// Read every scan record of `function` in scan order
pub fn read_scans<S: ContainerStorage + ?Sized>(
    storage: &S,
    directory: &Path,
    function: &FunctionDescriptor,
) -> Result<Vec<ScanIndexRecord>, WatersRawError> {
    let path = directory.join(index_file_name(function.function));
    let content = storage
        .read(&path)
        .map_err(|source| WatersRawError::IndexReadError {
            function: function.function,
            source,
        })?;
    let n = scan_count_from_len(content.len() as u64).min(function.scan_count);
    content
        .chunks_exact(SCAN_RECORD_SIZE)
        .take(n)
        .enumerate()
        .map(|(i, record)| {
            ScanIndexRecord::decode(function, i + 1, record).map_err(|source| {
                WatersRawError::IndexReadError {
                    function: function.function,
                    source,
                }
            })
        })
        .collect()
}
