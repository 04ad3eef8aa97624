//! Decoding of the function table, `_FUNCTNS.INF`.
//!
//! The table is a sequence of [`FUNCTION_RECORD_SIZE`] byte records, one per
//! function, in function number order.
use std::io::{self, Cursor};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bits::extract;
use crate::io::utils::ContainerStorage;

use super::constants::{
    data_file_name, index_file_name, DataFormat, FunctionType, IonMode, ScanPolarity,
    FUNCTION_RECORD_SIZE, FUNCTION_TABLE_FILE, MAX_SEGMENTS, SCAN_RECORD_SIZE,
};
use super::header::CalibrationModel;
use super::reader::WatersRawError;

/// One entry of a function's segment table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub time: i32,
    pub start_mass: i32,
    pub end_mass: i32,
}

/// The acquisition parameters of a single function
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionDescriptor {
    /// The 1-based function number
    pub function: usize,
    /// The packed type, ion mode and format word as stored
    packed_function: u16,
    pub function_type: FunctionType,
    /// The raw function type code, kept for codes without a [`FunctionType`]
    pub function_type_code: u8,
    pub ion_mode: IonMode,
    pub ion_mode_code: u8,
    pub data_format: DataFormat,
    /// Seconds
    pub cycle_time: f32,
    /// Seconds
    pub inter_scan_delay: f32,
    /// Minutes
    pub start_time: f32,
    /// Minutes
    pub end_time: f32,
    /// Sampled from the segment table, not authoritative
    pub start_mass: f32,
    /// Sampled from the segment table, not authoritative
    pub end_mass: f32,
    /// The number of records in this function's scan index
    pub scan_count: usize,
    pub collision_energy: u8,
    pub segment_count: u8,
    pub precursor_mass: f32,
    /// Seconds
    pub inter_segment_time: f32,
    pub segments: [Segment; MAX_SEGMENTS],
    pub calibration: Option<CalibrationModel>,
}

impl FunctionDescriptor {
    /// A function with no acquisition parameters set
    pub fn empty(function: usize) -> Self {
        Self {
            function,
            ..Default::default()
        }
    }

    /// Decode a single function record. The scan count is left at zero, the
    /// count stored in the record is never written by the instrument.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if `record` is shorter than
    /// [`FUNCTION_RECORD_SIZE`].
    pub fn decode(function: usize, record: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(record);

        let packed_word = cursor.read_u16::<LittleEndian>()?;
        let packed_function = packed_word as u32;
        let cycle_time = cursor.read_f32::<LittleEndian>()?;
        let inter_scan_delay = cursor.read_f32::<LittleEndian>()?;
        let start_time = cursor.read_f32::<LittleEndian>()?;
        let end_time = cursor.read_f32::<LittleEndian>()?;
        let _stored_scan_count = cursor.read_i32::<LittleEndian>()?;
        let packed_msms = cursor.read_u16::<LittleEndian>()? as u32;
        let precursor_mass = cursor.read_f32::<LittleEndian>()?;
        let inter_segment_time = cursor.read_f32::<LittleEndian>()?;

        let mut times = [0i32; MAX_SEGMENTS];
        let mut start_masses = [0i32; MAX_SEGMENTS];
        let mut end_masses = [0i32; MAX_SEGMENTS];
        cursor.read_i32_into::<LittleEndian>(&mut times)?;
        cursor.read_i32_into::<LittleEndian>(&mut start_masses)?;
        cursor.read_i32_into::<LittleEndian>(&mut end_masses)?;
        debug_assert_eq!(cursor.position(), FUNCTION_RECORD_SIZE as u64);

        let function_type_code = extract(packed_function, 0, 4) as u8;
        let ion_mode_code = extract(packed_function, 5, 9) as u8;
        let format_code = extract(packed_function, 10, 13) as u8;

        let mut segments = [Segment::default(); MAX_SEGMENTS];
        for (i, seg) in segments.iter_mut().enumerate() {
            *seg = Segment {
                time: times[i],
                start_mass: start_masses[i],
                end_mass: end_masses[i],
            };
        }

        let mut this = Self {
            function,
            packed_function: packed_word,
            function_type: FunctionType::from(function_type_code as u32),
            function_type_code,
            ion_mode: IonMode::from(ion_mode_code as u32),
            ion_mode_code,
            data_format: DataFormat::from(format_code),
            cycle_time,
            inter_scan_delay,
            start_time,
            end_time,
            start_mass: 0.0,
            end_mass: 0.0,
            scan_count: 0,
            collision_energy: extract(packed_msms, 0, 7) as u8,
            segment_count: extract(packed_msms, 8, 15) as u8,
            precursor_mass,
            inter_segment_time,
            segments,
            calibration: None,
        };
        this.sample_mass_range();
        Ok(this)
    }

    /// Take a rough mass range from the segment table: the first segment's
    /// start mass and the largest end mass among the populated segments.
    fn sample_mass_range(&mut self) {
        let populated = self.segments().len().max(1);
        self.start_mass = self.segments[0].start_mass as f32;
        self.end_mass = self.segments[..populated]
            .iter()
            .map(|s| s.end_mass)
            .max()
            .unwrap_or_default() as f32;
    }

    /// Whether the record looks like it was never written. Such a record might
    /// still describe a function if its peak data file exists.
    pub fn is_possibly_empty(&self) -> bool {
        self.packed_function == 0
            && self.cycle_time == 0.0
            && self.inter_scan_delay == 0.0
    }

    pub fn is_fragmentation(&self) -> bool {
        self.function_type.is_fragmentation()
    }

    /// `1` for a fragmentation function, `0` for a single stage function
    pub fn fragmentation_flag(&self) -> u8 {
        self.is_fragmentation() as u8
    }

    pub fn ms_level(&self) -> u8 {
        if self.is_fragmentation() {
            2
        } else {
            1
        }
    }

    pub fn polarity(&self) -> ScanPolarity {
        self.ion_mode.polarity()
    }

    /// The segment entries in use, as given by the segment count
    pub fn segments(&self) -> &[Segment] {
        let n = (self.segment_count as usize).min(MAX_SEGMENTS);
        &self.segments[..n]
    }
}

/// The number of whole scan records in an index file of `length` bytes.
///
/// A trailing partial record is dropped.
pub fn scan_count_from_len(length: u64) -> usize {
    (length / SCAN_RECORD_SIZE as u64) as usize
}

fn read_scan_count<S: ContainerStorage + ?Sized>(
    storage: &S,
    directory: &Path,
    function: usize,
) -> usize {
    let path = directory.join(index_file_name(function));
    match storage.len(&path) {
        Ok(length) => {
            if length % SCAN_RECORD_SIZE as u64 != 0 {
                warn!(
                    "{} is {length} bytes, not a whole number of {SCAN_RECORD_SIZE} byte records, \
                     ignoring the trailing {} bytes",
                    path.display(),
                    length % SCAN_RECORD_SIZE as u64
                );
            }
            scan_count_from_len(length)
        }
        Err(e) => {
            debug!("Failed to stat {}, assuming no scans: {e}", path.display());
            0
        }
    }
}

/// Decode function `function` from the function table bytes, checking that it
/// describes a real function and counting its scans.
pub fn read_function<S: ContainerStorage + ?Sized>(
    storage: &S,
    directory: &Path,
    table: &[u8],
    function: usize,
) -> Result<FunctionDescriptor, WatersRawError> {
    let start = function
        .checked_sub(1)
        .map(|i| i * FUNCTION_RECORD_SIZE)
        .ok_or(WatersRawError::FunctionNotFound(function))?;
    let record = table
        .get(start..start + FUNCTION_RECORD_SIZE)
        .ok_or(WatersRawError::FunctionNotFound(function))?;

    let mut descriptor = FunctionDescriptor::decode(function, record).map_err(|e| {
        WatersRawError::DirectoryReadError(format!("failed to decode function {function}: {e}"))
    })?;
    if descriptor.is_possibly_empty() {
        let data_path = directory.join(data_file_name(function));
        if !storage.exists(&data_path) {
            return Err(WatersRawError::DirectoryReadError(format!(
                "function {function} has an empty record and no peak data file"
            )));
        }
        warn!(
            "Function {function} has an empty record but {} exists, accepting it",
            data_path.display()
        );
    }
    descriptor.scan_count = read_scan_count(storage, directory, function);
    debug!(
        "Read function {function}: {} {} format {}, {} scans",
        descriptor.function_type,
        descriptor.ion_mode,
        descriptor.data_format,
        descriptor.scan_count
    );
    Ok(descriptor)
}

/// Read every function in the container at `directory`.
///
/// Fails if the table holds no complete records or any record fails its
/// validity check.
pub fn read_function_table<S: ContainerStorage + ?Sized>(
    storage: &S,
    directory: &Path,
) -> Result<Vec<FunctionDescriptor>, WatersRawError> {
    let path = directory.join(FUNCTION_TABLE_FILE);
    let table = storage.read(&path).map_err(|e| {
        WatersRawError::DirectoryReadError(format!("failed to read {}: {e}", path.display()))
    })?;
    let count = table.len() / FUNCTION_RECORD_SIZE;
    if count == 0 {
        return Err(WatersRawError::DirectoryReadError(format!(
            "{} does not contain any function records",
            path.display()
        )));
    }
    (1..=count)
        .map(|function| read_function(storage, directory, &table, function))
        .collect()
}
