//! Reader implementation for Waters MassLynx `.raw` directories, [`WatersRawReader`].
//!
//! A `.raw` "file" is a directory holding several member files:
//!
//! - `_HEADER.TXT`, acquisition metadata as `$$ key: value` lines, see [`HeaderMetadata`]
//! - `_FUNCTNS.INF`, a table of fixed-size records describing each acquisition function,
//!   see [`FunctionDescriptor`]
//! - `_FUNCnnn.IDX`, the scan index of function `nnn`, see [`ScanIndexRecord`]
//! - `_FUNCnnn.DAT`, the peak data of function `nnn`. Only its presence is checked, peak
//!   data is not decoded.
mod constants;
mod functions;
mod header;
mod index;
mod reader;
mod unpack;

#[cfg(test)]
pub(crate) mod test_util;

pub use constants::{
    data_file_name, index_file_name, DataFormat, FunctionType, IonMode, ScanPolarity,
    FUNCTION_RECORD_SIZE, FUNCTION_TABLE_FILE, HEADER_FILE, MAX_CALIBRATION_COEFFICIENTS,
    MAX_SEGMENTS, SCAN_RECORD_SIZE,
};
pub use functions::{
    read_function, read_function_table, scan_count_from_len, FunctionDescriptor, Segment,
};
pub use header::{CalibrationModel, CalibrationRole, CalibrationType, HeaderMetadata};
pub use index::{read_scan, read_scans, ScanFlags, ScanIndexRecord};
pub use reader::{
    is_waters_raw, is_waters_raw_in, DirectorySession, SessionError, WatersRawError,
    WatersRawReader,
};
pub use unpack::{unpack_intensity, unpack_mass, BasePeak};
