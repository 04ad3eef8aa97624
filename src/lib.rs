//! `mzwaters` reads the acquisition metadata and scan index of Waters MassLynx
//! `.raw` directories.
//!
//! ```no_run
//! use mzwaters::WatersRawReader;
//!
//! let mut reader = WatersRawReader::new();
//! for function in reader.functions("./test/data/small.raw").unwrap() {
//!     println!(
//!         "{}: {} {} with {} scans",
//!         function.function, function.function_type, function.data_format, function.scan_count
//!     );
//! }
//! ```
pub mod bits;
pub mod io;

pub use crate::io::waters::{
    DataFormat, FunctionDescriptor, FunctionType, HeaderMetadata, IonMode, ScanIndexRecord,
    ScanPolarity,
};
pub use crate::io::{is_waters_raw, WatersRawError, WatersRawReader};
