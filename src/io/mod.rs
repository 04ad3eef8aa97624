//! Reading mass spectrometry data stored in Waters MassLynx `.raw` directories.
//!
//! Member files are read through [`ContainerStorage`], which is implemented for the
//! local file system by [`FileSystemStorage`] and for in-memory containers by
//! [`MemoryStorage`].
mod utils;
pub mod waters;

pub use crate::io::utils::{ContainerStorage, FileSystemStorage, MemoryStorage};

pub use crate::io::waters::{
    is_waters_raw, is_waters_raw_in, DataFormat, FunctionDescriptor, HeaderMetadata,
    ScanIndexRecord, SessionError, WatersRawError, WatersRawReader,
};
