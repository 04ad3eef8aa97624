use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::io::utils::{ContainerStorage, FileSystemStorage};

use super::constants::{DataFormat, FUNCTION_RECORD_SIZE, FUNCTION_TABLE_FILE, HEADER_FILE};
use super::functions::{read_function_table, FunctionDescriptor};
use super::header::HeaderMetadata;
use super::index::{read_scan, read_scans, ScanIndexRecord};

/// The directory-level failure recorded by a [`WatersRawReader`] until the
/// next successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionError {
    InvalidPath,
    HeaderReadError,
    DirectoryReadError,
}

/// Errors that may occur when reading a Waters container
#[derive(Debug, Error)]
pub enum WatersRawError {
    #[error("The path is empty")]
    InvalidPath,
    #[error("Failed to read the header file: {0}")]
    HeaderReadError(#[source] io::Error),
    #[error("Failed to read the function table: {0}")]
    DirectoryReadError(String),
    #[error("The requested function {0} was not found")]
    FunctionNotFound(usize),
    #[error("The requested scan {scan} of function {function} was not found")]
    ScanNotFound { function: usize, scan: usize },
    #[error("Failed to read the scan index of function {function}: {source}")]
    IndexReadError {
        function: usize,
        #[source]
        source: io::Error,
    },
}

impl WatersRawError {
    /// The sticky session error this corresponds to, if it is a failure to
    /// load the directory rather than a bad argument to a single call
    pub fn kind(&self) -> Option<SessionError> {
        match self {
            Self::InvalidPath => Some(SessionError::InvalidPath),
            Self::HeaderReadError(_) => Some(SessionError::HeaderReadError),
            Self::DirectoryReadError(_) => Some(SessionError::DirectoryReadError),
            Self::FunctionNotFound(_) | Self::ScanNotFound { .. } | Self::IndexReadError { .. } => {
                None
            }
        }
    }
}

impl From<WatersRawError> for io::Error {
    fn from(value: WatersRawError) -> Self {
        let s = value.to_string();
        match value {
            WatersRawError::InvalidPath => io::Error::new(io::ErrorKind::InvalidInput, s),
            WatersRawError::HeaderReadError(e) => e,
            WatersRawError::DirectoryReadError(_) => io::Error::new(io::ErrorKind::InvalidData, s),
            WatersRawError::FunctionNotFound(_) | WatersRawError::ScanNotFound { .. } => {
                io::Error::new(io::ErrorKind::NotFound, s)
            }
            WatersRawError::IndexReadError { source, .. } => source,
        }
    }
}

/// Check whether `path` looks like a Waters `.raw` directory on the local file
/// system
pub fn is_waters_raw<P: AsRef<Path>>(path: P) -> bool {
    is_waters_raw_in(&FileSystemStorage, path.as_ref())
}

/// Check whether `path` looks like a Waters `.raw` directory in `storage`.
///
/// Only the presence of the header and a function table holding at least one
/// whole record are checked, nothing is parsed.
pub fn is_waters_raw_in<S: ContainerStorage + ?Sized>(storage: &S, path: &Path) -> bool {
    if !storage.is_dir(path) {
        return false;
    }
    if !storage.exists(&path.join(HEADER_FILE)) {
        return false;
    }
    match storage.len(&path.join(FUNCTION_TABLE_FILE)) {
        Ok(length) => length >= FUNCTION_RECORD_SIZE as u64,
        Err(_) => false,
    }
}

/// One fully parsed container directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySession {
    path: PathBuf,
    header: HeaderMetadata,
    functions: Vec<FunctionDescriptor>,
}

impl DirectorySession {
    /// Parse the header and function table of the container at `path`
    pub fn read<S: ContainerStorage + ?Sized>(
        storage: &S,
        path: PathBuf,
    ) -> Result<Self, WatersRawError> {
        let header =
            HeaderMetadata::read(storage, &path).map_err(WatersRawError::HeaderReadError)?;
        let mut functions = read_function_table(storage, &path)?;
        header.calibrate_functions(&mut functions);
        Ok(Self {
            path,
            header,
            functions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &HeaderMetadata {
        &self.header
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Get a function by its 1-based number
    pub fn function(&self, function: usize) -> Result<&FunctionDescriptor, WatersRawError> {
        function
            .checked_sub(1)
            .and_then(|i| self.functions.get(i))
            .ok_or(WatersRawError::FunctionNotFound(function))
    }
}

/// Find the container directory for a path naming either the container or a
/// file inside it
fn container_path<S: ContainerStorage + ?Sized>(
    storage: &S,
    path: &Path,
) -> Result<PathBuf, WatersRawError> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(WatersRawError::InvalidPath);
    }
    let raw_ancestor = path.ancestors().find(|p| {
        p.extension()
            .map(|e| e.eq_ignore_ascii_case("raw"))
            .unwrap_or_default()
    });
    if let Some(dir) = raw_ancestor {
        return Ok(dir.to_path_buf());
    }
    let is_member_file = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('_'))
        .unwrap_or_default()
        && storage.exists(path)
        && !storage.is_dir(path);
    match path.parent() {
        Some(parent) if is_member_file => Ok(parent.to_path_buf()),
        _ => Ok(path.to_path_buf()),
    }
}

/// Reads acquisition metadata and scan summaries from Waters `.raw` directories.
///
/// The reader keeps the most recently loaded directory parsed in memory. Asking
/// about the same directory again reuses it without touching the file system,
/// asking about a different directory replaces it. Each reader owns its own
/// session, so callers working on several directories at once can hold one
/// reader per directory.
///
/// ```no_run
/// use mzwaters::io::WatersRawReader;
///
/// let mut reader = WatersRawReader::new();
/// let n = reader.function_count("./test/data/small.raw").unwrap();
/// for function in 1..=n {
///     let scan = reader.scan("./test/data/small.raw", function, 1).unwrap();
///     println!("{function}: {:?}", scan.base_peak);
/// }
/// ```
#[derive(Debug, Default)]
pub struct WatersRawReader<S: ContainerStorage = FileSystemStorage> {
    storage: S,
    session: Option<DirectorySession>,
    last_error: Option<SessionError>,
}

impl WatersRawReader<FileSystemStorage> {
    pub fn new() -> Self {
        Self::with_storage(FileSystemStorage)
    }
}

impl<S: ContainerStorage> WatersRawReader<S> {
    /// Create a reader that reads containers from `storage`
    pub fn with_storage(storage: S) -> Self {
        Self {
            storage,
            session: None,
            last_error: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The currently loaded directory, if any
    pub fn session(&self) -> Option<&DirectorySession> {
        self.session.as_ref()
    }

    /// The error from the last failed directory load. It is cleared when a
    /// directory loads successfully.
    pub fn last_error(&self) -> Option<SessionError> {
        self.last_error
    }

    /// Drop the loaded directory
    pub fn clear(&mut self) {
        self.session = None;
    }

    fn load(&mut self, path: &Path) -> Result<(&S, &DirectorySession), WatersRawError> {
        let path = match container_path(&self.storage, path) {
            Ok(path) => path,
            Err(e) => {
                self.last_error = e.kind();
                return Err(e);
            }
        };
        let reuse = self.session.as_ref().is_some_and(|s| s.path == path);
        if reuse {
            debug!("Reusing loaded session for {}", path.display());
            self.last_error = None;
        } else {
            self.session = None;
            debug!("Loading {}", path.display());
            match DirectorySession::read(&self.storage, path) {
                Ok(session) => {
                    self.last_error = None;
                    self.session = Some(session);
                }
                Err(e) => {
                    debug!("Failed to load directory: {e}");
                    self.last_error = e.kind();
                    return Err(e);
                }
            }
        }
        match self.session.as_ref() {
            Some(session) => Ok((&self.storage, session)),
            None => Err(WatersRawError::DirectoryReadError(
                "no directory is loaded".to_string(),
            )),
        }
    }

    /// Load `path` if it is not already loaded
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<&DirectorySession, WatersRawError> {
        self.load(path.as_ref()).map(|(_, session)| session)
    }

    /// Check whether `path` is a readable container, recording why not in
    /// [`WatersRawReader::last_error`]
    pub fn is_valid_directory<P: AsRef<Path>>(&mut self, path: P) -> bool {
        self.load(path.as_ref()).is_ok()
    }

    pub fn header<P: AsRef<Path>>(&mut self, path: P) -> Result<&HeaderMetadata, WatersRawError> {
        self.open(path).map(|session| session.header())
    }

    pub fn function_count<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, WatersRawError> {
        self.open(path).map(|session| session.function_count())
    }

    pub fn functions<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<&[FunctionDescriptor], WatersRawError> {
        self.open(path).map(|session| session.functions())
    }

    /// Get a function's descriptor by its 1-based number
    pub fn function<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
    ) -> Result<&FunctionDescriptor, WatersRawError> {
        self.open(path)?.function(function)
    }

    pub fn scan_count<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
    ) -> Result<usize, WatersRawError> {
        Ok(self.function(path, function)?.scan_count)
    }

    pub fn data_format<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
    ) -> Result<DataFormat, WatersRawError> {
        Ok(self.function(path, function)?.data_format)
    }

    pub fn is_fragmentation_function<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
    ) -> Result<bool, WatersRawError> {
        Ok(self.function(path, function)?.is_fragmentation())
    }

    /// Read the index record of a scan, both numbers 1-based
    pub fn scan<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
        scan: usize,
    ) -> Result<ScanIndexRecord, WatersRawError> {
        let (storage, session) = self.load(path.as_ref())?;
        let descriptor = session.function(function)?;
        read_scan(storage, session.path(), descriptor, scan)
    }

    /// Read the index records of every scan of a function
    pub fn scans<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
    ) -> Result<Vec<ScanIndexRecord>, WatersRawError> {
        let (storage, session) = self.load(path.as_ref())?;
        let descriptor = session.function(function)?;
        read_scans(storage, session.path(), descriptor)
    }

    /// Whether a scan holds continuum (profile) data, either because its
    /// function acquires continuum data or because the scan overrides it
    pub fn is_continuum_scan<P: AsRef<Path>>(
        &mut self,
        path: P,
        function: usize,
        scan: usize,
    ) -> Result<bool, WatersRawError> {
        let (storage, session) = self.load(path.as_ref())?;
        let descriptor = session.function(function)?;
        let record = read_scan(storage, session.path(), descriptor, scan)?;
        Ok(descriptor.data_format.is_continuum() || record.continuum_override())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::utils::MemoryStorage;
    use crate::io::waters::header::CalibrationType;
    use crate::io::waters::test_util::{FunctionRecord, ScanRecord, SyntheticContainer};

    fn two_function_container() -> SyntheticContainer {
        let mut container = SyntheticContainer::default();
        container.push_function(FunctionRecord::ms1(1), SyntheticContainer::scans(6));
        let msms = FunctionRecord {
            function_type: 11,
            ion_mode: 9,
            data_format: 3,
            cycle_time: 0.5,
            precursor_mass: 445.12,
            ..Default::default()
        };
        let mut scans = SyntheticContainer::scans(2);
        scans[1].scan_info |= 1 << 28;
        container.push_function(msms, scans);
        container
    }

    fn memory_reader(root: &str) -> WatersRawReader<MemoryStorage> {
        let mut storage = MemoryStorage::new();
        two_function_container().write_to_memory(&mut storage, root);
        WatersRawReader::with_storage(storage)
    }

    #[test_log::test]
    fn test_read_from_disk() -> io::Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("Sample01.raw");
        two_function_container().write_to_dir(&path)?;
        assert!(is_waters_raw(&path));
        assert!(!is_waters_raw(tmpdir.path()));

        let mut reader = WatersRawReader::new();
        assert!(reader.is_valid_directory(&path));
        assert_eq!(reader.function_count(&path)?, 2);

        let table_len = std::fs::metadata(path.join(FUNCTION_TABLE_FILE))?.len();
        assert_eq!(
            reader.function_count(&path)? as u64,
            table_len / FUNCTION_RECORD_SIZE as u64
        );

        let header = reader.header(&path)?;
        assert_eq!(header.acquired_name, "synthetic");

        let f1 = reader.function(&path, 1)?;
        assert_eq!(f1.scan_count, 6);
        let cal = f1.calibration.as_ref().unwrap();
        assert_eq!(cal.coefficients, [0.0, 1.0]);
        assert_eq!(cal.calibration_type, CalibrationType::Normal);
        assert!(reader.function(&path, 2)?.calibration.is_none());

        let scan = reader.scan(&path, 1, 3)?;
        assert_eq!(scan.peak_count, 30);
        assert_eq!(scan.segment, 3);
        assert_eq!(scan.total_ion_current, 3000.0);
        assert_eq!(scan.scan_time, 0.75);
        assert_eq!(scan.base_peak_mass(), 300.0);
        assert_eq!(scan.base_peak_intensity(), 12.0);
        Ok(())
    }

    #[test_log::test]
    fn test_member_file_path() -> io::Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("Sample01.RAW");
        two_function_container().write_to_dir(&path)?;

        let mut reader = WatersRawReader::new();
        assert_eq!(reader.function_count(path.join("_FUNC001.DAT"))?, 2);
        assert_eq!(reader.session().unwrap().path(), path.as_path());

        // Container directories that do not end in .raw
        let other = tmpdir.path().join("acquisition");
        two_function_container().write_to_dir(&other)?;
        assert_eq!(reader.function_count(other.join("_HEADER.TXT"))?, 2);
        assert_eq!(reader.session().unwrap().path(), other.as_path());
        assert_eq!(reader.function_count(&other)?, 2);
        Ok(())
    }

    #[test_log::test]
    fn test_session_reuse() {
        let mut reader = memory_reader("a.raw");
        two_function_container().write_to_memory(&mut reader.storage, "b.raw");

        let first = reader.functions("a.raw").unwrap().to_vec();
        let reads = reader.storage().read_count();
        assert!(reads > 0);

        let second = reader.functions("a.raw").unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(reader.function_count("a.raw/_FUNCTNS.INF").unwrap(), 2);
        assert!(reader.is_fragmentation_function("a.raw", 2).unwrap());
        assert_eq!(reader.storage().read_count(), reads);

        // A different directory replaces the session
        reader.function_count("b.raw").unwrap();
        assert!(reader.storage().read_count() > reads);
        assert_eq!(reader.session().unwrap().path(), Path::new("b.raw"));
    }

    #[test_log::test]
    fn test_failed_load_leaves_session_empty() {
        let mut reader = memory_reader("a.raw");
        assert!(reader.is_valid_directory("a.raw"));
        assert!(reader.last_error().is_none());

        assert!(!reader.is_valid_directory("missing.raw"));
        assert!(reader.session().is_none());
        assert_eq!(reader.last_error(), Some(SessionError::HeaderReadError));

        assert!(matches!(
            reader.function_count("   "),
            Err(WatersRawError::InvalidPath)
        ));
        assert_eq!(reader.last_error(), Some(SessionError::InvalidPath));

        reader.storage.remove("a.raw/_FUNC002.DAT");
        let mut storage = std::mem::take(&mut reader.storage);
        storage.insert("a.raw/_FUNCTNS.INF", {
            let mut table = FunctionRecord::ms1(1).to_bytes();
            table.extend(FunctionRecord::default().to_bytes());
            table
        });
        let mut reader = WatersRawReader::with_storage(storage);
        assert!(matches!(
            reader.function_count("a.raw"),
            Err(WatersRawError::DirectoryReadError(_))
        ));
        assert_eq!(reader.last_error(), Some(SessionError::DirectoryReadError));
        assert!(reader.session().is_none());
    }

    #[test_log::test]
    fn test_reused_session_clears_error() {
        let mut reader = memory_reader("a.raw");
        assert!(reader.is_valid_directory("a.raw"));
        assert!(!reader.is_valid_directory("  "));
        assert_eq!(reader.last_error(), Some(SessionError::InvalidPath));

        let reads = reader.storage().read_count();
        assert!(reader.is_valid_directory("a.raw"));
        assert_eq!(reader.storage().read_count(), reads);
        assert!(reader.last_error().is_none());
    }

    #[test_log::test]
    fn test_missing_underscore_path_is_not_a_member_file() {
        let mut storage = MemoryStorage::new();
        two_function_container().write_to_memory(&mut storage, "");
        let mut reader = WatersRawReader::with_storage(storage);

        assert!(matches!(
            reader.function_count("_run"),
            Err(WatersRawError::HeaderReadError(_))
        ));
        assert_eq!(reader.last_error(), Some(SessionError::HeaderReadError));
        assert!(reader.session().is_none());

        // An existing member file still resolves to its directory
        assert_eq!(reader.function_count("_HEADER.TXT").unwrap(), 2);
        assert_eq!(reader.session().unwrap().path(), Path::new(""));
    }

    #[test]
    fn test_is_waters_raw_in_memory() {
        let mut storage = MemoryStorage::new();
        two_function_container().write_to_memory(&mut storage, "a.raw");
        assert!(is_waters_raw_in(&storage, Path::new("a.raw")));
        assert!(!is_waters_raw_in(&storage, Path::new("b.raw")));

        storage.insert("a.raw/_FUNCTNS.INF", vec![0u8; FUNCTION_RECORD_SIZE - 1]);
        assert!(!is_waters_raw_in(&storage, Path::new("a.raw")));
    }

    #[test_log::test]
    fn test_per_call_errors_are_not_sticky() {
        let mut reader = memory_reader("a.raw");
        assert!(matches!(
            reader.function("a.raw", 0),
            Err(WatersRawError::FunctionNotFound(0))
        ));
        assert!(matches!(
            reader.function("a.raw", 3),
            Err(WatersRawError::FunctionNotFound(3))
        ));
        assert!(matches!(
            reader.scan("a.raw", 1, 0),
            Err(WatersRawError::ScanNotFound { function: 1, scan: 0 })
        ));
        assert!(matches!(
            reader.scan("a.raw", 1, 7),
            Err(WatersRawError::ScanNotFound { function: 1, scan: 7 })
        ));
        assert!(reader.last_error().is_none());
        assert!(reader.session().is_some());

        let err: io::Error = reader.scan("a.raw", 2, 9).unwrap_err().into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test_log::test]
    fn test_convenience_predicates() {
        let mut reader = memory_reader("a.raw");
        assert!(!reader.is_fragmentation_function("a.raw", 1).unwrap());
        assert!(reader.is_fragmentation_function("a.raw", 2).unwrap());
        assert_eq!(reader.data_format("a.raw", 1).unwrap(), DataFormat::Standard);
        assert_eq!(
            reader.data_format("a.raw", 2).unwrap(),
            DataFormat::ScanningContinuum
        );

        assert!(!reader.is_continuum_scan("a.raw", 1, 1).unwrap());
        assert!(reader.is_continuum_scan("a.raw", 2, 1).unwrap());

        let scans = reader.scans("a.raw", 2).unwrap();
        assert_eq!(scans.len(), 2);
        assert!(!scans[0].continuum_override());
        assert!(scans[1].continuum_override());
        assert_eq!(scans[1].precursor_mass, 445.12);
        // No base peak mass is recorded for uncalibrated continuum data
        assert_eq!(scans[0].base_peak_mass(), 0.0);
        assert_eq!(reader.scan_count("a.raw", 2).unwrap(), 2);
    }

    #[test]
    fn test_continuum_override_on_centroid_function() {
        let mut container = SyntheticContainer::default();
        container.push_function(
            FunctionRecord::ms1(1),
            vec![ScanRecord {
                scan_info: 1 << 28,
                ..Default::default()
            }],
        );
        let mut storage = MemoryStorage::new();
        container.write_to_memory(&mut storage, "c.raw");
        let mut reader = WatersRawReader::with_storage(storage);
        assert!(reader.is_continuum_scan("c.raw", 1, 1).unwrap());
    }
}
