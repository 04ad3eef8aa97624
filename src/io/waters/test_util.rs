//! Builders for synthetic Waters containers used by the tests
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::utils::MemoryStorage;

use super::constants::{
    data_file_name, index_file_name, FUNCTION_RECORD_SIZE, FUNCTION_TABLE_FILE, HEADER_FILE,
    MAX_SEGMENTS, SCAN_RECORD_SIZE,
};

#[derive(Debug, Default, Clone)]
pub struct FunctionRecord {
    pub function_type: u8,
    pub ion_mode: u8,
    pub data_format: u8,
    pub cycle_time: f32,
    pub inter_scan_delay: f32,
    pub start_time: f32,
    pub end_time: f32,
    pub stored_scan_count: i32,
    pub collision_energy: u8,
    pub segment_count: u8,
    pub precursor_mass: f32,
    pub inter_segment_time: f32,
    /// (time, start mass, end mass)
    pub segments: Vec<(i32, i32, i32)>,
}

impl FunctionRecord {
    pub fn ms1(data_format: u8) -> Self {
        Self {
            function_type: 0,
            ion_mode: 8,
            data_format,
            cycle_time: 1.0,
            inter_scan_delay: 0.1,
            end_time: 5.0,
            segment_count: 1,
            segments: vec![(0, 50, 2000)],
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FUNCTION_RECORD_SIZE);
        let packed = (self.function_type as u16 & 0x1F)
            | ((self.ion_mode as u16 & 0x1F) << 5)
            | ((self.data_format as u16 & 0xF) << 10);
        buf.extend(packed.to_le_bytes());
        buf.extend(self.cycle_time.to_le_bytes());
        buf.extend(self.inter_scan_delay.to_le_bytes());
        buf.extend(self.start_time.to_le_bytes());
        buf.extend(self.end_time.to_le_bytes());
        buf.extend(self.stored_scan_count.to_le_bytes());
        let msms = self.collision_energy as u16 | ((self.segment_count as u16) << 8);
        buf.extend(msms.to_le_bytes());
        buf.extend(self.precursor_mass.to_le_bytes());
        buf.extend(self.inter_segment_time.to_le_bytes());

        let column = |f: fn(&(i32, i32, i32)) -> i32| -> Vec<u8> {
            (0..MAX_SEGMENTS)
                .flat_map(|i| self.segments.get(i).map(f).unwrap_or_default().to_le_bytes())
                .collect()
        };
        buf.extend(column(|s| s.0));
        buf.extend(column(|s| s.1));
        buf.extend(column(|s| s.2));
        assert_eq!(buf.len(), FUNCTION_RECORD_SIZE);
        buf
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanRecord {
    pub offset: i32,
    pub scan_info: u32,
    pub tic: f32,
    pub scan_time: f32,
    pub packed_intensity: i16,
    pub packed_info: u32,
}

impl ScanRecord {
    pub fn to_bytes(&self, compressed: bool) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SCAN_RECORD_SIZE);
        buf.extend(self.offset.to_le_bytes());
        buf.extend(self.scan_info.to_le_bytes());
        buf.extend(self.tic.to_le_bytes());
        buf.extend(self.scan_time.to_le_bytes());
        if compressed {
            buf.extend(self.packed_info.to_le_bytes());
            buf.extend([0u8; 2]);
        } else {
            buf.extend(self.packed_intensity.to_le_bytes());
            buf.extend(self.packed_info.to_le_bytes());
        }
        assert_eq!(buf.len(), SCAN_RECORD_SIZE);
        buf
    }
}

pub const DEFAULT_HEADER: &str = "\
$$ Acquired Name: synthetic
$$ Acquired Date: 01-Jan-2020
$$ Acquired Time: 09:30:00
$$ Instrument: TEST
$$ Cal Function 1: 0.0,1.0,T0
";

#[derive(Debug, Clone)]
pub struct SyntheticContainer {
    pub header: String,
    pub functions: Vec<(FunctionRecord, Vec<ScanRecord>)>,
}

impl Default for SyntheticContainer {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            functions: Vec::new(),
        }
    }
}

impl SyntheticContainer {
    pub fn push_function(&mut self, record: FunctionRecord, scans: Vec<ScanRecord>) {
        self.functions.push((record, scans));
    }

    /// `n` scans with distinct, easily predicted field values
    pub fn scans(n: usize) -> Vec<ScanRecord> {
        (1..=n)
            .map(|i| ScanRecord {
                offset: (i as i32 - 1) * 64,
                scan_info: (i as u32 * 10) | ((i as u32 % 4) << 22),
                tic: 1000.0 * i as f32,
                scan_time: 0.25 * i as f32,
                packed_intensity: ((i as i16) << 3) | 1,
                packed_info: (i as u32 * 100) << 10,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = vec![(HEADER_FILE.to_string(), self.header.clone().into_bytes())];
        let table = self
            .functions
            .iter()
            .flat_map(|(record, _)| record.to_bytes())
            .collect();
        files.push((FUNCTION_TABLE_FILE.to_string(), table));
        for (i, (record, scans)) in self.functions.iter().enumerate() {
            let compressed = record.data_format == 0;
            let index = scans.iter().flat_map(|s| s.to_bytes(compressed)).collect();
            files.push((index_file_name(i + 1), index));
            files.push((data_file_name(i + 1), vec![0u8; 16]));
        }
        files
    }

    pub fn write_to_memory(&self, storage: &mut MemoryStorage, root: &str) {
        let root = PathBuf::from(root);
        for (name, content) in self.files() {
            storage.insert(root.join(name), content);
        }
    }

    pub fn write_to_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        for (name, content) in self.files() {
            fs::write(dir.join(name), content)?;
        }
        Ok(())
    }
}
