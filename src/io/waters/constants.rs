use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const HEADER_FILE: &str = "_HEADER.TXT";
pub const FUNCTION_TABLE_FILE: &str = "_FUNCTNS.INF";

/// Size of one function record in [`FUNCTION_TABLE_FILE`]
pub const FUNCTION_RECORD_SIZE: usize = 416;
/// Size of one scan record in a function's index file
pub const SCAN_RECORD_SIZE: usize = 22;
/// Number of entries in each of a function record's segment arrays
pub const MAX_SEGMENTS: usize = 32;
/// Number of coefficients a calibration may carry
pub const MAX_CALIBRATION_COEFFICIENTS: usize = 7;

/// The name of the scan index file of a function, `_FUNC001.IDX`
pub fn index_file_name(function: usize) -> String {
    format!("_FUNC{function:03}.IDX")
}

/// The name of the peak data file of a function, `_FUNC001.DAT`
pub fn data_file_name(function: usize) -> String {
    format!("_FUNC{function:03}.DAT")
}

/// The kind of acquisition a function performed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FunctionType {
    MS = 0,
    SIR = 1,
    DLY = 2,
    CAT = 3,
    OFF = 4,
    PAR = 5,
    DAU = 6,
    NL = 7,
    NG = 8,
    MRM = 9,
    Q1F = 10,
    MS2 = 11,
    DAD = 12,
    TOF = 13,
    PSD = 14,
    TOFMSMS = 15,
    TOFMS = 16,
    #[default]
    Unknown = 255,
}

impl FunctionType {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MS => "MS",
            Self::SIR => "SIR",
            Self::DLY => "DLY",
            Self::CAT => "CAT",
            Self::OFF => "OFF",
            Self::PAR => "PAR",
            Self::DAU => "DAU",
            Self::NL => "NL",
            Self::NG => "NG",
            Self::MRM => "MRM",
            Self::Q1F => "Q1F",
            Self::MS2 => "MS2",
            Self::DAD => "DAD",
            Self::TOF => "TOF",
            Self::PSD => "PSD",
            Self::TOFMSMS => "TOF MS/MS",
            Self::TOFMS => "TOF MS",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this function fragments a selected precursor
    pub const fn is_fragmentation(&self) -> bool {
        matches!(self, Self::DAU | Self::MS2 | Self::TOFMSMS)
    }
}

impl From<u32> for FunctionType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::MS,
            1 => Self::SIR,
            2 => Self::DLY,
            3 => Self::CAT,
            4 => Self::OFF,
            5 => Self::PAR,
            6 => Self::DAU,
            7 => Self::NL,
            8 => Self::NG,
            9 => Self::MRM,
            10 => Self::Q1F,
            11 => Self::MS2,
            12 => Self::DAD,
            13 => Self::TOF,
            14 => Self::PSD,
            15 => Self::TOFMSMS,
            16 => Self::TOFMS,
            _ => Self::Unknown,
        }
    }
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The polarity of the ions a function observed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanPolarity {
    #[default]
    Unknown,
    Positive,
    Negative,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IonMode {
    EI_POS = 0,
    EI_NEG = 1,
    CI_POS = 2,
    CI_NEG = 3,
    FB_POS = 4,
    FB_NEG = 5,
    TS_POS = 6,
    TS_NEG = 7,
    ES_POS = 8,
    ES_NEG = 9,
    AI_POS = 10,
    AI_NEG = 11,
    LD_POS = 12,
    LD_NEG = 13,
    FI_POS = 14,
    FI_NEG = 15,
    #[default]
    Unknown = 255,
}

impl IonMode {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EI_POS => "EI+",
            Self::EI_NEG => "EI-",
            Self::CI_POS => "CI+",
            Self::CI_NEG => "CI-",
            Self::FB_POS => "FB+",
            Self::FB_NEG => "FB-",
            Self::TS_POS => "TS+",
            Self::TS_NEG => "TS-",
            Self::ES_POS => "ES+",
            Self::ES_NEG => "ES-",
            Self::AI_POS => "AI+",
            Self::AI_NEG => "AI-",
            Self::LD_POS => "LD+",
            Self::LD_NEG => "LD-",
            Self::FI_POS => "FI+",
            Self::FI_NEG => "FI-",
            Self::Unknown => "Unknown",
        }
    }

    pub const fn polarity(&self) -> ScanPolarity {
        match self {
            Self::Unknown => ScanPolarity::Unknown,
            // Positive modes take the even codes
            _ if (*self as u8) % 2 == 0 => ScanPolarity::Positive,
            _ => ScanPolarity::Negative,
        }
    }
}

impl From<u32> for IonMode {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::EI_POS,
            1 => Self::EI_NEG,
            2 => Self::CI_POS,
            3 => Self::CI_NEG,
            4 => Self::FB_POS,
            5 => Self::FB_NEG,
            6 => Self::TS_POS,
            7 => Self::TS_NEG,
            8 => Self::ES_POS,
            9 => Self::ES_NEG,
            10 => Self::AI_POS,
            11 => Self::AI_NEG,
            12 => Self::LD_POS,
            13 => Self::LD_NEG,
            14 => Self::FI_POS,
            15 => Self::FI_NEG,
            _ => Self::Unknown,
        }
    }
}

impl Display for IonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The acquisition data type of a function, its "format code". It selects the
/// on-disk layout of the function's scan index records and the formulas used
/// to unpack their base peak mass and intensity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataFormat {
    #[default]
    Compressed,
    Standard,
    SIROrMRM,
    ScanningContinuum,
    MCA,
    MCAWithSD,
    MCB,
    MCBWithSD,
    MolecularWeight,
    HighAccuracyCalibrated,
    /// Reserved by the instrument software, never written
    SingleFloat,
    EnhancedUncalibrated,
    EnhancedCalibrated,
    Other(u8),
}

impl DataFormat {
    pub const fn code(&self) -> u8 {
        match self {
            Self::Compressed => 0,
            Self::Standard => 1,
            Self::SIROrMRM => 2,
            Self::ScanningContinuum => 3,
            Self::MCA => 4,
            Self::MCAWithSD => 5,
            Self::MCB => 6,
            Self::MCBWithSD => 7,
            Self::MolecularWeight => 8,
            Self::HighAccuracyCalibrated => 9,
            Self::SingleFloat => 10,
            Self::EnhancedUncalibrated => 11,
            Self::EnhancedCalibrated => 12,
            Self::Other(code) => *code,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Compressed => "compressed",
            Self::Standard => "standard",
            Self::SIROrMRM => "SIR or MRM",
            Self::ScanningContinuum => "scanning continuum",
            Self::MCA => "MCA",
            Self::MCAWithSD => "MCA with SD",
            Self::MCB => "MCB",
            Self::MCBWithSD => "MCB with SD",
            Self::MolecularWeight => "molecular weight data",
            Self::HighAccuracyCalibrated => "high accuracy calibrated data",
            Self::SingleFloat => "single float precision",
            Self::EnhancedUncalibrated => "enhanced uncalibrated data",
            Self::EnhancedCalibrated => "enhanced calibrated accurate mass data",
            Self::Other(_) => "unknown",
        }
    }

    /// Only the compressed format uses the scan record layout without a
    /// separate base peak intensity field
    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed)
    }

    pub const fn is_continuum(&self) -> bool {
        matches!(self, Self::ScanningContinuum)
    }
}

impl From<u8> for DataFormat {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Compressed,
            1 => Self::Standard,
            2 => Self::SIROrMRM,
            3 => Self::ScanningContinuum,
            4 => Self::MCA,
            5 => Self::MCAWithSD,
            6 => Self::MCB,
            7 => Self::MCBWithSD,
            8 => Self::MolecularWeight,
            9 => Self::HighAccuracyCalibrated,
            10 => Self::SingleFloat,
            11 => Self::EnhancedUncalibrated,
            12 => Self::EnhancedCalibrated,
            _ => Self::Other(value),
        }
    }
}

impl Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}
