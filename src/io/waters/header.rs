use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::io::utils::ContainerStorage;

use super::constants::{HEADER_FILE, MAX_CALIBRATION_COEFFICIENTS};
use super::functions::FunctionDescriptor;

/// Every metadata line of the header file starts with this
const SENTINEL: &str = "$$";

const FUNCTION_CALIBRATION_PREFIX: &str = "Cal Function ";
const FUNCTION_CALIBRATION_STDDEV_SUFFIX: &str = " Std Dev";

/// Parse a number, treating anything unparsable as zero
fn parse_or_zero<T: FromStr + Default>(value: &str) -> T {
    value.trim().parse().unwrap_or_default()
}

/// How a calibration's polynomial relates raw to calibrated mass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CalibrationType {
    /// The polynomial is in mass, `T0`
    #[default]
    Normal,
    /// The polynomial is in the square root of mass, `T1`
    RootMass,
}

/// A mass calibration as recorded by the acquisition software. It is parsed and
/// exposed, never applied to masses read from the container.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationModel {
    /// Polynomial coefficients, lowest order first
    pub coefficients: Vec<f64>,
    pub calibration_type: CalibrationType,
    pub standard_deviation: Option<f64>,
}

impl CalibrationModel {
    pub fn new(
        coefficients: Vec<f64>,
        calibration_type: CalibrationType,
        standard_deviation: Option<f64>,
    ) -> Self {
        Self {
            coefficients,
            calibration_type,
            standard_deviation,
        }
    }

    /// Parse a calibration from a comma separated header value such as
    /// `1.2e-3,0.99996,0.0,T1`.
    ///
    /// Numeric tokens are coefficients, of which at most
    /// [`MAX_CALIBRATION_COEFFICIENTS`] are kept. A `T` token selects the
    /// calibration type and an `S` token carries the standard deviation.
    /// Returns [`None`] when the value has no tokens at all.
    pub fn parse(value: &str) -> Option<Self> {
        let mut this = Self::default();
        let mut seen_any = false;
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            seen_any = true;
            if let Some(kind) = token.strip_prefix(['T', 't']) {
                this.calibration_type = match kind.trim() {
                    "1" => CalibrationType::RootMass,
                    _ => CalibrationType::Normal,
                };
            } else if let Some(sd) = token.strip_prefix(['S', 's']) {
                this.standard_deviation = Some(parse_or_zero(sd));
            } else if this.coefficients.len() < MAX_CALIBRATION_COEFFICIENTS {
                this.coefficients.push(parse_or_zero(token));
            }
        }
        seen_any.then_some(this)
    }
}

/// The process role a static calibration was recorded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationRole {
    /// `Cal MS1 Static`
    Primary,
    /// `Cal MS2 Static`
    Secondary,
}

/// Acquisition metadata parsed from the container's `_HEADER.TXT`
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderMetadata {
    pub acquired_name: String,
    pub acquired_date: String,
    pub acquired_time: String,
    pub instrument: String,
    pub sample_description: String,
    pub submitter: String,
    pub job_code: String,
    pub task_code: String,
    pub user_name: String,
    pub conditions: String,
    pub laboratory_name: String,
    pub solvent_delay: f64,
    pub mux_stream: i64,
    pub version: f64,
    pub primary_calibration: Option<CalibrationModel>,
    pub secondary_calibration: Option<CalibrationModel>,
    /// Every metadata line in file order, including those without a typed field
    fields: IndexMap<String, String>,
    /// Per-function calibration lines, keyed by function number and held until
    /// [`HeaderMetadata::calibrate_functions`] routes them.
    function_calibrations: BTreeMap<usize, (Option<String>, Option<String>)>,
}

impl HeaderMetadata {
    /// Parse the text of a header file. Lines without the metadata sentinel
    /// and keys that are not recognized are skipped, this cannot fail.
    pub fn parse(text: &str) -> Self {
        let mut this = Self::default();
        for line in text.lines() {
            let Some(rest) = line.trim_start().strip_prefix(SENTINEL) else {
                continue;
            };
            let Some((key, value)) = rest.split_once(':') else {
                continue;
            };
            this.set(key.trim(), value.trim());
        }
        this
    }

    fn set(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
        match key {
            "Acquired Name" => self.acquired_name = value.to_string(),
            "Acquired Date" => self.acquired_date = value.to_string(),
            "Acquired Time" => self.acquired_time = value.to_string(),
            "Instrument" => self.instrument = value.to_string(),
            "Sample Description" => self.sample_description = value.to_string(),
            "Submitter" => self.submitter = value.to_string(),
            "Job Code" => self.job_code = value.to_string(),
            "Task Code" => self.task_code = value.to_string(),
            "User Name" => self.user_name = value.to_string(),
            "Conditions" => self.conditions = value.to_string(),
            "Laboratory Name" => self.laboratory_name = value.to_string(),
            "Solvent Delay" => self.solvent_delay = parse_or_zero(value),
            "Mux Stream" => self.mux_stream = parse_or_zero(value),
            "Version" => self.version = parse_or_zero(value),
            "Cal MS1 Static" => self.primary_calibration = CalibrationModel::parse(value),
            "Cal MS2 Static" => self.secondary_calibration = CalibrationModel::parse(value),
            _ => {
                if let Some(rest) = key.strip_prefix(FUNCTION_CALIBRATION_PREFIX) {
                    self.stash_function_calibration(rest, value);
                }
            }
        }
    }

    fn stash_function_calibration(&mut self, rest: &str, value: &str) {
        let (number, is_stddev) = match rest.strip_suffix(FUNCTION_CALIBRATION_STDDEV_SUFFIX) {
            Some(number) => (number, true),
            None => (rest, false),
        };
        let Ok(function) = number.trim().parse::<usize>() else {
            return;
        };
        let entry = self.function_calibrations.entry(function).or_default();
        if is_stddev {
            entry.1 = Some(value.to_string());
        } else {
            entry.0 = Some(value.to_string());
        }
    }

    /// Read and parse the header file of the container at `directory`
    pub fn read<S: ContainerStorage + ?Sized>(storage: &S, directory: &Path) -> io::Result<Self> {
        let text = storage.read_to_string(&directory.join(HEADER_FILE))?;
        Ok(Self::parse(&text))
    }

    /// The static calibration for a process role
    pub fn calibration(&self, role: CalibrationRole) -> Option<&CalibrationModel> {
        match role {
            CalibrationRole::Primary => self.primary_calibration.as_ref(),
            CalibrationRole::Secondary => self.secondary_calibration.as_ref(),
        }
    }

    /// Look up a raw header value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Every metadata key and value in the order they appeared
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Combine the acquired date and time, e.g. `05-Mar-2019` and `14:22:10`
    pub fn acquisition_datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.acquired_date.trim(), "%d-%b-%Y").ok()?;
        let time = NaiveTime::parse_from_str(self.acquired_time.trim(), "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(self.acquired_time.trim(), "%H:%M"))
            .ok()?;
        Some(date.and_time(time))
    }

    /// Route the per-function calibration lines to the functions they name.
    ///
    /// This runs once the function table exists. Lines naming a function that is
    /// not in `functions` are dropped.
    pub fn calibrate_functions(&self, functions: &mut [FunctionDescriptor]) {
        for (function, (model, stddev)) in self.function_calibrations.iter() {
            let Some(descriptor) = function
                .checked_sub(1)
                .and_then(|i| functions.get_mut(i))
            else {
                debug!("Calibration for function {function} has no matching function record");
                continue;
            };
            let mut calibration = model
                .as_deref()
                .and_then(CalibrationModel::parse)
                .unwrap_or_default();
            if let Some(stddev) = stddev {
                calibration.standard_deviation = Some(parse_or_zero(stddev));
            }
            descriptor.calibration = Some(calibration);
        }
    }
}
