//! Plate reader type definitions

use std::fmt;

use crate::error::ErrorCode;

/// Result of a single call into the reader
pub type DeviceResult<T> = std::result::Result<T, ErrorCode>;

/// Wells on an SBS 96 plate
pub const WELL_COUNT: usize = 96;

/// Plate columns (1..12)
pub const COLUMNS: usize = 12;

/// A reader the driver can open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Driver-assigned handle, stable for the process lifetime
    pub handle: u64,

    /// Product name
    pub name: String,

    /// Serial number
    pub serial: String,
}

/// State of the measurement bay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Occupied,
    Unknown,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotState::Empty => "EMPTY",
            SlotState::Occupied => "OCCUPIED",
            SlotState::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Single-wavelength absorbance measurement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleMeasurementConfig {
    /// Sample wavelength (nm)
    pub sample_wavelength: u32,
}

/// One full-plate read
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    /// Wavelength the plate was read at (nm)
    pub wavelength: u32,

    /// Optical density per well, row-major (A1, A2, .., H12)
    pub values: Vec<f64>,
}

impl PlateReading {
    /// Reading of a named well such as "B7"
    pub fn well(&self, name: &str) -> Option<f64> {
        well_index(name).and_then(|i| self.values.get(i).copied())
    }
}

/// Name of the well at a row-major index
pub fn well_name(index: usize) -> String {
    let row = (b'A' + (index / COLUMNS) as u8) as char;
    format!("{}{}", row, index % COLUMNS + 1)
}

/// Row-major index of a named well
pub fn well_index(name: &str) -> Option<usize> {
    let mut chars = name.trim().chars();
    let row = chars.next()?.to_ascii_uppercase();
    if !('A'..='H').contains(&row) {
        return None;
    }
    let column: usize = chars.as_str().parse().ok()?;
    if !(1..=COLUMNS).contains(&column) {
        return None;
    }
    Some((row as usize - 'A' as usize) * COLUMNS + column - 1)
}
