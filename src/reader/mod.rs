//! Plate reader module
//!
//! Device access goes through two traits: a [`ReaderDriver`] enumerates and
//! opens readers, and each opened [`PlateReader`] exposes the calls needed for
//! a single-wavelength absorbance read. [`ReaderSession`] sequences those calls.

pub mod session;
pub mod simulator;
pub mod types;

pub use session::ReaderSession;
pub use simulator::{SimulatedBay, SimulatedDriver};
pub use types::{DeviceInfo, DeviceResult, PlateReading, SingleMeasurementConfig, SlotState};

/// An opened absorbance reader
pub trait PlateReader: Send {
    /// Whether the reader can report its slot state
    fn slot_status_supported(&self) -> bool;

    /// Current slot state
    fn slot_status(&self) -> DeviceResult<SlotState>;

    /// Whether the reader can list its wavelengths
    fn available_wavelengths_supported(&self) -> bool;

    /// Wavelengths (nm) the reader's filters support
    fn available_wavelengths(&self) -> DeviceResult<Vec<u32>>;

    /// Arm a single measurement
    fn initialize_single_measurement(&mut self, config: &SingleMeasurementConfig)
        -> DeviceResult<()>;

    /// Read the plate, one value per well
    fn single_measure(&mut self, config: &SingleMeasurementConfig) -> DeviceResult<Vec<f64>>;
}

/// Discovers and opens readers
pub trait ReaderDriver: Send + Sync {
    /// Readers currently attached
    fn available_devices(&self) -> Vec<DeviceInfo>;

    /// Open a reader returned by `available_devices`
    fn open(&self, device: &DeviceInfo) -> DeviceResult<Box<dyn PlateReader>>;
}
