//! Simulated Absorbance 96 reader
//!
//! Stands in for the vendor driver when no hardware is attached. Every reader
//! opened from one [`SimulatedDriver`] shares a single [`SimulatedBay`], which
//! holds the slot state, the armed wavelength and the plate contents.
//!
//! Readings follow Beer-Lambert for tartrazine: a blank offset plus a term
//! linear in concentration, scaled by a Gaussian absorption band around
//! 427 nm, plus a small fixed per-well offset so replicates are not identical.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::ErrorCode;
use crate::reader::types::{
    DeviceInfo, DeviceResult, SingleMeasurementConfig, SlotState, COLUMNS, WELL_COUNT,
};
use crate::reader::{PlateReader, ReaderDriver};

/// Filters fitted to the simulated reader (nm)
pub const SIMULATED_WAVELENGTHS: [u32; 4] = [405, 450, 492, 620];

/// Standards loaded on the default plate, as three series from A1
pub const DEFAULT_STANDARDS: [f64; 6] = [0.0, 10.0, 20.0, 50.0, 100.0, 200.0];

const BLANK_OD: f64 = 0.045;
const OD_PER_UNIT: f64 = 0.0045;
const PEAK_NM: f64 = 427.0;
const BAND_WIDTH_NM: f64 = 45.0;
const HANDLE_BASE: u64 = 0x4259_0000;

/// Bay shared by all readers of one driver
#[derive(Debug, Clone)]
pub struct SimulatedBay {
    state: Arc<Mutex<BayState>>,
}

#[derive(Debug)]
struct BayState {
    slot: SlotState,
    armed: Option<u32>,
    plate: Vec<f64>,
    autoload: bool,
    fail_next: Option<ErrorCode>,
}

impl SimulatedBay {
    /// Empty bay holding the default dilution plate.
    ///
    /// With `autoload`, arming a measurement loads the plate and a finished
    /// read ejects it.
    pub fn new(autoload: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(BayState {
                slot: SlotState::Empty,
                armed: None,
                plate: default_plate(),
                autoload,
                fail_next: None,
            })),
        }
    }

    pub fn insert_plate(&self) {
        self.lock().slot = SlotState::Occupied;
    }

    pub fn remove_plate(&self) {
        self.lock().slot = SlotState::Empty;
    }

    pub fn slot(&self) -> SlotState {
        self.lock().slot
    }

    /// Wavelength of the armed measurement
    pub fn armed_wavelength(&self) -> Option<u32> {
        self.lock().armed
    }

    /// Replace the plate contents, one concentration per well (row-major).
    /// Missing wells hold buffer only.
    pub fn load_plate(&self, concentrations: &[f64]) {
        let mut plate = vec![0.0; WELL_COUNT];
        for (well, c) in plate.iter_mut().zip(concentrations) {
            *well = *c;
        }
        self.lock().plate = plate;
    }

    /// Make the next read fail with `code`
    pub fn fail_next_measurement(&self, code: ErrorCode) {
        self.lock().fail_next = Some(code);
    }

    fn lock(&self) -> MutexGuard<'_, BayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Driver advertising simulated readers
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    devices: usize,
    wavelengths: Vec<u32>,
    slot_sensor: bool,
    wavelength_listing: bool,
    bay: SimulatedBay,
}

impl SimulatedDriver {
    pub fn new(devices: usize, autoload: bool) -> Self {
        Self {
            devices,
            wavelengths: SIMULATED_WAVELENGTHS.to_vec(),
            slot_sensor: true,
            wavelength_listing: true,
            bay: SimulatedBay::new(autoload),
        }
    }

    pub fn with_wavelengths(mut self, wavelengths: Vec<u32>) -> Self {
        self.wavelengths = wavelengths;
        self
    }

    /// Readers cannot report their slot state
    pub fn without_slot_sensor(mut self) -> Self {
        self.slot_sensor = false;
        self
    }

    /// Readers cannot list their wavelengths
    pub fn without_wavelength_listing(mut self) -> Self {
        self.wavelength_listing = false;
        self
    }

    /// Handle on the shared bay
    pub fn bay(&self) -> SimulatedBay {
        self.bay.clone()
    }
}

impl ReaderDriver for SimulatedDriver {
    fn available_devices(&self) -> Vec<DeviceInfo> {
        (0..self.devices)
            .map(|i| DeviceInfo {
                handle: HANDLE_BASE + i as u64,
                name: "Absorbance 96 (simulated)".to_string(),
                serial: format!("SIM-A96-{:04}", i + 1),
            })
            .collect()
    }

    fn open(&self, device: &DeviceInfo) -> DeviceResult<Box<dyn PlateReader>> {
        let known = self
            .available_devices()
            .iter()
            .any(|d| d.handle == device.handle);
        if !known {
            return Err(ErrorCode::DeviceNotFound);
        }

        debug!(handle = device.handle, "Opening simulated reader");
        Ok(Box::new(SimulatedReader {
            wavelengths: self.wavelengths.clone(),
            slot_sensor: self.slot_sensor,
            wavelength_listing: self.wavelength_listing,
            bay: self.bay.clone(),
        }))
    }
}

struct SimulatedReader {
    wavelengths: Vec<u32>,
    slot_sensor: bool,
    wavelength_listing: bool,
    bay: SimulatedBay,
}

impl PlateReader for SimulatedReader {
    fn slot_status_supported(&self) -> bool {
        self.slot_sensor
    }

    fn slot_status(&self) -> DeviceResult<SlotState> {
        if !self.slot_sensor {
            return Err(ErrorCode::NotSupported);
        }
        Ok(self.bay.slot())
    }

    fn available_wavelengths_supported(&self) -> bool {
        self.wavelength_listing
    }

    fn available_wavelengths(&self) -> DeviceResult<Vec<u32>> {
        if !self.wavelength_listing {
            return Err(ErrorCode::NotSupported);
        }
        Ok(self.wavelengths.clone())
    }

    fn initialize_single_measurement(
        &mut self,
        config: &SingleMeasurementConfig,
    ) -> DeviceResult<()> {
        if !self.wavelengths.contains(&config.sample_wavelength) {
            return Err(ErrorCode::NotSupported);
        }

        let mut bay = self.bay.lock();
        bay.armed = Some(config.sample_wavelength);
        if bay.autoload {
            bay.slot = SlotState::Occupied;
        }
        Ok(())
    }

    fn single_measure(&mut self, config: &SingleMeasurementConfig) -> DeviceResult<Vec<f64>> {
        let mut bay = self.bay.lock();
        if let Some(code) = bay.fail_next.take() {
            return Err(code);
        }
        if bay.armed != Some(config.sample_wavelength) || bay.slot != SlotState::Occupied {
            return Err(ErrorCode::InvalidState);
        }

        let band = band_factor(config.sample_wavelength);
        let values: Vec<f64> = bay
            .plate
            .iter()
            .enumerate()
            .map(|(well, c)| BLANK_OD + OD_PER_UNIT * c * band + well_offset(well))
            .collect();

        bay.armed = None;
        if bay.autoload {
            bay.slot = SlotState::Empty;
        }
        Ok(values)
    }
}

/// The standard series three times over A1..B6, so the first six wells
/// form the curve; the rest is buffer
fn default_plate() -> Vec<f64> {
    let mut plate = vec![0.0; WELL_COUNT];
    for (well, c) in plate.iter_mut().zip(DEFAULT_STANDARDS.iter().cycle().take(18)) {
        *well = *c;
    }
    plate
}

/// Relative tartrazine absorption at `wavelength`
fn band_factor(wavelength: u32) -> f64 {
    let d = (f64::from(wavelength) - PEAK_NM) / BAND_WIDTH_NM;
    (-0.5 * d * d).exp()
}

/// Fixed offset in [-0.002, 0.002] OD
fn well_offset(well: usize) -> f64 {
    let step = ((well * 7 + well / COLUMNS) % 9) as f64 - 4.0;
    step * 0.0005
}
