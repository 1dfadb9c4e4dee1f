//! Connected reader session
//!
//! A session exists only once a reader has been opened, so the measurement
//! calls never need a "not connected" branch.

use tracing::{debug, info, warn};

use crate::error::DeviceError;
use crate::reader::types::{DeviceInfo, PlateReading, SingleMeasurementConfig, SlotState};
use crate::reader::{PlateReader, ReaderDriver};

/// An open plate reader
pub struct ReaderSession {
    device: Box<dyn PlateReader>,
    info: DeviceInfo,
}

impl ReaderSession {
    /// Open the first reader the driver can see
    pub fn connect(driver: &dyn ReaderDriver) -> std::result::Result<Self, DeviceError> {
        let devices = driver.available_devices();
        let info = devices.into_iter().next().ok_or(DeviceError::NoDevices)?;

        let device = driver.open(&info).map_err(DeviceError::OpenFailed)?;
        info!(handle = info.handle, serial = %info.serial, "Connected to plate reader");

        Ok(Self { device, info })
    }

    /// Device handle
    pub fn handle(&self) -> u64 {
        self.info.handle
    }

    /// Device details
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Arm a measurement at `wavelength`.
    ///
    /// The slot must be empty, and the wavelength must be one the reader lists
    /// when it can list them.
    pub fn initialize(&mut self, wavelength: u32) -> std::result::Result<(), DeviceError> {
        if let Some(status) = self.slot_status() {
            if status != SlotState::Empty {
                return Err(DeviceError::PlateInSlot {
                    status: status.to_string(),
                });
            }
        }

        if self.device.available_wavelengths_supported() {
            let available =
                self.device
                    .available_wavelengths()
                    .map_err(|code| DeviceError::QueryFailed {
                        operation: "available wavelengths".to_string(),
                        code,
                    })?;
            if !available.contains(&wavelength) {
                return Err(DeviceError::WavelengthUnavailable {
                    wavelength,
                    available,
                });
            }
        } else {
            debug!(wavelength, "Reader cannot list wavelengths, arming unchecked");
        }

        let config = SingleMeasurementConfig {
            sample_wavelength: wavelength,
        };
        self.device
            .initialize_single_measurement(&config)
            .map_err(DeviceError::InitializeFailed)?;

        info!(handle = self.info.handle, wavelength, "Measurement armed");
        Ok(())
    }

    /// Read the inserted plate at `wavelength`
    pub fn measure(&mut self, wavelength: u32) -> std::result::Result<PlateReading, DeviceError> {
        if self.slot_status() == Some(SlotState::Empty) {
            return Err(DeviceError::NoPlate);
        }

        let config = SingleMeasurementConfig {
            sample_wavelength: wavelength,
        };
        let values = self
            .device
            .single_measure(&config)
            .map_err(DeviceError::MeasurementFailed)?;

        info!(
            handle = self.info.handle,
            wavelength,
            wells = values.len(),
            "Plate read"
        );
        Ok(PlateReading { wavelength, values })
    }

    /// Slot state, when the reader reports one
    fn slot_status(&self) -> Option<SlotState> {
        if !self.device.slot_status_supported() {
            return None;
        }
        match self.device.slot_status() {
            Ok(status) => Some(status),
            Err(code) => {
                warn!(%code, "Slot status query failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::reader::simulator::SimulatedDriver;
    use crate::reader::types::WELL_COUNT;

    #[test]
    fn test_connect_without_devices() {
        let driver = SimulatedDriver::new(0, true);
        let err = ReaderSession::connect(&driver).err();
        assert_eq!(err, Some(DeviceError::NoDevices));
    }

    #[test]
    fn test_connect_opens_first_device() {
        let driver = SimulatedDriver::new(2, true);
        let session = ReaderSession::connect(&driver).unwrap();
        assert_eq!(session.handle(), driver.available_devices()[0].handle);
    }

    #[test]
    fn test_initialize_and_measure() {
        let driver = SimulatedDriver::new(1, true);
        let mut session = ReaderSession::connect(&driver).unwrap();

        session.initialize(450).unwrap();
        let reading = session.measure(450).unwrap();
        assert_eq!(reading.wavelength, 450);
        assert_eq!(reading.values.len(), WELL_COUNT);
    }

    #[test]
    fn test_initialize_rejects_occupied_slot() {
        let driver = SimulatedDriver::new(1, false);
        driver.bay().insert_plate();
        let mut session = ReaderSession::connect(&driver).unwrap();

        let err = session.initialize(450).unwrap_err();
        assert_eq!(
            err,
            DeviceError::PlateInSlot {
                status: "OCCUPIED".to_string()
            }
        );
    }

    #[test]
    fn test_initialize_rejects_unlisted_wavelength() {
        let driver = SimulatedDriver::new(1, true);
        let mut session = ReaderSession::connect(&driver).unwrap();

        match session.initialize(500) {
            Err(DeviceError::WavelengthUnavailable { wavelength, available }) => {
                assert_eq!(wavelength, 500);
                assert!(available.contains(&450));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_initialize_without_wavelength_listing_defers_to_device() {
        let driver = SimulatedDriver::new(1, false).without_wavelength_listing();
        let mut session = ReaderSession::connect(&driver).unwrap();

        session.initialize(450).unwrap();
        let err = session.initialize(500).unwrap_err();
        assert_eq!(err, DeviceError::InitializeFailed(ErrorCode::NotSupported));
    }

    #[test]
    fn test_measure_requires_plate() {
        let driver = SimulatedDriver::new(1, false);
        let mut session = ReaderSession::connect(&driver).unwrap();

        session.initialize(450).unwrap();
        assert_eq!(session.measure(450).unwrap_err(), DeviceError::NoPlate);

        driver.bay().insert_plate();
        assert!(session.measure(450).is_ok());
    }

    #[test]
    fn test_measure_without_slot_sensor_reaches_device() {
        let driver = SimulatedDriver::new(1, false).without_slot_sensor();
        let mut session = ReaderSession::connect(&driver).unwrap();

        session.initialize(450).unwrap();
        let err = session.measure(450).unwrap_err();
        assert_eq!(err, DeviceError::MeasurementFailed(ErrorCode::InvalidState));
    }

    #[test]
    fn test_measure_reports_device_failure() {
        let driver = SimulatedDriver::new(1, true);
        let mut session = ReaderSession::connect(&driver).unwrap();

        session.initialize(450).unwrap();
        driver.bay().fail_next_measurement(ErrorCode::Timeout);
        assert_eq!(
            session.measure(450).unwrap_err(),
            DeviceError::MeasurementFailed(ErrorCode::Timeout)
        );
    }
}
