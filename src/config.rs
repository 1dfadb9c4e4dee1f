//! Configuration management for the Absorbance MCP Server
//!
//! Handles environment variables, plate layout and device defaults.

use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Configuration for the Absorbance MCP Server
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Plate layout used by the assay metrics
    pub layout: AssayLayout,

    /// Concentrations used when a metrics call omits them
    pub default_concentrations: String,

    /// Wavelength used when a read call omits it (nm)
    pub default_wavelength: u32,

    /// Number of readers the simulated driver advertises
    pub simulated_devices: usize,

    /// Whether the simulated bay loads and ejects plates by itself
    pub simulated_autoload: bool,
}

/// Plate layout constants for the standard curve and replicate groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssayLayout {
    /// Readings paired with concentrations to form the standard curve
    pub curve_points: usize,

    /// Readings per replicate group
    pub replicate_size: usize,

    /// Leading readings considered for replicate CV
    pub max_replicate_readings: usize,
}

impl AssayLayout {
    /// Check that the layout can produce an R² and a sample standard deviation
    pub fn validate(&self) -> Result<()> {
        if self.curve_points == 0 {
            return Err(invalid("curve points must be at least 1"));
        }
        if self.replicate_size < 2 {
            return Err(invalid("replicate size must be at least 2"));
        }
        if self.max_replicate_readings < self.replicate_size {
            return Err(invalid(
                "max replicate readings must cover at least one replicate group",
            ));
        }
        Ok(())
    }
}

impl Default for AssayLayout {
    fn default() -> Self {
        Self {
            curve_points: defaults::CURVE_POINTS,
            replicate_size: defaults::REPLICATE_SIZE,
            max_replicate_readings: defaults::MAX_REPLICATE_READINGS,
        }
    }
}

impl Config {
    /// Create a new configuration from the environment
    pub fn new() -> Result<Self> {
        let layout = AssayLayout {
            curve_points: env_or("ABSORBANCE_CURVE_POINTS", defaults::CURVE_POINTS)?,
            replicate_size: env_or("ABSORBANCE_REPLICATE_SIZE", defaults::REPLICATE_SIZE)?,
            max_replicate_readings: env_or(
                "ABSORBANCE_MAX_REPLICATE_READINGS",
                defaults::MAX_REPLICATE_READINGS,
            )?,
        };
        layout.validate()?;

        let default_concentrations = std::env::var("ABSORBANCE_DEFAULT_CONCENTRATIONS")
            .unwrap_or_else(|_| defaults::CONCENTRATIONS.to_string());

        Ok(Self {
            layout,
            default_concentrations,
            default_wavelength: env_or("ABSORBANCE_DEFAULT_WAVELENGTH", defaults::WAVELENGTH)?,
            simulated_devices: env_or("ABSORBANCE_SIM_DEVICES", 1)?,
            simulated_autoload: env_or("ABSORBANCE_SIM_AUTOLOAD", true)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: AssayLayout::default(),
            default_concentrations: defaults::CONCENTRATIONS.to_string(),
            default_wavelength: defaults::WAVELENGTH,
            simulated_devices: 1,
            simulated_autoload: true,
        }
    }
}

/// Read and parse an environment variable, falling back when it is unset
fn env_or<T: FromStr>(var: &str, default: T) -> Result<T> {
    match std::env::var(var) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                value,
            }
            .into()),
        },
        Err(_) => Ok(default),
    }
}

fn invalid(message: &str) -> crate::error::AbsorbanceMcpError {
    ConfigError::InvalidConfig {
        message: message.to_string(),
    }
    .into()
}

/// Built-in defaults
pub mod defaults {
    /// Six-point standard curve
    pub const CURVE_POINTS: usize = 6;

    /// Triplicates
    pub const REPLICATE_SIZE: usize = 3;

    /// Six triplicate groups
    pub const MAX_REPLICATE_READINGS: usize = 18;

    /// Standard concentrations (ng/mL)
    pub const CONCENTRATIONS: &str = "0,10,20,50,100,200";

    /// Tartrazine is read at 450 nm
    pub const WAVELENGTH: u32 = 450;
}
