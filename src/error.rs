//! Error types for the Absorbance MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Absorbance MCP Server
#[derive(Error, Debug)]
pub enum AbsorbanceMcpError {
    /// Assay metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Status codes reported by the reader firmware
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("TIMEOUT")]
    Timeout,

    #[error("INVALID_STATE")]
    InvalidState,

    #[error("NOT_SUPPORTED")]
    NotSupported,

    #[error("DEVICE_NOT_FOUND")]
    DeviceNotFound,
}

/// Plate reader errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Please connect to Byonoy reader first")]
    NotConnected,

    #[error("No Byonoy devices found")]
    NoDevices,

    #[error("Failed to connect: {0}")]
    OpenFailed(ErrorCode),

    #[error("Remove plate first - slot status: {status}")]
    PlateInSlot { status: String },

    #[error("No plate detected. Please insert plate first.")]
    NoPlate,

    #[error("Wavelength {wavelength} not available. Available: {available:?}")]
    WavelengthUnavailable { wavelength: u32, available: Vec<u32> },

    #[error("Initialize failed: {0}")]
    InitializeFailed(ErrorCode),

    #[error("Measurement failed: {0}. Check plate positioning.")]
    MeasurementFailed(ErrorCode),

    #[error("Device query failed ({operation}): {code}")]
    QueryFailed { operation: String, code: ErrorCode },
}

/// Assay metrics errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("{series} list is empty")]
    EmptyInput { series: String },

    #[error("{series} value #{position} is not a number: '{token}'")]
    InvalidNumber {
        series: String,
        position: usize,
        token: String,
    },

    #[error("{series} value #{position} is not finite: '{token}'")]
    NonFinite {
        series: String,
        position: usize,
        token: String,
    },

    #[error("need at least {required} {series} values for the standard curve, got {actual}")]
    TooFewValues {
        series: String,
        required: usize,
        actual: usize,
    },

    #[error("replicate group {group} has a mean of zero, CV is undefined")]
    ZeroMeanReplicate { group: usize },

    #[error("replicate groups need at least 2 readings, layout has {replicate_size}")]
    InvalidLayout { replicate_size: usize },

    #[error("{quantity} is outside the floating-point range")]
    NumericOverflow { quantity: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnvVar { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },
}

/// Result type alias for Absorbance MCP operations
pub type Result<T> = std::result::Result<T, AbsorbanceMcpError>;
