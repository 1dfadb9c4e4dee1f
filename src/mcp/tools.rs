//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations.

use std::str::FromStr;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::assay;
use crate::assay::parse::format_values;
use crate::config::Config;
use crate::error::{DeviceError, McpError, ValidationError};
use crate::mcp::types::{CallToolResult, Tool};
use crate::reader::{ReaderDriver, ReaderSession};

/// Tool names
pub mod names {
    pub const CONNECT_READER: &str = "connect_byonoy_reader";
    pub const READ_ABSORBANCE: &str = "read_tartrazine_absorbance";
    pub const ASSAY_METRICS: &str = "calculate_assay_metrics";
}

const INVALID_STEP: &str = "Invalid step. Use step='initialize' or step='measure'";

/// Phase of a two-step plate read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStep {
    /// Check the slot is empty and arm the reader
    Initialize,
    /// Read the inserted plate
    Measure,
}

impl FromStr for MeasurementStep {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "initialize" => Ok(MeasurementStep::Initialize),
            "measure" => Ok(MeasurementStep::Measure),
            other => Err(ValidationError::InvalidParameter {
                name: "step".to_string(),
                message: format!("unknown step '{}'", other),
            }),
        }
    }
}

/// Arguments of `read_tartrazine_absorbance`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ReadAbsorbanceArgs {
    /// Measurement wavelength in nm (default 450)
    #[validate(range(min = 200, max = 1000))]
    pub wavelength: Option<u32>,

    /// 'initialize' first with the slot empty, then 'measure' after inserting the plate (default 'initialize')
    #[schemars(with = "Option<MeasurementStep>")]
    pub step: Option<String>,
}

/// Arguments of `calculate_assay_metrics`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AssayMetricsArgs {
    /// Comma-separated absorbance readings; the first six form the standard curve, consecutive triplicates give the CV
    pub absorbance_values: String,

    /// Comma-separated standard concentrations paired with the first readings (default "0,10,20,50,100,200")
    pub concentrations: Option<String>,
}

/// Tool handler
pub struct ToolHandler {
    config: Config,
    driver: Box<dyn ReaderDriver>,
    session: Option<ReaderSession>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(config: Config, driver: Box<dyn ReaderDriver>) -> Self {
        Self {
            config,
            driver,
            session: None,
        }
    }

    /// Whether a reader has been connected
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                names::CONNECT_READER,
                "Connect to the Byonoy plate reader",
                json!({"type": "object", "properties": {}}),
            ),
            tool_def(
                names::READ_ABSORBANCE,
                "Read absorbance values. Use step='initialize' first, then step='measure' after inserting plate",
                input_schema::<ReadAbsorbanceArgs>(),
            ),
            tool_def(
                names::ASSAY_METRICS,
                "Calculate R² and CV from tartrazine standard curve data",
                input_schema::<AssayMetricsArgs>(),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&mut self, name: &str, args: Value) -> CallToolResult {
        debug!(tool = name, "Tool call");
        match name {
            names::CONNECT_READER => self.handle_connect().await,
            names::READ_ABSORBANCE => self.handle_read_absorbance(args).await,
            names::ASSAY_METRICS => self.handle_assay_metrics(args).await,
            _ => CallToolResult::error(
                McpError::UnknownTool {
                    name: name.to_string(),
                }
                .to_string(),
            ),
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_connect(&mut self) -> CallToolResult {
        match ReaderSession::connect(self.driver.as_ref()) {
            Ok(session) => {
                let text = format!(
                    "Connected to Byonoy device successfully. Handle: {}",
                    session.handle()
                );
                if self.session.replace(session).is_some() {
                    info!("Replaced previous reader session");
                }
                CallToolResult::text(text)
            }
            Err(e) => device_failure(e),
        }
    }

    async fn handle_read_absorbance(&mut self, args: Value) -> CallToolResult {
        let args: ReadAbsorbanceArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        let Some(session) = self.session.as_mut() else {
            return device_failure(DeviceError::NotConnected);
        };

        if let Err(e) = args.validate() {
            let err = ValidationError::InvalidParameter {
                name: "wavelength".to_string(),
                message: e.to_string(),
            };
            return CallToolResult::error(err.to_string());
        }

        let step: MeasurementStep = match args.step.as_deref().unwrap_or("initialize").parse() {
            Ok(step) => step,
            Err(_) => return CallToolResult::failure(INVALID_STEP),
        };
        let wavelength = args.wavelength.unwrap_or(self.config.default_wavelength);

        match step {
            MeasurementStep::Initialize => match session.initialize(wavelength) {
                Ok(()) => CallToolResult::text(format!(
                    "✅ Measurement initialized at {}nm. INSERT PLATE NOW, then run with step='measure'",
                    wavelength
                )),
                Err(e) => device_failure(e),
            },
            MeasurementStep::Measure => match session.measure(wavelength) {
                Ok(reading) => CallToolResult::text(format!(
                    "📊 Absorbance values at {}nm: {}",
                    reading.wavelength,
                    format_values(&reading.values, 4)
                )),
                Err(e) => device_failure(e),
            },
        }
    }

    async fn handle_assay_metrics(&self, args: Value) -> CallToolResult {
        let args: AssayMetricsArgs = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        let concentrations = args
            .concentrations
            .as_deref()
            .unwrap_or(&self.config.default_concentrations);

        match assay::compute(&args.absorbance_values, concentrations, &self.config.layout) {
            Ok(metrics) => {
                debug!(
                    r_squared = metrics.r_squared,
                    groups = metrics.replicate_cvs.len(),
                    "Assay metrics calculated"
                );
                CallToolResult::text(metrics.to_string())
            }
            Err(e) => CallToolResult::error(format!("Failed to calculate metrics: {}", e)),
        }
    }
}

fn device_failure(err: DeviceError) -> CallToolResult {
    warn!(error = %err, "Reader operation failed");
    CallToolResult::failure(format!("❌ {}", err))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> std::result::Result<T, McpError> {
    // A call without arguments arrives as null
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn input_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
}
