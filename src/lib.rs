//! Absorbance MCP Server Library
//!
//! A Model Context Protocol (MCP) server for a 96-well absorbance plate reader.
//! Provides tools for connecting the reader, reading plates, and scoring
//! standard-curve assays.

pub mod assay;
pub mod config;
pub mod error;
pub mod mcp;
pub mod reader;

pub use config::Config;
pub use error::{AbsorbanceMcpError, Result};
