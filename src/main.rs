//! Absorbance MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server for a 96-well absorbance plate reader.
//! Provides tools for connecting the reader, reading plates, and scoring
//! standard-curve assays.

use clap::{Parser, Subcommand};

use absorbance_mcp_server::assay;
use absorbance_mcp_server::config::Config;
use absorbance_mcp_server::error::Result;
use absorbance_mcp_server::mcp::server::McpServer;
use absorbance_mcp_server::mcp::tools::ToolHandler;
use absorbance_mcp_server::reader::{ReaderDriver, SimulatedDriver};

/// Absorbance MCP Server
#[derive(Parser)]
#[command(name = "absorbance-mcp-server")]
#[command(author, version, about = "Absorbance MCP Server - A Model Context Protocol server for a 96-well plate reader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate R² and average CV from readings without starting the server
    Metrics {
        /// Comma-separated absorbance readings
        #[arg(long)]
        absorbance: String,

        /// Comma-separated standard concentrations
        #[arg(long)]
        concentrations: Option<String>,
    },

    /// List readers the driver can see
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::new()?;

    match cli.command {
        Some(Commands::Metrics {
            absorbance,
            concentrations,
        }) => {
            let concentrations = concentrations.unwrap_or_else(|| config.default_concentrations.clone());
            match assay::compute(&absorbance, &concentrations, &config.layout) {
                Ok(metrics) => println!("{}", metrics),
                Err(e) => {
                    eprintln!("Error calculating metrics: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Devices) => {
            let driver = driver_for(&config);
            let devices = driver.available_devices();
            if devices.is_empty() {
                println!("No Byonoy devices found");
            }
            for device in devices {
                println!("{}\t{}\t{}", device.handle, device.serial, device.name);
            }
        }
        None => {
            // Run MCP server
            run_server(config).await?;
        }
    }

    Ok(())
}

fn driver_for(config: &Config) -> SimulatedDriver {
    SimulatedDriver::new(config.simulated_devices, config.simulated_autoload)
}

async fn run_server(config: Config) -> Result<()> {
    let driver = driver_for(&config);
    tracing::info!(
        devices = config.simulated_devices,
        autoload = config.simulated_autoload,
        "Using simulated reader driver"
    );

    let tool_handler = ToolHandler::new(config, Box::new(driver));

    // Create and run MCP server
    let mut server = McpServer::new(tool_handler);
    server.run_stdio().await?;

    Ok(())
}
