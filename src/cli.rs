//! Command-line interface
//!
//! No stability guaranties apply

use std::path::PathBuf;

use clap::Parser;
use log::{debug, LevelFilter};

use crate::{
    config::{Config, ProcessEnv},
    error::Error,
    pipeline::{FlashRequest, Pipeline, DEFAULT_BAUD},
    process::SystemRunner,
    target::Target,
    toolchain::ToolchainLocator,
};

/// Build and flash the Vigilant Engine main or recovery image
#[derive(Debug, Parser)]
#[command(about, version)]
pub struct Cli {
    /// Image to flash
    #[arg(value_enum)]
    pub target: Target,
    /// Serial port (e.g. COM7 or /dev/ttyACM0)
    #[arg(long)]
    pub port: String,
    /// Baud rate [default: 921600]
    #[arg(long)]
    pub baud: Option<u32>,
    /// Skip the idf.py build step
    #[arg(long)]
    pub no_build: bool,
    /// Root of the Vigilant Engine repository
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,
    /// Do not guard the serial port against concurrent flashing sessions
    #[arg(long)]
    pub no_port_lock: bool,
    /// Log level
    #[arg(long, default_value = "info", env = "VIGILANT_FLASH_LOG")]
    pub log_level: LevelFilter,
}

impl Cli {
    /// The flash request described by these arguments, with `config`
    /// supplying values that were not given on the command line
    pub fn request(&self, config: &Config) -> FlashRequest {
        let baud = self.baud.or(config.baudrate).unwrap_or(DEFAULT_BAUD);

        FlashRequest::new(self.target, self.port.clone())
            .with_baud(baud)
            .skip_build(self.no_build)
    }
}

/// Run the pipeline for `cli` against real processes and the process
/// environment.
pub fn run(cli: &Cli) -> Result<(), Error> {
    let config = Config::load()?;
    let request = cli.request(&config);
    debug!("{request:#?}");

    let locator = ToolchainLocator::new(ProcessEnv)
        .with_fallback_root(config.idf_path.clone())
        .with_python(config.python.clone());

    let port_lock_dir = (config.lock_port && !cli.no_port_lock).then(std::env::temp_dir);

    Pipeline::new(SystemRunner, locator, cli.project_dir.clone())
        .with_port_lock_dir(port_lock_dir)
        .run(&request)
}
