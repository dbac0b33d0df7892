//! Build and flash the two firmware images of a Vigilant Engine device
//!
//! The main application is written to the `ota_0` partition and the recovery
//! application to the `factory` partition. Building and writing are delegated
//! to the ESP-IDF tools (`idf.py` and `parttool.py`); this crate decides what
//! to run, where, and in which order.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod partition;
pub mod pipeline;
pub mod process;
pub mod target;
pub mod toolchain;

pub use config::{Config, ConfigSource, ProcessEnv};
pub use error::{ConfigurationError, Error};
pub use pipeline::{FlashRequest, Pipeline, Stage, DEFAULT_BAUD};
pub use process::{Invocation, ProcessRunner, RecordingRunner, SystemRunner};
pub use target::Target;
pub use toolchain::{ToolchainEnvironment, ToolchainLocator};
