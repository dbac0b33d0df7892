//! Library and application errors

use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// All possible errors returned by vigilant-flash
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Firmware image not found: {}", .path.display())]
    #[diagnostic(
        code(vigilant_flash::missing_artifact),
        help("Build the project first, or drop `--no-build` so it is built before flashing")
    )]
    MissingArtifact { path: PathBuf },

    #[error("Serial port {port} is already in use (lock file: {})", .lock.display())]
    #[diagnostic(
        code(vigilant_flash::port_busy),
        help("Wait for the other flashing session to finish, or pass `--no-port-lock`")
    )]
    PortBusy { port: String, lock: PathBuf },

    #[error("Command failed with exit code {code}")]
    #[diagnostic(code(vigilant_flash::external_tool_failure))]
    ExternalToolFailure { code: i32 },

    #[error("Failed to launch {}", .program.display())]
    #[diagnostic(
        code(vigilant_flash::spawn),
        help("Ensure the program is installed and on your PATH, or set `python` in vigilant_flash.toml")
    )]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(vigilant_flash::io))]
    Io(#[from] io::Error),
}

impl Error {
    /// Process exit code to report for this error.
    ///
    /// Failures of an external tool keep that tool's own code, everything else
    /// maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ExternalToolFailure { code } => *code,
            _ => 1,
        }
    }
}

/// Errors detected while resolving the toolchain, before any process is
/// launched
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("IDF_PATH is not set")]
    #[diagnostic(
        code(vigilant_flash::missing_sdk_root),
        help(
            "Open an ESP-IDF shell or run export.sh / export.bat, \
             or set `idf_path` in vigilant_flash.toml"
        )
    )]
    MissingSdkRoot,

    #[error("ESP-IDF tool not found: {}", .path.display())]
    #[diagnostic(
        code(vigilant_flash::tool_not_found),
        help("Check that IDF_PATH points at the root of a complete ESP-IDF installation")
    )]
    ToolNotFound { path: PathBuf },

    #[error("Failed to read configuration file {}", .path.display())]
    #[diagnostic(code(vigilant_flash::unreadable_config))]
    UnreadableConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration file {}", .path.display())]
    #[diagnostic(
        code(vigilant_flash::invalid_config),
        help("Supported keys are `baudrate`, `python`, `idf_path` and `lock_port`")
    )]
    InvalidConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
