//! Writing an image to a named partition with `parttool.py`

use std::path::Path;

use log::info;

use crate::{
    error::Error,
    process::{Invocation, ProcessRunner},
    toolchain::ToolchainEnvironment,
};

/// Parameters of a single partition write
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    /// Serial port the device is connected to
    pub port: &'a str,
    /// Baud rate to flash at
    pub baud: u32,
    /// Name of the destination partition
    pub partition: &'a str,
    /// Image to write
    pub binary: &'a Path,
}

/// Check that the image to be written exists.
pub fn validate_artifact(binary: &Path) -> Result<(), Error> {
    if binary.is_file() {
        Ok(())
    } else {
        Err(Error::MissingArtifact {
            path: binary.to_path_buf(),
        })
    }
}

/// Write `request.binary` to `request.partition`.
///
/// The partition tool is only launched once the image is known to exist.
pub fn write_partition<R: ProcessRunner + ?Sized>(
    runner: &mut R,
    env: &ToolchainEnvironment,
    request: &WriteRequest<'_>,
) -> Result<(), Error> {
    validate_artifact(request.binary)?;

    info!(
        "Writing {} to partition '{}' on {}",
        request.binary.display(),
        request.partition,
        request.port
    );

    let invocation = Invocation::new(env.python())
        .arg(env.partition_tool())
        .args(["--port", request.port])
        .args(["--baud", &request.baud.to_string()])
        .arg("write_partition")
        .args(["--partition-name", request.partition])
        .arg("--input")
        .arg(request.binary);

    runner.run(&invocation)?;

    Ok(())
}
