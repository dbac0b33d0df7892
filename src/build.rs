//! Building a project with `idf.py`

use std::path::Path;

use log::info;

use crate::{
    error::Error,
    process::{Invocation, ProcessRunner},
    toolchain::ToolchainEnvironment,
};

/// Build the ESP-IDF project at `project_root`.
///
/// `reconfigure` always runs ahead of `build` so that changes to the project
/// configuration are picked up by the build.
pub fn build<R: ProcessRunner + ?Sized>(
    runner: &mut R,
    env: &ToolchainEnvironment,
    project_root: &Path,
) -> Result<(), Error> {
    info!("Building {}", project_root.display());

    let invocation = Invocation::new(env.python())
        .arg(env.build_tool())
        .arg("-C")
        .arg(project_root)
        .args(["reconfigure", "build"])
        .current_dir(project_root);

    runner.run(&invocation)?;

    Ok(())
}
