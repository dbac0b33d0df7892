//! The build-and-flash pipeline
//!
//! A run goes through a fixed sequence of stages, each of which must succeed
//! before the next one starts:
//!
//! ```text
//! Start -> EnvironmentResolved -> BuildSkipped | BuildSucceeded
//!       -> ArtifactValidated -> PartitionWritten -> Done
//! ```
//!
//! Any error moves the pipeline to [Stage::Failed] and is returned to the
//! caller unchanged. Nothing is retried or rolled back.

use std::path::PathBuf;

use log::{debug, info};

use crate::{
    build::build,
    config::ConfigSource,
    error::Error,
    lock::PortLock,
    partition::{validate_artifact, write_partition, WriteRequest},
    process::ProcessRunner,
    target::Target,
    toolchain::ToolchainLocator,
};

/// Baud rate used when none is requested
pub const DEFAULT_BAUD: u32 = 921_600;

/// Inputs of a single flashing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRequest {
    pub target: Target,
    pub port: String,
    pub baud: u32,
    pub skip_build: bool,
}

impl FlashRequest {
    pub fn new(target: Target, port: impl Into<String>) -> Self {
        Self {
            target,
            port: port.into(),
            baud: DEFAULT_BAUD,
            skip_build: false,
        }
    }

    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn skip_build(mut self, skip_build: bool) -> Self {
        self.skip_build = skip_build;
        self
    }
}

/// Progress of a [Pipeline] run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Start,
    EnvironmentResolved,
    BuildSkipped,
    BuildSucceeded,
    ArtifactValidated,
    PartitionWritten,
    Done,
    Failed { reason: String },
}

/// Sequences toolchain resolution, build and partition write for a
/// [FlashRequest]
#[derive(Debug)]
pub struct Pipeline<R, S> {
    runner: R,
    locator: ToolchainLocator<S>,
    repo_root: PathBuf,
    port_lock_dir: Option<PathBuf>,
    stage: Stage,
}

impl<R: ProcessRunner, S: ConfigSource> Pipeline<R, S> {
    /// Create a pipeline for the repository at `repo_root`.
    ///
    /// A relative `repo_root` is resolved against the current directory when
    /// the pipeline runs.
    ///
    /// Port locking is disabled until a directory is set with
    /// [Pipeline::with_port_lock_dir].
    pub fn new(runner: R, locator: ToolchainLocator<S>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            locator,
            repo_root: repo_root.into(),
            port_lock_dir: None,
            stage: Stage::Start,
        }
    }

    /// Hold an exclusive lock on the serial port for the whole run, with the
    /// lock file kept in `dir`
    pub fn with_port_lock_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.port_lock_dir = dir;
        self
    }

    /// The runner every tool invocation went through
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Last stage reached by the most recent run
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn run(&mut self, request: &FlashRequest) -> Result<(), Error> {
        self.stage = Stage::Start;

        match self.execute(request) {
            Ok(()) => {
                self.advance(Stage::Done);
                Ok(())
            }
            Err(err) => {
                self.advance(Stage::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn execute(&mut self, request: &FlashRequest) -> Result<(), Error> {
        let env = self.locator.resolve()?;
        self.advance(Stage::EnvironmentResolved);

        let _lock = match &self.port_lock_dir {
            Some(dir) => Some(PortLock::acquire(dir, &request.port)?),
            None => None,
        };

        // Tools run inside the project directory, paths passed to them must
        // be absolute.
        let repo_root = std::path::absolute(&self.repo_root)?;
        debug!("Repository root: {}", repo_root.display());

        let target = request.target;
        let binary = target.artifact_path(&repo_root);

        if request.skip_build {
            info!("Skipping build of {target}");
            self.advance(Stage::BuildSkipped);
        } else {
            build(&mut self.runner, &env, &target.project_root(&repo_root))?;
            self.advance(Stage::BuildSucceeded);
        }

        validate_artifact(&binary)?;
        self.advance(Stage::ArtifactValidated);

        write_partition(
            &mut self.runner,
            &env,
            &WriteRequest {
                port: &request.port,
                baud: request.baud,
                partition: target.partition(),
                binary: &binary,
            },
        )?;
        self.advance(Stage::PartitionWritten);

        info!("Flashed {target} to partition '{}'", target.partition());

        Ok(())
    }

    fn advance(&mut self, stage: Stage) {
        debug!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}
