//! Running external tools
//!
//! Every external program (`idf.py`, `parttool.py`) is described by an
//! [Invocation] and executed through a [ProcessRunner]. [SystemRunner] spawns
//! real processes; [RecordingRunner] only records what would have been run,
//! which is what the test suites use.

use std::{
    collections::VecDeque,
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};

use log::{debug, info};

use crate::error::Error;

/// An external command: program, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Executes [Invocation]s
pub trait ProcessRunner {
    /// Run `invocation` to completion.
    ///
    /// Returns the exit code, which is always 0: a non-zero exit is reported
    /// as [Error::ExternalToolFailure].
    fn run(&mut self, invocation: &Invocation) -> Result<i32, Error>;
}

/// Spawns invocations as child processes of the current process
///
/// The child inherits stdout and stderr, and the caller blocks until it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32, Error> {
        info!(">> {invocation}");
        if let Some(dir) = invocation.working_dir() {
            debug!("Working directory: {}", dir.display());
        }

        let status = invocation
            .to_command()
            .status()
            .map_err(|source| Error::Spawn {
                program: invocation.program().to_path_buf(),
                source,
            })?;

        let code = exit_code(status);
        debug!("Command exit code: {code}");

        check_exit_code(code)
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status.code().or_else(|| status.signal()).unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

fn check_exit_code(code: i32) -> Result<i32, Error> {
    match code {
        0 => Ok(0),
        code => Err(Error::ExternalToolFailure { code }),
    }
}

/// Records invocations instead of running them
///
/// Exit codes are handed out in the order they were queued; once the queue is
/// empty every invocation succeeds.
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    invocations: Vec<Invocation>,
    exit_codes: VecDeque<i32>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the exit codes returned by the next invocations
    pub fn with_exit_codes(exit_codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            invocations: Vec::new(),
            exit_codes: exit_codes.into_iter().collect(),
        }
    }

    /// Invocations seen so far, oldest first
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32, Error> {
        debug!("Recording command: {invocation}");
        self.invocations.push(invocation.clone());

        check_exit_code(self.exit_codes.pop_front().unwrap_or(0))
    }
}
