//! Exclusive use of a serial port across flashing sessions
//!
//! A session holds an OS advisory lock on a file named after the port for its
//! whole duration, and a second session on the same port is rejected instead
//! of queued. The operating system drops the lock when the holding process
//! exits, however it exits, so a file left behind never blocks a later
//! session.

use std::{
    fs::{File, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use log::debug;

use crate::error::Error;

/// An acquired port lock, released when dropped
#[derive(Debug)]
pub struct PortLock {
    path: PathBuf,
    _file: File,
}

impl PortLock {
    /// Take the lock for `port`, with the lock file placed in `dir`.
    pub fn acquire(dir: &Path, port: &str) -> Result<Self, Error> {
        let path = dir.join(lock_file_name(port));

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(err) = FileExt::try_lock_exclusive(&file) {
            if is_contended(&err) {
                return Err(Error::PortBusy {
                    port: port.to_string(),
                    lock: path,
                });
            }
            return Err(err.into());
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired port lock {}", path.display());

        Ok(PortLock { path, _file: file })
    }

    /// Location of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn lock_file_name(port: &str) -> String {
    let port: String = port
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    format!("vigilant-flash-{port}.lock")
}
