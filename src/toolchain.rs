//! ESP-IDF toolchain discovery

use std::path::{Path, PathBuf};

use log::debug;

use crate::{config::ConfigSource, error::ConfigurationError};

/// Variable naming the root of the ESP-IDF installation
pub const IDF_PATH: &str = "IDF_PATH";
/// Variable naming the Python virtual environment set up by ESP-IDF
pub const IDF_PYTHON_ENV_PATH: &str = "IDF_PYTHON_ENV_PATH";

#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";
#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";

/// Resolved locations of the ESP-IDF tools used for building and flashing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainEnvironment {
    sdk_root: PathBuf,
    build_tool: PathBuf,
    partition_tool: PathBuf,
    python: PathBuf,
}

impl ToolchainEnvironment {
    /// Root of the ESP-IDF installation
    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Path to `idf.py`
    pub fn build_tool(&self) -> &Path {
        &self.build_tool
    }

    /// Path to `parttool.py`
    pub fn partition_tool(&self) -> &Path {
        &self.partition_tool
    }

    /// Interpreter the tools are run with
    pub fn python(&self) -> &Path {
        &self.python
    }
}

/// Resolves a [ToolchainEnvironment] from a [ConfigSource]
#[derive(Debug)]
pub struct ToolchainLocator<S> {
    source: S,
    fallback_root: Option<PathBuf>,
    python: Option<PathBuf>,
}

impl<S: ConfigSource> ToolchainLocator<S> {
    /// Create a locator reading `IDF_PATH` from `source`
    pub fn new(source: S) -> Self {
        Self {
            source,
            fallback_root: None,
            python: None,
        }
    }

    /// SDK root to use when the source does not provide one
    pub fn with_fallback_root(mut self, root: Option<PathBuf>) -> Self {
        self.fallback_root = root;
        self
    }

    /// Interpreter to use instead of auto-detecting one
    pub fn with_python(mut self, python: Option<PathBuf>) -> Self {
        self.python = python;
        self
    }

    /// Find the SDK root and the tools below it, without launching anything
    pub fn resolve(&self) -> Result<ToolchainEnvironment, ConfigurationError> {
        let sdk_root = self
            .source
            .var(IDF_PATH)
            .filter(|root| !root.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.fallback_root.clone())
            .filter(|root| !root.as_os_str().is_empty())
            .ok_or(ConfigurationError::MissingSdkRoot)?;

        let build_tool = require_tool(sdk_root.join("tools").join("idf.py"))?;
        let partition_tool = require_tool(
            sdk_root
                .join("components")
                .join("partition_table")
                .join("parttool.py"),
        )?;
        let python = self.python();

        debug!(
            "Resolved ESP-IDF at {} (python: {})",
            sdk_root.display(),
            python.display()
        );

        Ok(ToolchainEnvironment {
            sdk_root,
            build_tool,
            partition_tool,
            python,
        })
    }

    fn python(&self) -> PathBuf {
        if let Some(python) = &self.python {
            return python.clone();
        }

        self.source
            .var(IDF_PYTHON_ENV_PATH)
            .filter(|env| !env.is_empty())
            .map(|env| venv_python(Path::new(&env)))
            .filter(|python| python.is_file())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON))
    }
}

fn require_tool(path: PathBuf) -> Result<PathBuf, ConfigurationError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigurationError::ToolNotFound { path })
    }
}

#[cfg(not(windows))]
fn venv_python(env: &Path) -> PathBuf {
    env.join("bin").join("python")
}

#[cfg(windows)]
fn venv_python(env: &Path) -> PathBuf {
    env.join("Scripts").join("python.exe")
}
