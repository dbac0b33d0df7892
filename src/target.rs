//! Flashable images and where they live

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use strum::{Display, EnumIter};

/// Directory of the recovery project, relative to the repository root
const RECOVERY_PROJECT: &str = "vigilant-engine-recovery";

/// An image that can be built and flashed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum Target {
    /// Main application, written to the first OTA slot
    Main,
    /// Recovery application, written to the factory partition
    Recovery,
}

/// Static description of a [Target]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    /// Project directory relative to the repository root, `None` for the root
    /// itself
    pub project_dir: Option<&'static str>,
    /// Path components of the built image, relative to the repository root
    pub artifact: &'static [&'static str],
    /// Name of the partition the image is written to
    pub partition: &'static str,
}

impl Target {
    pub fn layout(self) -> TargetLayout {
        match self {
            Target::Main => TargetLayout {
                project_dir: None,
                artifact: &["build", "vigilant-engine.bin"],
                partition: "ota_0",
            },
            Target::Recovery => TargetLayout {
                project_dir: Some(RECOVERY_PROJECT),
                artifact: &[RECOVERY_PROJECT, "build", "vigilant-engine-recovery.bin"],
                partition: "factory",
            },
        }
    }

    /// Directory the build tool is run against
    pub fn project_root(self, repo_root: &Path) -> PathBuf {
        match self.layout().project_dir {
            Some(dir) => repo_root.join(dir),
            None => repo_root.to_path_buf(),
        }
    }

    /// Location of the built image
    pub fn artifact_path(self, repo_root: &Path) -> PathBuf {
        self.layout()
            .artifact
            .iter()
            .fold(repo_root.to_path_buf(), |path, component| path.join(component))
    }

    pub fn partition(self) -> &'static str {
        self.layout().partition
    }
}
