//! # texpick build
//!
//! Runs a TeX engine over an assembled document and reports whether a PDF came
//! out of it.
//!
//! A build is a fixed schedule of engine invocations:
//!
//! 1. a check pass with `-halt-on-error` and no PDF output, whose log is
//!    classified by [`texpick_log::LogClassifier`];
//! 2. full passes that produce the PDF and resolve references.
//!
//! The build succeeds when the check pass reports no errors and the final PDF
//! exists with a non-zero size. [`CompilationDriver::spawn`] runs the schedule
//! on a worker thread and streams [`BuildEvent`]s back over a channel.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod compiler;
pub mod driver;
pub mod events;

pub use compiler::{CommandExecutor, Compiler, Pass, RealCommandExecutor};
pub use driver::{CompilationDriver, CompilationHandle};
pub use events::{BuildEvent, Notifier};

pub const DEFAULT_ENGINE: &str = "pdflatex";
pub const DEFAULT_PASSES: u32 = 3;

/// Build settings, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Engine name looked up on `PATH`, or a path to the executable.
    pub engine: String,
    pub passes: u32,
    /// Ignore `No file main.aux.` and similar lines from a fresh first run.
    /// Off by default: every Missing File match fails the build.
    pub skip_auxiliary_missing: bool,
    /// Appended to every invocation before the input file.
    pub extra_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            passes: DEFAULT_PASSES,
            skip_auxiliary_missing: false,
            extra_args: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Number of engine invocations, never less than one.
    pub fn passes(&self) -> u32 {
        self.passes.max(1)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.engine.trim().is_empty() {
            return Err(BuildError::Config("engine must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("TeX engine `{0}` not found")]
    EngineNotFound(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a compilation of {0} is already running")]
    AlreadyRunning(PathBuf),
    #[error("invalid build configuration: {0}")]
    Config(String),
}

/// Outcome of one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationResult {
    pub succeeded: bool,
    /// The PDF, set only when it exists and is non-empty.
    pub artifact: Option<PathBuf>,
    /// Classified errors from the first pass, in log order.
    pub errors: Vec<String>,
    /// First-pass log, empty when the engine wrote none.
    pub raw_log: String,
    pub message: String,
}

impl CompilationResult {
    pub fn success(artifact: PathBuf, raw_log: String) -> Self {
        Self {
            succeeded: true,
            message: artifact.display().to_string(),
            artifact: Some(artifact),
            errors: Vec::new(),
            raw_log,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            ..Self::default()
        }
    }
}
