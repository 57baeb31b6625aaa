//! Error types for confprobe.
//!
//! Two layers of errors exist:
//!
//! - [`ProbeError`] describes why a single probe ended up absent. It never
//!   escapes the run; it is stored in the probe's terminal state and counted.
//! - [`ConfigureError`] is the run-level error used for faults outside any
//!   probe (writing output files, invalid targets, and so on).
//!
//! # Error Handling Strategy
//!
//! - Probes catch their own filesystem and subprocess faults and convert them
//!   into a `ProbeError` so that one broken dependency cannot crash the run
//! - Use `anyhow::Error` (via `ConfigureError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Which kind of artifact a search was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Header,
    Library,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Header => write!(f, "header"),
            ArtifactKind::Library => write!(f, "library"),
        }
    }
}

/// Stage of the compile test that hit a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Execute,
    Version,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Compile => write!(f, "compilation"),
            Stage::Execute => write!(f, "execution"),
            Stage::Version => write!(f, "version query"),
        }
    }
}

/// Coarse classification of a probe failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    MissingArtifact,
    CompileFailure,
    ExecuteFailure,
    ToolNotFound,
    EnvironmentFault,
}

/// Why a single probe resolved to absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// Header or library files were not found in any search path.
    #[error("{probe}: {kind} files {missing:?} not found in {} search path(s)", searched.len())]
    MissingArtifact {
        probe: String,
        kind: ArtifactKind,
        missing: Vec<String>,
        searched: Vec<PathBuf>,
    },

    /// The test program did not build.
    #[error("{probe}: compilation of test program failed: {command}")]
    CompileFailure {
        probe: String,
        command: String,
        stdout: String,
        stderr: String,
    },

    /// The test binary ran but did not exit cleanly.
    #[error("{probe}: execution of test binary failed ({detail})")]
    ExecuteFailure {
        probe: String,
        code: Option<i32>,
        detail: String,
        stderr: String,
    },

    /// A compile, execute or version step exceeded its time bound.
    #[error("{probe}: {stage} timed out after {seconds}s")]
    Timeout {
        probe: String,
        stage: Stage,
        seconds: u64,
    },

    /// A required command could not be resolved.
    #[error("{probe}: '{command}' not found")]
    ToolNotFound { probe: String, command: String },

    /// Filesystem or subprocess fault (permission denied, compiler missing, ...).
    #[error("{probe}: {message}")]
    EnvironmentFault { probe: String, message: String },

    /// A custom detector decided the tool is not usable.
    #[error("{probe}: {message}")]
    DetectionFailed { probe: String, message: String },
}

impl ProbeError {
    /// The failure classification.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::MissingArtifact { .. } => FailureKind::MissingArtifact,
            ProbeError::CompileFailure { .. } => FailureKind::CompileFailure,
            ProbeError::ExecuteFailure { .. } | ProbeError::Timeout { .. } => {
                FailureKind::ExecuteFailure
            }
            ProbeError::ToolNotFound { .. } | ProbeError::DetectionFailed { .. } => {
                FailureKind::ToolNotFound
            }
            ProbeError::EnvironmentFault { .. } => FailureKind::EnvironmentFault,
        }
    }

    /// Name of the probe the error belongs to.
    pub fn probe(&self) -> &str {
        match self {
            ProbeError::MissingArtifact { probe, .. }
            | ProbeError::CompileFailure { probe, .. }
            | ProbeError::ExecuteFailure { probe, .. }
            | ProbeError::Timeout { probe, .. }
            | ProbeError::ToolNotFound { probe, .. }
            | ProbeError::EnvironmentFault { probe, .. }
            | ProbeError::DetectionFailed { probe, .. } => probe,
        }
    }

    /// Shorthand for a detector's negative verdict.
    pub fn detection(probe: &str, message: impl Into<String>) -> Self {
        ProbeError::DetectionFailed {
            probe: probe.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for an environment fault.
    pub fn environment(probe: &str, message: impl Into<String>) -> Self {
        ProbeError::EnvironmentFault {
            probe: probe.to_string(),
            message: message.into(),
        }
    }
}

/// Run-level error type.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// Unknown operating system name.
    #[error("Invalid build target: {value}")]
    InvalidTarget { value: String },

    /// Unknown architecture name.
    #[error("Invalid build architecture: {value}")]
    InvalidArch { value: String },

    /// Failed to write a generated file.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, ConfigureError>;
