//! Dependency probes.
//!
//! A probe is the detection unit for one library or tool. Every probe walks
//! the same state machine:
//!
//! ```text
//! Unknown ──► Disabled
//!         ├─► SkippedByTarget
//!         └─► (checking) ──► Present | Absent
//! ```
//!
//! `perform_check` moves a probe out of `Unknown` exactly once. Later calls
//! return the terminal state unchanged.
//!
//! [`LibraryProbe`] resolves headers and libraries and validates them with a
//! [`TestHarness`]. [`ToolProbe`] looks up commands, or hands detection to an
//! injected [`ToolDetector`].

pub mod catalog;
pub mod detectors;
mod library;
mod tool;
pub mod which;

pub use library::LibraryProbe;
pub use tool::{DetectRequest, ToolDetection, ToolDetector, ToolProbe};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{ProbeOverride, RunOptions};
use crate::error::ProbeError;
use crate::harness::TestHarness;
use crate::paths::PathResolver;
use crate::runner::Diagnostics;
use crate::store::ConfigStore;
use crate::target::{Target, TargetSet};

/// What a successful check found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub version: Option<String>,
    /// Index 0 is the primary include path.
    pub include_paths: Vec<PathBuf>,
    /// Index 0 is the primary library path.
    pub library_paths: Vec<PathBuf>,
    pub command_path: Option<PathBuf>,
    /// Satisfied by an in-tree copy without validation.
    pub vendored: bool,
}

/// Tri-state probe result plus the two skip states.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ProbeState {
    /// Not checked yet.
    #[default]
    Unknown,
    /// Turned off by the operator.
    Disabled,
    /// Not applicable to the active target.
    SkippedByTarget,
    Present(Detection),
    Absent(ProbeError),
}

impl ProbeState {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProbeState::Unknown)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ProbeState::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ProbeState::Absent(_))
    }

    pub fn detection(&self) -> Option<&Detection> {
        match self {
            ProbeState::Present(d) => Some(d),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            ProbeState::Absent(e) => Some(e),
            _ => None,
        }
    }

    /// Summary table status text.
    pub fn status(&self) -> String {
        match self {
            ProbeState::Unknown => "?".to_string(),
            ProbeState::Disabled => "DISABLED".to_string(),
            ProbeState::SkippedByTarget => "skipped".to_string(),
            ProbeState::Present(d) => match d.command_path.as_deref().and_then(Path::file_name) {
                Some(bin) => format!("ok ({})", bin.to_string_lossy()),
                None => "ok".to_string(),
            },
            ProbeState::Absent(_) => "failed".to_string(),
        }
    }
}

/// Library or tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Library,
    Tool,
}

impl ProbeKind {
    /// Word used in `config_<kind>_disable_<name>` marker keys.
    pub fn marker(&self) -> &'static str {
        match self {
            ProbeKind::Library => "libs",
            ProbeKind::Tool => "tools",
        }
    }
}

/// Everything a probe may read or update while checking.
pub struct ProbeContext<'a> {
    pub store: &'a mut ConfigStore,
    pub resolver: &'a PathResolver,
    pub harness: &'a dyn TestHarness,
    pub options: &'a RunOptions,
    pub diagnostics: &'a mut Diagnostics,
}

impl ProbeContext<'_> {
    pub fn target(&self) -> Target {
        self.resolver.target()
    }

    pub fn host(&self) -> Target {
        self.options.host
    }

    pub fn source_root(&self) -> &Path {
        self.resolver.source_root()
    }
}

/// A checkable dependency.
pub trait Probe {
    fn name(&self) -> &str;

    fn kind(&self) -> ProbeKind;

    fn targets(&self) -> &TargetSet;

    fn state(&self) -> &ProbeState;

    /// Record the operator's override. Has no effect after the check ran.
    fn apply_override(&mut self, o: &ProbeOverride);

    /// Run the check once and return the terminal state.
    fn perform_check(&mut self, ctx: &mut ProbeContext<'_>) -> &ProbeState;

    fn status(&self) -> String {
        self.state().status()
    }
}

/// `VBOX_WITH_<VAR>` style name for a probe, e.g. `libstdc++` → `LIBSTDCPLUSPLUS`.
pub fn variable_base(name: &str) -> String {
    name.to_uppercase().replace('+', "PLUS").replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_base_rewrites_symbols() {
        assert_eq!(variable_base("zlib"), "ZLIB");
        assert_eq!(variable_base("libstdc++"), "LIBSTDCPLUSPLUS");
        assert_eq!(variable_base("libjpeg-turbo"), "LIBJPEG_TURBO");
    }

    #[test]
    fn status_strings() {
        assert_eq!(ProbeState::Unknown.status(), "?");
        assert_eq!(ProbeState::Disabled.status(), "DISABLED");
        assert_eq!(ProbeState::SkippedByTarget.status(), "skipped");
        assert_eq!(
            ProbeState::Absent(ProbeError::environment("x", "boom")).status(),
            "failed"
        );
        assert_eq!(ProbeState::Present(Detection::default()).status(), "ok");
    }

    #[test]
    fn status_names_binary() {
        let state = ProbeState::Present(Detection {
            command_path: Some(PathBuf::from("/usr/bin/yasm")),
            version: Some("yasm 1.3.0".into()),
            ..Default::default()
        });
        assert_eq!(state.status(), "ok (yasm)");
    }

    #[test]
    fn marker_words() {
        assert_eq!(ProbeKind::Library.marker(), "libs");
        assert_eq!(ProbeKind::Tool.marker(), "tools");
    }
}
