//! The plain configuration record a run is driven by.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::target::{BuildType, Target};

/// Operator override for a single probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeOverride {
    /// `--disable-<name>`
    pub disabled: bool,
    /// `--with-<name>-path`
    pub custom_path: Option<PathBuf>,
    /// `--only-<name>`
    pub only: bool,
}

/// Global feature switches recorded in the store and read by transform rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub headless: bool,
    pub disable_docs: bool,
    pub disable_python: bool,
    pub disable_pylint: bool,
    pub disable_sdl: bool,
    pub disable_udptunnel: bool,
    pub disable_com: bool,
    pub with_hardening: bool,
    pub without_hardening: bool,
    pub only_additions: bool,
    pub only_docs: bool,
    pub ose: bool,
}

/// Extra directories searched before or after the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathList {
    pub prepend: Vec<PathBuf>,
    pub append: Vec<PathBuf>,
}

impl PathList {
    /// `prepend`, then `defaults`, then `append`.
    pub fn around(&self, defaults: Vec<PathBuf>) -> Vec<PathBuf> {
        self.prepend
            .iter()
            .cloned()
            .chain(defaults)
            .chain(self.append.iter().cloned())
            .collect()
    }
}

/// Operator-adjustable search locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchPaths {
    pub programfiles: PathList,
    pub tools: PathList,
}

/// Where generated files go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFiles {
    pub autoconfig: PathBuf,
    pub env: PathBuf,
    pub log: PathBuf,
    pub summary_json: Option<PathBuf>,
}

impl OutputFiles {
    /// Default file names for a host family.
    pub fn for_host(windows: bool) -> Self {
        Self {
            autoconfig: PathBuf::from("AutoConfig.kmk"),
            env: PathBuf::from(if windows { "env.bat" } else { "env.sh" }),
            log: PathBuf::from("configure.log"),
            summary_json: None,
        }
    }
}

/// Everything the core needs to know about one configure run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub target: Target,
    pub host: Target,
    pub build_type: BuildType,
    pub debug: bool,
    pub continue_on_error: bool,
    pub verbosity: u8,
    pub source_root: PathBuf,
    pub out_base: Option<PathBuf>,
    pub kbuild_path: Option<PathBuf>,
    pub vcpkg_root: Option<PathBuf>,
    pub files: OutputFiles,
    pub features: FeatureFlags,
    pub search_paths: SearchPaths,
    pub probe_overrides: BTreeMap<String, ProbeOverride>,
    /// Arguments echoed into generated file banners.
    pub command_line: Vec<String>,
}

impl RunOptions {
    /// Defaults for configuring `target` on this machine.
    pub fn new(target: Target) -> Self {
        let host = Target::host();
        Self {
            target,
            host,
            build_type: BuildType::Release,
            debug: false,
            continue_on_error: false,
            verbosity: 0,
            source_root: PathBuf::from("."),
            out_base: None,
            kbuild_path: None,
            vcpkg_root: None,
            files: OutputFiles::for_host(host.os.is_windows()),
            features: FeatureFlags::default(),
            search_paths: SearchPaths::default(),
            probe_overrides: BTreeMap::new(),
            command_line: Vec::new(),
        }
    }

    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    pub fn with_continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }

    /// Mark a probe as disabled.
    pub fn disable(mut self, probe: &str) -> Self {
        self.probe_overrides
            .entry(probe.to_string())
            .or_default()
            .disabled = true;
        self
    }

    /// Point a probe at an operator-supplied install.
    pub fn with_custom_path(mut self, probe: &str, path: impl Into<PathBuf>) -> Self {
        self.probe_overrides
            .entry(probe.to_string())
            .or_default()
            .custom_path = Some(path.into());
        self
    }

    /// Override for `probe`, or the default (no override).
    pub fn override_for(&self, probe: &str) -> ProbeOverride {
        self.probe_overrides.get(probe).cloned().unwrap_or_default()
    }

    /// Probes selected with `--only-<name>`.
    pub fn only_selection(&self) -> Vec<&str> {
        self.probe_overrides
            .iter()
            .filter(|(_, o)| o.only)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
