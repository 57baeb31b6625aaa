//! Build target description and host detection.
//!
//! A [`Target`] is the (operating system, architecture) pair a build is
//! configured for. Probes declare a [`TargetSet`] of operating systems they
//! apply to; probes outside the active target are skipped.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigureError;

/// Operating system family of a build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    Windows,
    Darwin,
    Solaris,
    Bsd,
    Haiku,
    Unknown,
}

impl TargetOs {
    /// Detect the operating system this binary runs on.
    pub fn host() -> Self {
        if cfg!(target_os = "linux") {
            TargetOs::Linux
        } else if cfg!(target_os = "windows") {
            TargetOs::Windows
        } else if cfg!(target_os = "macos") {
            TargetOs::Darwin
        } else if cfg!(any(target_os = "solaris", target_os = "illumos")) {
            TargetOs::Solaris
        } else if cfg!(any(
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "dragonfly"
        )) {
            TargetOs::Bsd
        } else if cfg!(target_os = "haiku") {
            TargetOs::Haiku
        } else {
            TargetOs::Unknown
        }
    }

    /// Name used in kBuild variables and directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::Windows => "win",
            TargetOs::Darwin => "darwin",
            TargetOs::Solaris => "solaris",
            TargetOs::Bsd => "bsd",
            TargetOs::Haiku => "haiku",
            TargetOs::Unknown => "unknown",
        }
    }

    /// Whether this is the Windows family.
    pub fn is_windows(&self) -> bool {
        matches!(self, TargetOs::Windows)
    }

    /// Executable file suffix.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }

    /// Delimiter between entries of a `PATH`-like list.
    pub fn path_delimiter(&self) -> char {
        if self.is_windows() {
            ';'
        } else {
            ':'
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetOs {
    type Err = ConfigureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(TargetOs::Linux),
            "win" | "windows" | "win32" | "win64" => Ok(TargetOs::Windows),
            "darwin" | "macos" | "osx" => Ok(TargetOs::Darwin),
            "solaris" | "sunos" | "illumos" => Ok(TargetOs::Solaris),
            "bsd" | "freebsd" | "netbsd" | "openbsd" => Ok(TargetOs::Bsd),
            "haiku" => Ok(TargetOs::Haiku),
            _ => Err(ConfigureError::InvalidTarget {
                value: s.to_string(),
            }),
        }
    }
}

/// CPU architecture of a build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    X86,
    Amd64,
    Arm64,
    Unknown,
}

impl TargetArch {
    /// Detect the architecture this binary runs on.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => TargetArch::X86,
            "x86_64" => TargetArch::Amd64,
            "aarch64" => TargetArch::Arm64,
            _ => TargetArch::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetArch::X86 => "x86",
            TargetArch::Amd64 => "amd64",
            TargetArch::Arm64 => "arm64",
            TargetArch::Unknown => "unknown",
        }
    }

    /// Machine part of a GNU triple.
    fn gnu_machine(&self) -> &'static str {
        match self {
            TargetArch::X86 => "i386",
            TargetArch::Amd64 => "x86_64",
            TargetArch::Arm64 => "aarch64",
            TargetArch::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetArch {
    type Err = ConfigureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "i686" => Ok(TargetArch::X86),
            "amd64" | "x86_64" | "x64" => Ok(TargetArch::Amd64),
            "arm64" | "aarch64" => Ok(TargetArch::Arm64),
            _ => Err(ConfigureError::InvalidArch {
                value: s.to_string(),
            }),
        }
    }
}

/// The (operating system, architecture) pair being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    pub os: TargetOs,
    pub arch: TargetArch,
}

impl Target {
    pub fn new(os: TargetOs, arch: TargetArch) -> Self {
        Self { os, arch }
    }

    /// The machine this binary runs on.
    pub fn host() -> Self {
        Self::new(TargetOs::host(), TargetArch::host())
    }

    /// Multiarch triple used in Debian-style include and lib directories,
    /// e.g. `x86_64-linux-gnu`.
    pub fn gnu_triple(&self) -> String {
        format!("{}-linux-gnu", self.arch.gnu_machine())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.os, self.arch)
    }
}

/// Operating systems a probe applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSet {
    /// Every target.
    Any,
    /// Only the listed operating systems.
    Only(Vec<TargetOs>),
}

impl TargetSet {
    pub fn only(oses: &[TargetOs]) -> Self {
        TargetSet::Only(oses.to_vec())
    }

    pub fn contains(&self, os: TargetOs) -> bool {
        match self {
            TargetSet::Any => true,
            TargetSet::Only(list) => list.contains(&os),
        }
    }

    /// Human readable list for log lines.
    pub fn describe(&self) -> String {
        match self {
            TargetSet::Any => "any".to_string(),
            TargetSet::Only(list) => list
                .iter()
                .map(|os| os.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// kBuild build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    Release,
    Debug,
    Profile,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Release => "release",
            BuildType::Debug => "debug",
            BuildType::Profile => "profile",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
