//! Command lookup and version queries for tool probes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::error::{ProbeError, Stage};
use crate::harness::{run_with_timeout, Completion};

/// Switches tried in order until one exits cleanly.
pub const DEFAULT_VERSION_SWITCHES: &[&str] =
    &["--version", "-V", "/?", "/h", "/help", "-version", "version"];

/// Reported when no switch produced a version.
pub const UNKNOWN_VERSION: &str = "<unknown>";

/// A resolved command and its reported version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCommand {
    pub path: PathBuf,
    pub version: String,
}

/// Where and how to look for commands on behalf of one probe.
#[derive(Debug, Clone)]
pub struct CommandLookup<'a> {
    probe: &'a str,
    custom: Option<PathBuf>,
    search_path: Option<String>,
    exe_suffix: &'static str,
    switches: &'a [&'a str],
    timeout: Duration,
}

impl<'a> CommandLookup<'a> {
    /// Look up commands on `search_path` (a `PATH`-style list, the process
    /// `PATH` when `None`).
    pub fn new(probe: &'a str, search_path: Option<&str>, exe_suffix: &'static str) -> Self {
        Self {
            probe,
            custom: None,
            search_path: search_path.map(str::to_string),
            exe_suffix,
            switches: DEFAULT_VERSION_SWITCHES,
            timeout: Duration::from_secs(10),
        }
    }

    /// Only accept commands inside `dir`.
    pub fn in_dir(mut self, dir: Option<&Path>) -> Self {
        self.custom = dir.map(Path::to_path_buf);
        self
    }

    pub fn with_switches(mut self, switches: &'a [&'a str]) -> Self {
        self.switches = switches;
        self
    }

    fn file_name(&self, cmd: &str) -> String {
        if cmd.ends_with(self.exe_suffix) {
            cmd.to_string()
        } else {
            format!("{cmd}{}", self.exe_suffix)
        }
    }

    /// Resolve `cmd` without asking for a version.
    pub fn find(&self, cmd: &str) -> Result<PathBuf, ProbeError> {
        let name = self.file_name(cmd);
        let not_found = || ProbeError::ToolNotFound {
            probe: self.probe.to_string(),
            command: name.clone(),
        };

        if let Some(dir) = &self.custom {
            let path = dir.join(&name);
            if is_executable(&path) {
                debug!("{}: found '{}' at custom path {}", self.probe, name, path.display());
                return Ok(path);
            }
            return Err(not_found());
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let found = match &self.search_path {
            Some(paths) => which::which_in(&name, Some(paths), cwd),
            None => which::which(&name),
        };
        match found {
            Ok(path) => {
                debug!("{}: found '{}' at {}", self.probe, name, path.display());
                Ok(path)
            }
            Err(_) => Err(not_found()),
        }
    }

    /// Resolve `cmd` and query its version.
    pub fn locate(&self, cmd: &str) -> Result<LocatedCommand, ProbeError> {
        let path = self.find(cmd)?;
        let version = self.query_version(&path)?;
        Ok(LocatedCommand { path, version })
    }

    /// First line printed by the first switch that exits cleanly.
    pub fn query_version(&self, path: &Path) -> Result<String, ProbeError> {
        for switch in self.switches {
            let mut cmd = Command::new(path);
            cmd.arg(switch);
            match run_with_timeout(&mut cmd, self.timeout) {
                Ok(Completion::Exited(out)) if out.success() => {
                    let stdout = out.stdout_lossy();
                    if let Some(line) = stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
                        debug!("{}: version of {} is '{}'", self.probe, path.display(), line);
                        return Ok(line.to_string());
                    }
                }
                Ok(Completion::Exited(_)) => {}
                Ok(Completion::TimedOut) => {
                    return Err(ProbeError::Timeout {
                        probe: self.probe.to_string(),
                        stage: Stage::Version,
                        seconds: self.timeout.as_secs(),
                    })
                }
                Err(e) => {
                    return Err(ProbeError::environment(
                        self.probe,
                        format!("running {}: {e}", path.display()),
                    ))
                }
            }
        }
        Ok(UNKNOWN_VERSION.to_string())
    }
}

/// Regular file with an execute bit (any regular file on Windows).
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
