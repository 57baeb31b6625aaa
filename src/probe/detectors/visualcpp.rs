//! Visual C++ build tools, located through the Visual Studio installer's
//! `vswhere.exe`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ProbeError;
use crate::harness::{run_with_timeout, Completion, CPP_COMPILER_KEY, C_COMPILER_KEY};
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};
use crate::target::TargetOs;

const VSWHERE_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variables naming the Program Files directories.
const PROGRAM_FILES_VARS: &[&str] = &["ProgramFiles", "ProgramFiles(x86)", "ProgramFiles(Arm)"];

/// One entry of `vswhere -format json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Installation {
    installation_path: PathBuf,
    #[serde(default)]
    installation_version: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Finds the newest MSVC toolset and records it for kBuild and the compile
/// harness.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisualCppDetector;

impl ToolDetector for VisualCppDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let install = match req.custom_path {
            Some(path) => Installation {
                installation_path: path.to_path_buf(),
                installation_version: None,
                display_name: None,
            },
            None => {
                let roots = ctx.options.search_paths.programfiles.around(program_files());
                find_installation(req.name, &roots)?
            }
        };
        info!(
            "{}: found {} version {} at {}",
            req.name,
            install.display_name.as_deref().unwrap_or("Visual Studio"),
            install.installation_version.as_deref().unwrap_or("?"),
            install.installation_path.display()
        );

        let (toolset_version, toolset) = newest_toolset(&install.installation_path).ok_or_else(|| {
            ProbeError::detection(
                req.name,
                format!(
                    "no MSVC toolset under {}",
                    install.installation_path.join("VC/Tools/MSVC").display()
                ),
            )
        })?;
        let bin = toolset.join("bin").join("Hostx64").join("x64");
        let cl = bin.join("cl.exe");
        if !cl.is_file() {
            return Err(ProbeError::ToolNotFound {
                probe: req.name.to_string(),
                command: cl.display().to_string(),
            });
        }

        let tool = tool_name(&toolset_version);
        let toolset_str = toolset.display().to_string();
        for suffix in ["", "X86", "AMD64"] {
            ctx.store.set(format!("PATH_TOOL_{tool}{suffix}"), toolset_str.as_str());
        }
        ctx.store.prepend_path("INCLUDE", &toolset.join("include").display().to_string(), TargetOs::Windows);
        ctx.store.prepend_path("LIB", &toolset.join("lib").join("x64").display().to_string(), TargetOs::Windows);
        ctx.store.prepend_path("PATH", &bin.display().to_string(), TargetOs::Windows);

        let cl_str = cl.display().to_string();
        ctx.store.set(C_COMPILER_KEY, cl_str.as_str());
        ctx.store.set(CPP_COMPILER_KEY, cl_str);

        Ok(ToolDetection {
            command_path: Some(cl),
            version: Some(toolset_version),
        })
    }
}

/// Existing Program Files directories from the environment.
fn program_files() -> Vec<PathBuf> {
    PROGRAM_FILES_VARS
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .filter(|p| p.is_dir())
        .collect()
}

/// First installation reported by the first `vswhere.exe` that answers.
fn find_installation(probe: &str, roots: &[PathBuf]) -> Result<Installation, ProbeError> {
    for root in roots {
        let vswhere = root
            .join("Microsoft Visual Studio")
            .join("Installer")
            .join("vswhere.exe");
        if !vswhere.is_file() {
            debug!("{}: no vswhere at {}", probe, vswhere.display());
            continue;
        }

        let mut cmd = Command::new(&vswhere);
        cmd.args([
            "-sort",
            "-products",
            "*",
            "-requires",
            "Microsoft.VisualStudio.BuildTools*",
            "-format",
            "json",
        ]);
        let out = match run_with_timeout(&mut cmd, VSWHERE_TIMEOUT) {
            Ok(Completion::Exited(out)) if out.success() => out,
            Ok(_) => continue,
            Err(e) => {
                return Err(ProbeError::environment(
                    probe,
                    format!("running {}: {e}", vswhere.display()),
                ))
            }
        };

        let installs = parse_installations(&out.stdout_lossy())
            .map_err(|e| ProbeError::environment(probe, format!("vswhere output: {e}")))?;
        if let Some(first) = installs.into_iter().next() {
            return Ok(first);
        }
    }
    Err(ProbeError::detection(probe, "Visual C++ build tools not found"))
}

fn parse_installations(json: &str) -> serde_json::Result<Vec<Installation>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Newest `VC/Tools/MSVC/<version>` directory.
fn newest_toolset(install: &Path) -> Option<(String, PathBuf)> {
    let msvc = install.join("VC").join("Tools").join("MSVC");
    let mut versions: Vec<(String, PathBuf)> = std::fs::read_dir(&msvc)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .collect();
    versions.sort_by(|a, b| version_key(&b.0).cmp(&version_key(&a.0)));
    versions.into_iter().next()
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// kBuild tool name for a toolset version, `14.38.33130` → `VCC143`.
fn tool_name(version: &str) -> String {
    let mut parts = version.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts
        .next()
        .and_then(|m| m.chars().next())
        .map(String::from)
        .unwrap_or_default();
    format!("VCC{major}{minor}")
}
