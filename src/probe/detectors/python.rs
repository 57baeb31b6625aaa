//! Host Python interpreter capabilities.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::path_lookup;
use crate::error::{ProbeError, Stage};
use crate::harness::{run_with_timeout, Completion, CompileRequest, Toolchain};
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};
use crate::target::TargetOs;

const INTERPRETERS: &[&str] = &["python3", "python"];
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Modules the build scripts import.
const REQUIRED_MODULES: &[&str] = &["packaging"];

const SYSCONFIG_QUERY: &str = "import json, sysconfig\n\
p = sysconfig.get_paths()\n\
print(json.dumps({'include': p.get('include'), 'data': p.get('data'), \
'libdir': sysconfig.get_config_var('LIBDIR'), \
'ldlibrary': sysconfig.get_config_var('LDLIBRARY')}))";

const EMBED_TEST: &str = r#"#include <Python.h>
int main()
{
    Py_Initialize();
    Py_Finalize();
    return 0;
}"#;

/// Development layout reported by the interpreter's `sysconfig`.
#[derive(Debug, Clone, Default, Deserialize)]
struct PythonLayout {
    include: Option<String>,
    data: Option<String>,
    libdir: Option<String>,
    ldlibrary: Option<String>,
}

/// Path of the host interpreter, inside `custom` when given.
fn interpreter(req: &DetectRequest<'_>, ctx: &ProbeContext<'_>) -> Result<PathBuf, ProbeError> {
    let lookup = path_lookup(req.name, ctx).in_dir(req.custom_path);
    let mut last_err = None;
    for name in INTERPRETERS {
        match lookup.find(name) {
            Ok(path) => return Ok(path),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| ProbeError::detection(req.name, "no Python interpreter")))
}

/// Run `python -c <script>`, `Ok(None)` if it exits non-zero.
fn run_script(probe: &str, python: &Path, script: &str) -> Result<Option<String>, ProbeError> {
    let mut cmd = Command::new(python);
    cmd.args(["-c", script]);
    match run_with_timeout(&mut cmd, QUERY_TIMEOUT) {
        Ok(Completion::Exited(out)) if out.success() => Ok(Some(out.stdout_lossy())),
        Ok(Completion::Exited(out)) => {
            debug!("{}: {} failed: {}", probe, python.display(), out.stderr_lossy().trim());
            Ok(None)
        }
        Ok(Completion::TimedOut) => Err(ProbeError::Timeout {
            probe: probe.to_string(),
            stage: Stage::Execute,
            seconds: QUERY_TIMEOUT.as_secs(),
        }),
        Err(e) => Err(ProbeError::environment(
            probe,
            format!("running {}: {e}", python.display()),
        )),
    }
}

/// Library name for the linker, without the shared-object suffix.
fn link_name(ldlibrary: &str) -> &str {
    ldlibrary
        .strip_suffix(".so")
        .or_else(|| ldlibrary.strip_suffix(".dll"))
        .unwrap_or(ldlibrary)
}

/// Checks that Python can be embedded: headers and library are present and
/// a `Py_Initialize` test program builds and runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonCApiDetector;

impl ToolDetector for PythonCApiDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let host = ctx.host();
        if host.os == TargetOs::Darwin {
            info!("{}: using the system framework", req.name);
            ctx.store.set("VBOX_WITH_PYTHON", "1");
            return Ok(ToolDetection::default());
        }

        let python = interpreter(req, ctx)?;
        let output = run_script(req.name, &python, SYSCONFIG_QUERY)?.ok_or_else(|| {
            ProbeError::detection(req.name, format!("{} has no usable sysconfig", python.display()))
        })?;
        let layout: PythonLayout = serde_json::from_str(output.trim())
            .map_err(|e| ProbeError::environment(req.name, format!("sysconfig output: {e}")))?;

        let include = layout
            .include
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ProbeError::detection(req.name, "Python installation has no include path"))?;
        // Store installs expose an include path inside the sandboxed
        // WindowsApps directory, which the compiler cannot read.
        if include.contains("\\WindowsApps\\") {
            return Err(ProbeError::detection(
                req.name,
                "incompatible Python installation (placed in WindowsApps)",
            ));
        }
        let libdir = layout.libdir.unwrap_or_default();
        let ldlibrary = layout.ldlibrary.unwrap_or_default();

        if let Some(data) = layout.data.as_deref() {
            ctx.store.prepend_path("PATH", data, host.os);
        }

        let include_paths = [PathBuf::from(&include)];
        let library_paths: Vec<PathBuf> = if libdir.is_empty() {
            Vec::new()
        } else {
            vec![PathBuf::from(&libdir)]
        };
        let libraries: Vec<&str> = [link_name(&ldlibrary)]
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();
        let toolchain = Toolchain::from_store(ctx.store, host.os);
        let request = CompileRequest {
            name: req.name,
            target: host,
            include_paths: &include_paths,
            library_paths: &library_paths,
            headers: &[],
            libraries: &libraries,
            source: EMBED_TEST,
        };
        ctx.harness.compile_and_run(&toolchain, &request)?;

        ctx.store.set("VBOX_WITH_PYTHON", "1");
        ctx.store.set("VBOX_PATH_PYTHON_INC", include);
        ctx.store.set_opt("VBOX_LIB_PYTHON", (!libdir.is_empty()).then_some(libdir));

        Ok(ToolDetection {
            command_path: Some(python),
            version: None,
        })
    }
}

/// Checks that the host interpreter can import the required modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonModulesDetector;

impl ToolDetector for PythonModulesDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let python = interpreter(req, ctx)?;
        for module in REQUIRED_MODULES {
            if run_script(req.name, &python, &format!("import {module}"))?.is_none() {
                return Err(ProbeError::detection(
                    req.name,
                    format!("Python module '{module}' is not installed (try 'pip install {module}')"),
                ));
            }
            debug!("{}: module '{}' is installed", req.name, module);
        }
        Ok(ToolDetection {
            command_path: Some(python),
            version: None,
        })
    }
}
