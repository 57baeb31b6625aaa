//! Compile-and-execute validation of library candidates.
//!
//! A [`TestHarness`] builds a tiny program against the resolved include and
//! library paths, runs it, and returns what it printed. The printed text is
//! the probe's version evidence.
//!
//! [`CompileHarness`] is the real implementation. It writes the program into
//! a [`ScratchDir`] that is removed on every exit path unless debug mode
//! keeps it, and bounds both the compiler and the test binary with a
//! timeout.

mod mock;
pub mod process;
mod scratch;

pub use mock::{MockHarness, MockOutcome};
pub use process::{decode_lossy, run_with_timeout, Completion, ProcessOutput};
pub use scratch::ScratchDir;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::error::{ProbeError, Stage};
use crate::store::ConfigStore;
use crate::target::{Target, TargetOs};

/// What an auto-synthesized C program prints when it compiled and ran.
pub const FOUND_MARKER: &str = "<found>";

/// Header name fragments that need a C++ compiler.
const CPP_HEADER_FRAGMENTS: &[&str] = &[
    "c++",
    "iostream",
    "Qt",
    "qt",
    "qglobal.h",
    "qcoreapplication.h",
];

/// Store key holding the C compiler command.
pub const C_COMPILER_KEY: &str = "config_c_compiler";
/// Store key holding the C++ compiler command.
pub const CPP_COMPILER_KEY: &str = "config_cpp_compiler";

/// Compilers and environment used for compile tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub c_compiler: String,
    pub cpp_compiler: String,
    /// Extra environment for the compiler and test binary.
    pub env: BTreeMap<String, String>,
}

impl Toolchain {
    /// Compilers recorded by the gcc / Visual C++ probes, or the platform
    /// defaults.
    pub fn from_store(store: &ConfigStore, os: TargetOs) -> Self {
        let (c_default, cpp_default) = if os.is_windows() {
            ("cl.exe", "cl.exe")
        } else {
            ("cc", "c++")
        };

        let env = ["PATH", "INCLUDE", "LIB"]
            .iter()
            .filter_map(|key| store.get(key).map(|v| (key.to_string(), v.to_string())))
            .collect();

        Self {
            c_compiler: store.get(C_COMPILER_KEY).unwrap_or(c_default).to_string(),
            cpp_compiler: store.get(CPP_COMPILER_KEY).unwrap_or(cpp_default).to_string(),
            env,
        }
    }
}

/// One compile test.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub name: &'a str,
    pub target: Target,
    pub include_paths: &'a [PathBuf],
    pub library_paths: &'a [PathBuf],
    pub headers: &'a [&'a str],
    pub libraries: &'a [&'a str],
    pub source: &'a str,
}

/// Something that can build and run a test program.
pub trait TestHarness {
    /// Compile `req.source`, run it, and return its trimmed stdout.
    fn compile_and_run(
        &self,
        toolchain: &Toolchain,
        req: &CompileRequest<'_>,
    ) -> Result<String, ProbeError>;
}

/// Harness that invokes the real compiler.
#[derive(Debug, Clone)]
pub struct CompileHarness {
    /// Keep scratch files and pass verbose flags to the compiler.
    pub debug: bool,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    /// Parent directory for scratch directories, the system temp dir if unset.
    pub scratch_base: Option<PathBuf>,
}

impl Default for CompileHarness {
    fn default() -> Self {
        Self {
            debug: false,
            compile_timeout: Duration::from_secs(15),
            run_timeout: Duration::from_secs(10),
            scratch_base: None,
        }
    }
}

impl CompileHarness {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Default::default()
        }
    }

    /// Build the compiler command line for `req`.
    fn compile_command(
        &self,
        compiler: &str,
        toolchain: &Toolchain,
        req: &CompileRequest<'_>,
        source: &Path,
        image: &Path,
    ) -> Command {
        let mut parts = compiler.split_whitespace();
        let program = parts.next().unwrap_or(compiler);
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd.envs(&toolchain.env);

        let os = req.target.os;
        if os.is_windows() {
            if self.debug {
                cmd.arg("/showIncludes");
            }
            cmd.env("INCLUDE", prepend_all(toolchain.env.get("INCLUDE"), req.include_paths, os));
            cmd.env("LIB", prepend_all(toolchain.env.get("LIB"), req.library_paths, os));
            cmd.arg(source);
            cmd.arg(format!("/Fe:{}", image.display()));
        } else {
            for inc in req.include_paths {
                cmd.arg(format!("-I{}", inc.display()));
            }
            for lib in req.library_paths {
                cmd.arg(format!("-L{}", lib.display()));
            }
            cmd.arg(source);
            cmd.arg("-o").arg(image);
        }
        cmd.args(linker_args(os, req.libraries));
        cmd
    }
}

impl TestHarness for CompileHarness {
    fn compile_and_run(
        &self,
        toolchain: &Toolchain,
        req: &CompileRequest<'_>,
    ) -> Result<String, ProbeError> {
        let os = req.target.os;
        let use_cpp = os.is_windows() || needs_cpp(req.headers);
        let compiler = if use_cpp {
            &toolchain.cpp_compiler
        } else {
            &toolchain.c_compiler
        };

        let scratch = ScratchDir::create(self.scratch_base.as_deref(), self.debug)
            .map_err(|e| ProbeError::environment(req.name, format!("scratch directory: {e}")))?;
        let source = scratch
            .path()
            .join(if use_cpp { "testlib.cpp" } else { "testlib.c" });
        let image = scratch
            .path()
            .join(if os.is_windows() { "a.exe" } else { "a.out" });
        std::fs::write(&source, req.source)
            .map_err(|e| ProbeError::environment(req.name, format!("writing test source: {e}")))?;

        let mut cmd = self.compile_command(compiler, toolchain, req, &source, &image);
        let command_line = render_command(&cmd);
        debug!("{}: compiling: {}", req.name, command_line);

        let compiled = match run_with_timeout(&mut cmd, self.compile_timeout) {
            Ok(Completion::Exited(out)) => out,
            Ok(Completion::TimedOut) => {
                return Err(ProbeError::Timeout {
                    probe: req.name.to_string(),
                    stage: Stage::Compile,
                    seconds: self.compile_timeout.as_secs(),
                })
            }
            Err(e) => {
                let message = match e.kind() {
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                        format!("compiler not found: {command_line} ({e})")
                    }
                    _ => format!("invoking compiler failed: {command_line} ({e})"),
                };
                return Err(ProbeError::environment(req.name, message));
            }
        };

        if !compiled.success() {
            // Some compilers print diagnostics to stdout.
            return Err(ProbeError::CompileFailure {
                probe: req.name.to_string(),
                command: command_line,
                stdout: compiled.stdout_lossy(),
                stderr: compiled.stderr_lossy(),
            });
        }

        let mut run = Command::new(&image);
        run.current_dir(scratch.path()).envs(&toolchain.env);
        let ran = match run_with_timeout(&mut run, self.run_timeout) {
            Ok(Completion::Exited(out)) => out,
            Ok(Completion::TimedOut) => {
                return Err(ProbeError::Timeout {
                    probe: req.name.to_string(),
                    stage: Stage::Execute,
                    seconds: self.run_timeout.as_secs(),
                })
            }
            Err(e) => {
                return Err(ProbeError::ExecuteFailure {
                    probe: req.name.to_string(),
                    code: None,
                    detail: e.to_string(),
                    stderr: String::new(),
                })
            }
        };

        if !ran.success() {
            let code = ran.status.code();
            return Err(ProbeError::ExecuteFailure {
                probe: req.name.to_string(),
                code,
                detail: exit_detail(os, code),
                stderr: ran.stderr_lossy(),
            });
        }

        let stdout = ran.stdout_lossy().trim().to_string();
        debug!("{}: test binary printed '{}'", req.name, stdout);
        Ok(stdout)
    }
}

/// Rough guess whether the headers need a C++ compiler.
pub fn needs_cpp(headers: &[&str]) -> bool {
    headers
        .iter()
        .any(|h| CPP_HEADER_FRAGMENTS.iter().any(|frag| h.contains(frag)))
}

/// Linker arguments for `libraries` in the target's syntax.
pub fn linker_args(os: TargetOs, libraries: &[&str]) -> Vec<String> {
    if libraries.is_empty() {
        return Vec::new();
    }
    if os.is_windows() {
        std::iter::once("/link".to_string())
            .chain(libraries.iter().map(|lib| format!("{lib}.lib")))
            .collect()
    } else {
        libraries
            .iter()
            .map(|lib| match lib.strip_prefix("lib") {
                Some(stem) => format!("-l{stem}"),
                None => format!("-l:{lib}"),
            })
            .collect()
    }
}

/// Test program for a library.
///
/// Custom code gets the matching stdio include prepended. Without custom
/// code a C program printing [`FOUND_MARKER`] or a C++ program printing
/// `1` is generated around the first header.
pub fn synthesize_source(headers: &[&str], alternatives: &[&str], code: Option<&str>) -> String {
    let cpp = needs_cpp(headers);
    if let Some(code) = code {
        let prelude = if cpp {
            "#include <iostream>\n"
        } else {
            "#include <stdio.h>\n"
        };
        return format!("{prelude}{code}");
    }

    let Some(header) = headers.first().or(alternatives.first()) else {
        return String::new();
    };
    if cpp {
        format!(
            "#include <{header}>\n#include <iostream>\nint main() {{ std::cout << \"1\" << std::endl; return 0; }}\n"
        )
    } else {
        format!(
            "#include <{header}>\n#include <stdio.h>\nint main(void) {{ printf(\"{FOUND_MARKER}\"); return 0; }}\n"
        )
    }
}

fn prepend_all(existing: Option<&String>, paths: &[PathBuf], os: TargetOs) -> String {
    let mut parts: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    if let Some(existing) = existing {
        parts.push(existing.clone());
    }
    parts.join(&os.path_delimiter().to_string())
}

fn render_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program().to_string_lossy().into_owned())
        .chain(cmd.get_args().map(|a| a.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn exit_detail(os: TargetOs, code: Option<i32>) -> String {
    match code {
        Some(code) if os.is_windows() => format!(
            "Windows Error {}",
            std::io::Error::from_raw_os_error(code)
        ),
        Some(code) => format!("return code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetArch;

    fn linux() -> Target {
        Target::new(TargetOs::Linux, TargetArch::Amd64)
    }

    #[test]
    fn needs_cpp_matches_fragments() {
        assert!(needs_cpp(&["QtCore/qglobal.h"]));
        assert!(needs_cpp(&["c++/13/iostream"]));
        assert!(!needs_cpp(&["zlib.h"]));
        assert!(!needs_cpp(&[]));
    }

    #[test]
    fn linker_args_unix() {
        assert_eq!(
            linker_args(TargetOs::Linux, &["libz", "softfloat.a"]),
            vec!["-lz".to_string(), "-l:softfloat.a".to_string()]
        );
        assert!(linker_args(TargetOs::Linux, &[]).is_empty());
    }

    #[test]
    fn linker_args_windows() {
        assert_eq!(
            linker_args(TargetOs::Windows, &["zlib", "libpng16"]),
            vec!["/link", "zlib.lib", "libpng16.lib"]
        );
    }

    #[test]
    fn synthesized_c_program_prints_marker() {
        let src = synthesize_source(&["zlib.h"], &[], None);
        assert!(src.starts_with("#include <zlib.h>\n"));
        assert!(src.contains("printf(\"<found>\")"));
    }

    #[test]
    fn synthesized_cpp_program_prints_one() {
        let src = synthesize_source(&["QtCore/qglobal.h"], &[], None);
        assert!(src.contains("#include <iostream>"));
        assert!(src.contains("std::cout << \"1\""));
    }

    #[test]
    fn synthesized_source_uses_alternative_when_no_primary() {
        let src = synthesize_source(&[], &["SDL.h"], None);
        assert!(src.starts_with("#include <SDL.h>"));
        assert!(synthesize_source(&[], &[], None).is_empty());
    }

    #[test]
    fn custom_code_gets_stdio_prelude() {
        let src = synthesize_source(&["zlib.h"], &[], Some("int main() { return 0; }\n"));
        assert!(src.starts_with("#include <stdio.h>\nint main()"));
    }

    #[test]
    fn toolchain_defaults_per_family() {
        let store = ConfigStore::new();
        let unix = Toolchain::from_store(&store, TargetOs::Linux);
        assert_eq!(unix.c_compiler, "cc");
        assert_eq!(unix.cpp_compiler, "c++");
        let win = Toolchain::from_store(&store, TargetOs::Windows);
        assert_eq!(win.cpp_compiler, "cl.exe");
    }

    #[test]
    fn toolchain_reads_store_keys() {
        let mut store = ConfigStore::new();
        store.set(C_COMPILER_KEY, "/usr/bin/gcc");
        store.set(CPP_COMPILER_KEY, "/usr/bin/g++");
        store.set("PATH", "/usr/bin");
        let tc = Toolchain::from_store(&store, TargetOs::Linux);
        assert_eq!(tc.c_compiler, "/usr/bin/gcc");
        assert_eq!(tc.env.get("PATH").map(String::as_str), Some("/usr/bin"));
    }

    #[test]
    fn unix_command_line_layout() {
        let harness = CompileHarness::default();
        let tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        let incs = vec![PathBuf::from("/usr/include")];
        let libs = vec![PathBuf::from("/usr/lib")];
        let req = CompileRequest {
            name: "zlib",
            target: linux(),
            include_paths: &incs,
            library_paths: &libs,
            headers: &["zlib.h"],
            libraries: &["libz"],
            source: "",
        };
        let cmd = harness.compile_command(
            "ccache cc",
            &tc,
            &req,
            Path::new("/tmp/x/testlib.c"),
            Path::new("/tmp/x/a.out"),
        );
        assert_eq!(
            render_command(&cmd),
            "ccache cc -I/usr/include -L/usr/lib /tmp/x/testlib.c -o /tmp/x/a.out -lz"
        );
    }

    #[test]
    fn windows_command_line_layout() {
        let harness = CompileHarness::new(true);
        let tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Windows);
        let req = CompileRequest {
            name: "zlib",
            target: Target::new(TargetOs::Windows, TargetArch::Amd64),
            include_paths: &[],
            library_paths: &[],
            headers: &["zlib.h"],
            libraries: &["zlib"],
            source: "",
        };
        let cmd = harness.compile_command(
            "cl.exe",
            &tc,
            &req,
            Path::new("testlib.cpp"),
            Path::new("a.exe"),
        );
        assert_eq!(
            render_command(&cmd),
            "cl.exe /showIncludes testlib.cpp /Fe:a.exe /link zlib.lib"
        );
    }

    #[test]
    fn missing_compiler_is_environment_fault() {
        let base = tempfile::TempDir::new().unwrap();
        let harness = CompileHarness {
            scratch_base: Some(base.path().to_path_buf()),
            ..Default::default()
        };
        let mut tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        tc.c_compiler = "confprobe-no-such-cc".to_string();
        let req = CompileRequest {
            name: "zlib",
            target: linux(),
            include_paths: &[],
            library_paths: &[],
            headers: &["zlib.h"],
            libraries: &[],
            source: "int main(void) { return 0; }\n",
        };

        let err = harness.compile_and_run(&tc, &req).unwrap_err();

        assert!(matches!(err, ProbeError::EnvironmentFault { .. }));
        assert!(err.to_string().contains("compiler not found"));
        // scratch directory cleaned up on the failure path
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn slow_compiler_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let base = tempfile::TempDir::new().unwrap();
        let fake_cc = base.path().join("slow-cc");
        std::fs::write(&fake_cc, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&fake_cc, std::fs::Permissions::from_mode(0o755)).unwrap();
        let scratch = tempfile::TempDir::new().unwrap();
        let harness = CompileHarness {
            compile_timeout: Duration::from_millis(300),
            scratch_base: Some(scratch.path().to_path_buf()),
            ..Default::default()
        };
        let mut tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        tc.c_compiler = fake_cc.display().to_string();
        let req = CompileRequest {
            name: "zlib",
            target: linux(),
            include_paths: &[],
            library_paths: &[],
            headers: &["zlib.h"],
            libraries: &[],
            source: "",
        };

        let err = harness.compile_and_run(&tc, &req).unwrap_err();

        assert!(matches!(
            err,
            ProbeError::Timeout {
                stage: Stage::Compile,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    fn fake_compiler(dir: &Path, program_body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let cc = dir.join("fake-cc");
        let script = format!(
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi; shift; done\nprintf '#!/bin/sh\\n{program_body}\\n' > \"$out\"\nchmod +x \"$out\"\n"
        );
        std::fs::write(&cc, script).unwrap();
        std::fs::set_permissions(&cc, std::fs::Permissions::from_mode(0o755)).unwrap();
        cc.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_returns_trimmed_stdout() {
        let tools = tempfile::TempDir::new().unwrap();
        let scratch = tempfile::TempDir::new().unwrap();
        let harness = CompileHarness {
            scratch_base: Some(scratch.path().to_path_buf()),
            ..Default::default()
        };
        let mut tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        tc.c_compiler = fake_compiler(tools.path(), "echo \"  1.3.1  \"");
        let req = CompileRequest {
            name: "zlib",
            target: linux(),
            include_paths: &[],
            library_paths: &[],
            headers: &["zlib.h"],
            libraries: &[],
            source: "int main(void) { return 0; }\n",
        };

        assert_eq!(harness.compile_and_run(&tc, &req).unwrap(), "1.3.1");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn failing_binary_is_execute_failure() {
        let tools = tempfile::TempDir::new().unwrap();
        let harness = CompileHarness::default();
        let mut tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        tc.c_compiler = fake_compiler(tools.path(), "exit 1");
        let req = CompileRequest {
            name: "libpam",
            target: linux(),
            include_paths: &[],
            library_paths: &[],
            headers: &["security/pam_appl.h"],
            libraries: &[],
            source: "",
        };

        let err = harness.compile_and_run(&tc, &req).unwrap_err();

        assert!(matches!(
            err,
            ProbeError::ExecuteFailure { code: Some(1), .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn hanging_binary_times_out_and_is_killed() {
        let tools = tempfile::TempDir::new().unwrap();
        let scratch = tempfile::TempDir::new().unwrap();
        let pid_file = tools.path().join("test.pid");
        let harness = CompileHarness {
            run_timeout: Duration::from_millis(200),
            scratch_base: Some(scratch.path().to_path_buf()),
            ..Default::default()
        };
        let mut tc = Toolchain::from_store(&ConfigStore::new(), TargetOs::Linux);
        tc.c_compiler = fake_compiler(
            tools.path(),
            &format!("echo $$ > {}; exec sleep 30", pid_file.display()),
        );
        let req = CompileRequest {
            name: "curl",
            target: linux(),
            include_paths: &[],
            library_paths: &[],
            headers: &["curl/curl.h"],
            libraries: &[],
            source: "",
        };

        let started = std::time::Instant::now();
        let err = harness.compile_and_run(&tc, &req).unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(
            err,
            ProbeError::Timeout {
                stage: Stage::Execute,
                ..
            }
        ));
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let alive = Command::new("kill")
            .args(["-0", pid.trim()])
            .status()
            .unwrap();
        assert!(!alive.success());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn exit_detail_formats() {
        assert_eq!(exit_detail(TargetOs::Linux, Some(2)), "return code 2");
        assert_eq!(exit_detail(TargetOs::Linux, None), "terminated by signal");
        assert!(exit_detail(TargetOs::Windows, Some(5)).starts_with("Windows Error"));
    }
}
