//! Environment script (`env.sh` / `env.bat`).

use std::fmt::Write;
use std::path::{Path, PathBuf};

use super::{normalize, ConfigWriter};
use crate::probe::Probe;
use crate::target::TargetOs;

/// Store key prefixes exported by the script.
pub const PREFIXES: &[&str] = &["KBUILD_"];

fn export_line(os: TargetOs, key: &str, value: &str) -> String {
    if os.is_windows() {
        format!("set {key}={}", normalize(value))
    } else {
        format!("export {key}={}", normalize(value))
    }
}

/// kBuild binaries first, then the directories of resolved tool commands,
/// then the stored `PATH`.
fn composed_path(w: &ConfigWriter<'_>) -> String {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut push = |dir: PathBuf| {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    };

    if let Some(kbuild) = w.store.get("KBUILD_PATH") {
        push(
            Path::new(kbuild)
                .join("bin")
                .join(format!("{}.{}", w.target.os, w.target.arch)),
        );
    }
    for tool in w.tools {
        let command = tool
            .state()
            .detection()
            .and_then(|d| d.command_path.as_deref())
            .filter(|p| p.is_file());
        if let Some(dir) = command.and_then(Path::parent) {
            push(dir.to_path_buf());
        }
    }

    let mut parts: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    if let Some(path) = w.store.get("PATH") {
        parts.push(path.to_string());
    }
    parts.join(&w.host_os.path_delimiter().to_string())
}

pub(super) fn render(w: &ConfigWriter<'_>) -> String {
    let os = w.host_os;
    let mut out = String::new();
    if os.is_windows() {
        out.push_str("@echo off\n");
        for line in w.banner("Environment") {
            if line.is_empty() {
                out.push_str("rem\n");
            } else {
                let _ = writeln!(out, "rem {line}");
            }
        }
    } else {
        out.push_str("#!/bin/bash\n");
        for line in w.banner("Environment") {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                let _ = writeln!(out, "# {line}");
            }
        }
    }

    for (key, value) in w.store.with_prefixes(PREFIXES) {
        let _ = writeln!(out, "{}", export_line(os, key, value));
    }
    if let Some(out_base) = w.store.get("PATH_OUT_BASE") {
        let _ = writeln!(out, "{}", export_line(os, "PATH_OUT_BASE", out_base));
    }

    let path = composed_path(w);
    if !path.is_empty() {
        let _ = writeln!(out, "{}", export_line(os, "PATH", &path));
    }
    out
}
