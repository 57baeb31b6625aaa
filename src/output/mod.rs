//! Generated build files.
//!
//! [`ConfigWriter`] turns the final store and probe results into the
//! AutoConfig build-variable file and the environment script. Rendering is
//! separate from writing so the text can be checked without touching disk.
//! Writers never mutate the store.

mod autoconfig;
mod env_script;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ConfigureError, Result};
use crate::probe::{LibraryProbe, ToolProbe};
use crate::store::ConfigStore;
use crate::target::{Target, TargetOs};

/// Name shown in generated file banners.
const GENERATOR: &str = "confprobe";

/// Forward slashes for every path separator.
pub fn normalize(value: &str) -> String {
    value.replace('\\', "/")
}

/// Renders and writes the generated files of one run.
#[derive(Debug)]
pub struct ConfigWriter<'a> {
    store: &'a ConfigStore,
    libraries: &'a [LibraryProbe],
    tools: &'a [ToolProbe],
    target: Target,
    host_os: TargetOs,
    command_line: &'a [String],
    timestamp: String,
}

impl<'a> ConfigWriter<'a> {
    pub fn new(
        store: &'a ConfigStore,
        libraries: &'a [LibraryProbe],
        tools: &'a [ToolProbe],
        target: Target,
        host_os: TargetOs,
    ) -> Self {
        Self {
            store,
            libraries,
            tools,
            target,
            host_os,
            command_line: &[],
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Arguments echoed into the banners.
    pub fn with_command_line(mut self, args: &'a [String]) -> Self {
        self.command_line = args;
        self
    }

    /// Fixed banner timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Banner lines shared by both files, without comment markers.
    fn banner(&self, kind: &str) -> Vec<String> {
        let args = self.command_line.join(" ");
        vec![
            format!("-*- {kind} -*-"),
            String::new(),
            "Automatically generated by".to_string(),
            String::new(),
            format!("  {GENERATOR} {args}").trim_end().to_string(),
            String::new(),
            "DO NOT EDIT THIS FILE MANUALLY".to_string(),
            format!("It will be completely overwritten if {GENERATOR} is executed again."),
            String::new(),
            format!("Generated on {}", self.timestamp),
            String::new(),
        ]
    }

    pub fn render_autoconfig(&self) -> String {
        autoconfig::render(self)
    }

    pub fn render_env(&self) -> String {
        env_script::render(self)
    }

    pub fn write_autoconfig(&self, path: &Path) -> Result<()> {
        write_file(path, &self.render_autoconfig())
    }

    pub fn write_env(&self, path: &Path) -> Result<()> {
        write_file(path, &self.render_env())
    }
}

/// Write `contents`, creating parent directories first.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigureError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ConfigureError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetArch;
    use tempfile::TempDir;

    #[test]
    fn normalize_uses_forward_slashes() {
        assert_eq!(normalize(r"C:\tools\win.amd64"), "C:/tools/win.amd64");
        assert_eq!(normalize("/usr/lib"), "/usr/lib");
    }

    #[test]
    fn banner_echoes_arguments_and_timestamp() {
        let store = ConfigStore::new();
        let args = vec!["--disable-libvpx".to_string()];
        let writer = ConfigWriter::new(
            &store,
            &[],
            &[],
            Target::new(TargetOs::Linux, TargetArch::Amd64),
            TargetOs::Linux,
        )
        .with_command_line(&args)
        .with_timestamp("2026-01-02 03:04:05");

        let banner = writer.banner("Makefile");

        assert_eq!(banner[0], "-*- Makefile -*-");
        assert!(banner.contains(&"  confprobe --disable-libvpx".to_string()));
        assert!(banner.contains(&"Generated on 2026-01-02 03:04:05".to_string()));
    }

    #[test]
    fn write_failure_names_the_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let target = blocker.join("AutoConfig.kmk");

        let err = write_file(&target, "x").unwrap_err();

        match err {
            ConfigureError::WriteFailed { path, .. } => assert_eq!(path, target),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out/linux.amd64/env.sh");

        write_file(&target, "export A=1\n").unwrap();

        assert_eq!(std::fs::read_to_string(target).unwrap(), "export A=1\n");
    }
}
