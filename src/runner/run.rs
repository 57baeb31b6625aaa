//! The configure pass.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::{Diagnostics, RunSummary};
use crate::config::RunOptions;
use crate::error::{ConfigureError, Result};
use crate::harness::TestHarness;
use crate::output::{write_file, ConfigWriter};
use crate::paths::{PathResolver, SystemLayout};
use crate::probe::which::CommandLookup;
use crate::probe::{catalog, LibraryProbe, Probe, ProbeContext, ToolProbe};
use crate::store::ConfigStore;
use crate::target::TargetOs;
use crate::transform::TransformEngine;

/// Lookup result for one OS base tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsToolCheck {
    pub name: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

impl OsToolCheck {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// One configure pass, set up but not started.
///
/// # Example
///
/// ```no_run
/// use confprobe::config::RunOptions;
/// use confprobe::harness::CompileHarness;
/// use confprobe::runner::ConfigureRun;
/// use confprobe::target::Target;
///
/// let options = RunOptions::new(Target::host()).with_continue_on_error(true);
/// let harness = CompileHarness::new(false);
/// let outcome = ConfigureRun::new(options).check(&harness);
/// println!("{} error(s)", outcome.diagnostics().error_count());
/// ```
#[derive(Debug)]
pub struct ConfigureRun {
    options: RunOptions,
    libraries: Vec<LibraryProbe>,
    tools: Vec<ToolProbe>,
    os_tools: Vec<String>,
    layout: SystemLayout,
    search_path: Option<String>,
    transforms: TransformEngine,
}

impl ConfigureRun {
    /// A pass over the built-in catalog, searching the process `PATH`.
    pub fn new(options: RunOptions) -> Self {
        let os_tools = catalog::os_tools(options.host.os)
            .iter()
            .map(|t| t.to_string())
            .collect();
        Self {
            options,
            libraries: catalog::libraries(),
            tools: catalog::tools(),
            os_tools,
            layout: SystemLayout::default(),
            search_path: std::env::var("PATH").ok(),
            transforms: TransformEngine::standard(),
        }
    }

    pub fn with_libraries(mut self, libraries: Vec<LibraryProbe>) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolProbe>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_os_tools(mut self, names: &[&str]) -> Self {
        self.os_tools = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_system_layout(mut self, layout: SystemLayout) -> Self {
        self.layout = layout;
        self
    }

    /// `PATH` value seeded into the store.
    pub fn with_search_path(mut self, path: Option<String>) -> Self {
        self.search_path = path;
        self
    }

    pub fn with_transforms(mut self, transforms: TransformEngine) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Probe everything in order and derive the final store.
    pub fn check(self, harness: &dyn TestHarness) -> RunOutcome {
        let Self {
            options,
            mut libraries,
            mut tools,
            os_tools,
            layout,
            search_path,
            transforms,
        } = self;

        info!("Host OS / arch     : {}", options.host);
        info!("Building for target: {}", options.target);
        info!("Build type         : {}", options.build_type);

        let mut store = seed_store(&options, search_path.as_deref());
        let mut diagnostics = Diagnostics::new();

        apply_overrides(&mut libraries, &options, &mut store);
        apply_overrides(&mut tools, &options, &mut store);
        let mut libraries = select_only(libraries, &options);
        let mut tools = select_only(tools, &options);

        let os_tools = check_os_tools(&os_tools, &store, options.host.os, &mut diagnostics);

        let resolver = PathResolver::new(options.target, &options.source_root)
            .with_vcpkg_root(options.vcpkg_root.clone())
            .with_system_layout(layout);
        {
            let mut ctx = ProbeContext {
                store: &mut store,
                resolver: &resolver,
                harness,
                options: &options,
                diagnostics: &mut diagnostics,
            };
            if check_all(&mut tools, &mut ctx) {
                check_all(&mut libraries, &mut ctx);
            }
        }

        transforms.apply(&mut store);

        RunOutcome {
            options,
            store,
            libraries,
            tools,
            os_tools,
            diagnostics,
        }
    }
}

fn seed_store(options: &RunOptions, search_path: Option<&str>) -> ConfigStore {
    let mut store = ConfigStore::new();
    store.set("KBUILD_HOST", options.host.os.as_str());
    store.set("KBUILD_HOST_ARCH", options.host.arch.as_str());
    store.set("KBUILD_TYPE", options.build_type.as_str());
    store.set("KBUILD_TARGET", options.target.os.as_str());
    store.set("KBUILD_TARGET_ARCH", options.target.arch.as_str());
    store.set("KBUILD_TARGET_CPU", "blend");
    store.set_opt("KBUILD_PATH", options.kbuild_path.as_deref().map(path_string));
    store.set("VBOX_WITH_HARDENING", "1");
    let out_base = options
        .out_base
        .clone()
        .unwrap_or_else(|| options.source_root.join("out"));
    store.set("PATH_OUT_BASE", path_string(&out_base));
    store.set_opt("PATH", search_path);
    store.set_opt("VCPKG_ROOT", options.vcpkg_root.as_deref().map(path_string));

    let f = &options.features;
    let markers = [
        ("config_disable_docs", f.disable_docs),
        ("config_build_headless", f.headless),
        ("config_disable_com", f.disable_com),
        ("config_disable_python", f.disable_python),
        ("config_disable_pylint", f.disable_pylint),
        ("config_disable_sdl", f.disable_sdl),
        ("config_disable_udptunnel", f.disable_udptunnel),
        ("config_without_hardening", f.without_hardening && !f.with_hardening),
        ("VBOX_OSE", f.ose),
        ("VBOX_ONLY_ADDITIONS", f.only_additions),
        ("VBOX_ONLY_DOCS", f.only_docs),
    ];
    for (key, on) in markers {
        if on {
            store.set(key, "1");
        }
    }
    store
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

/// Hand each probe its override and record disabled ones as marker keys.
fn apply_overrides<P: Probe>(probes: &mut [P], options: &RunOptions, store: &mut ConfigStore) {
    for probe in probes.iter_mut() {
        let o = options.override_for(probe.name());
        if o.disabled {
            store.set(
                format!("config_{}_disable_{}", probe.kind().marker(), probe.name()),
                "1",
            );
        }
        probe.apply_override(&o);
    }
}

/// With any `--only-<name>` among `probes`, keep just those.
fn select_only<P: Probe>(probes: Vec<P>, options: &RunOptions) -> Vec<P> {
    let only = options.only_selection();
    if !probes.iter().any(|p| only.contains(&p.name())) {
        return probes;
    }
    probes
        .into_iter()
        .filter(|p| only.contains(&p.name()))
        .collect()
}

fn check_os_tools(
    names: &[String],
    store: &ConfigStore,
    host: TargetOs,
    diagnostics: &mut Diagnostics,
) -> Vec<OsToolCheck> {
    names
        .iter()
        .map(|name| {
            info!("Checking for OS tool '{name}' ...");
            let lookup = CommandLookup::new(name, store.get("PATH"), host.exe_suffix());
            match lookup.locate(name) {
                Ok(found) => OsToolCheck {
                    name: name.clone(),
                    path: Some(found.path),
                    version: Some(found.version),
                },
                Err(e) => {
                    diagnostics.error(e.to_string());
                    OsToolCheck {
                        name: name.clone(),
                        path: None,
                        version: None,
                    }
                }
            }
        })
        .collect()
}

/// Check probes in order. Returns whether later groups may still run.
fn check_all<P: Probe>(probes: &mut [P], ctx: &mut ProbeContext<'_>) -> bool {
    let keep_going = ctx.options.continue_on_error;
    for probe in probes.iter_mut() {
        if ctx.diagnostics.has_errors() && !keep_going {
            return false;
        }
        let failure = probe.perform_check(ctx).error().map(ToString::to_string);
        if let Some(message) = failure {
            ctx.diagnostics.error(message);
        }
    }
    !ctx.diagnostics.has_errors() || keep_going
}

/// Final store and probe states of a finished pass.
#[derive(Debug)]
pub struct RunOutcome {
    options: RunOptions,
    store: ConfigStore,
    libraries: Vec<LibraryProbe>,
    tools: Vec<ToolProbe>,
    os_tools: Vec<OsToolCheck>,
    diagnostics: Diagnostics,
}

impl RunOutcome {
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn libraries(&self) -> &[LibraryProbe] {
        &self.libraries
    }

    pub fn tools(&self) -> &[ToolProbe] {
        &self.tools
    }

    pub fn os_tools(&self) -> &[OsToolCheck] {
        &self.os_tools
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn library(&self, name: &str) -> Option<&LibraryProbe> {
        self.libraries.iter().find(|l| l.name() == name)
    }

    pub fn tool(&self, name: &str) -> Option<&ToolProbe> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn success(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Process exit status: zero only without errors.
    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Whether the generated files should be written.
    pub fn should_write(&self) -> bool {
        self.success() || self.options.continue_on_error
    }

    pub fn writer(&self) -> ConfigWriter<'_> {
        ConfigWriter::new(
            &self.store,
            &self.libraries,
            &self.tools,
            self.options.target,
            self.options.host.os,
        )
        .with_command_line(&self.options.command_line)
    }

    /// Write the AutoConfig file and the environment script.
    ///
    /// Returns `false` without touching disk when errors stopped the run.
    pub fn write_outputs(&self) -> Result<bool> {
        if !self.should_write() {
            info!("Not writing configuration files, errors occurred");
            return Ok(false);
        }
        let writer = self.writer();
        writer.write_autoconfig(&self.options.files.autoconfig)?;
        writer.write_env(&self.options.files.env)?;
        Ok(true)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcome(self)
    }

    /// Write the summary as JSON when a path was requested.
    pub fn write_summary_json(&self) -> Result<Option<PathBuf>> {
        let Some(path) = &self.options.files.summary_json else {
            return Ok(None);
        };
        let json = serde_json::to_string_pretty(&self.summary())
            .map_err(|e| ConfigureError::Other(e.into()))?;
        write_file(path, &json)?;
        Ok(Some(path.clone()))
    }

    /// Closing lines printed after the summary tables.
    pub fn advisories(&self, files_written: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let files = &self.options.files;
        let host = self.options.host.os;

        if files_written {
            lines.push(format!(
                "Successfully generated \"{}\" and \"{}\".",
                files.autoconfig.display(),
                files.env.display()
            ));
            if host.is_windows() {
                lines.push("Execute env.bat once before you start to build:".to_string());
                lines.push(format!("  {}", files.env.display()));
            } else {
                lines.push(format!(
                    "Source {} once before you start to build:",
                    files.env.display()
                ));
                lines.push(format!("  source \"{}\"", files.env.display()));
            }
            lines.push("Then run the build with:".to_string());
            lines.push("  kmk".to_string());
        }

        if self.should_write() {
            if self.options.target.os == TargetOs::Linux {
                lines.push("To compile the kernel modules, do:".to_string());
                lines.push(format!(
                    "  cd {}/{}/{}/bin/src",
                    self.store.get("PATH_OUT_BASE").unwrap_or("out"),
                    self.options.target,
                    self.options.build_type
                ));
                lines.push("  make".to_string());
            }
            if self.store.is_set("VBOX_ONLY_ADDITIONS") {
                lines.push("Tree configured to build only the Guest Additions".to_string());
            }
            if self.store.is_set("VBOX_WITH_HARDENING") {
                lines.push(
                    "Hardening is enabled: binaries will not run from the output directory \
                     until installed suid root. Use --without-hardening for development builds."
                        .to_string(),
                );
            } else {
                lines.push(
                    "Hardening is disabled. Do not build packages for distribution with \
                     disabled hardening!"
                        .to_string(),
                );
            }
        }

        let log = files.log.display();
        if self.diagnostics.warning_count() > 0 {
            lines.push(format!(
                "Configuration completed with {} warning(s). See {log} for details.",
                self.diagnostics.warning_count()
            ));
        }
        if self.diagnostics.has_errors() {
            lines.push(format!(
                "Configuration failed with {} error(s). See {log} for details.",
                self.diagnostics.error_count()
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeOverride;
    use crate::harness::{MockHarness, MockOutcome};
    use crate::probe::ProbeState;
    use crate::target::{Target, TargetArch, TargetSet};
    use std::fs;
    use tempfile::TempDir;

    struct Host {
        root: TempDir,
        source: TempDir,
    }

    impl Host {
        fn new() -> Self {
            Self {
                root: TempDir::new().unwrap(),
                source: TempDir::new().unwrap(),
            }
        }

        fn touch(&self, rel: &str) {
            let path = self.root.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        fn options(&self) -> RunOptions {
            let target = Target::new(TargetOs::Linux, TargetArch::Amd64);
            let mut options = RunOptions::new(target).with_source_root(self.source.path());
            options.host = target;
            options
        }

        fn run(&self, options: RunOptions, libs: Vec<LibraryProbe>, harness: &MockHarness) -> RunOutcome {
            ConfigureRun::new(options)
                .with_libraries(libs)
                .with_tools(Vec::new())
                .with_os_tools(&[])
                .with_search_path(None)
                .with_system_layout(SystemLayout::rooted(self.root.path()))
                .check(harness)
        }
    }

    fn lib(name: &str) -> LibraryProbe {
        let header = format!("{name}.h");
        let library = format!("lib{name}");
        LibraryProbe::new(name, &[header.as_str()], &[library.as_str()], TargetSet::Any)
    }

    #[test]
    fn seeds_target_and_markers() {
        let host = Host::new();
        let mut options = host.options();
        options.features.headless = true;
        options.features.ose = true;

        let store = seed_store(&options, Some("/usr/bin"));

        assert_eq!(store.get("KBUILD_TARGET"), Some("linux"));
        assert_eq!(store.get("KBUILD_TARGET_ARCH"), Some("amd64"));
        assert_eq!(store.get("KBUILD_TARGET_CPU"), Some("blend"));
        assert_eq!(store.get("KBUILD_TYPE"), Some("release"));
        assert_eq!(store.get("VBOX_WITH_HARDENING"), Some("1"));
        assert_eq!(store.get("config_build_headless"), Some("1"));
        assert_eq!(store.get("VBOX_OSE"), Some("1"));
        assert_eq!(store.get("PATH"), Some("/usr/bin"));
        assert!(!store.is_set("config_disable_docs"));
        assert!(!store.is_set("KBUILD_PATH"));
        assert_eq!(
            store.get("PATH_OUT_BASE"),
            Some(host.source.path().join("out").display().to_string().as_str())
        );
    }

    #[test]
    fn disabled_probe_records_marker() {
        let host = Host::new();
        let options = host.options().disable("vpx");
        let harness = MockHarness::new();

        let outcome = host.run(options, vec![lib("vpx")], &harness);

        assert_eq!(outcome.store().get("config_libs_disable_vpx"), Some("1"));
        assert_eq!(outcome.library("vpx").unwrap().state(), &ProbeState::Disabled);
        assert!(outcome.success());
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let host = Host::new();
        host.touch("usr/include/good.h");
        host.touch("usr/lib/libgood.so");
        let harness = MockHarness::new();

        let outcome = host.run(host.options(), vec![lib("bad"), lib("good")], &harness);

        assert!(outcome.library("bad").unwrap().state().is_absent());
        assert!(outcome.library("good").unwrap().state().is_unknown());
        assert_eq!(outcome.diagnostics().error_count(), 1);
        assert_eq!(outcome.exit_code(), 1);
        assert!(!outcome.should_write());
    }

    #[test]
    fn continue_on_error_checks_everything() {
        let host = Host::new();
        host.touch("usr/include/good.h");
        host.touch("usr/lib/libgood.so");
        let harness = MockHarness::new().with_outcome("good", MockOutcome::Prints("2.0".into()));
        let options = host.options().with_continue_on_error(true);

        let outcome = host.run(options, vec![lib("bad"), lib("good")], &harness);

        assert!(outcome.library("bad").unwrap().state().is_absent());
        assert!(outcome.library("good").unwrap().state().is_present());
        assert_eq!(outcome.store().get("VBOX_WITH_GOOD"), Some("1"));
        assert_eq!(outcome.exit_code(), 1);
        assert!(outcome.should_write());
    }

    #[test]
    fn only_selection_limits_libraries() {
        let host = Host::new();
        host.touch("usr/include/good.h");
        host.touch("usr/lib/libgood.so");
        let mut options = host.options();
        options.probe_overrides.insert(
            "good".into(),
            ProbeOverride {
                only: true,
                ..Default::default()
            },
        );
        let harness = MockHarness::new();

        let outcome = host.run(options, vec![lib("bad"), lib("good")], &harness);

        assert_eq!(outcome.libraries().len(), 1);
        assert!(outcome.library("bad").is_none());
        assert!(outcome.success());
    }

    #[test]
    fn missing_os_tool_is_an_error() {
        let host = Host::new();
        let empty = TempDir::new().unwrap();
        let harness = MockHarness::new();

        let outcome = ConfigureRun::new(host.options())
            .with_libraries(vec![lib("never")])
            .with_tools(Vec::new())
            .with_os_tools(&["definitely-not-installed-tool"])
            .with_search_path(Some(empty.path().display().to_string()))
            .with_system_layout(SystemLayout::rooted(host.root.path()))
            .check(&harness);

        assert!(!outcome.os_tools()[0].found());
        assert_eq!(outcome.diagnostics().error_count(), 1);
        assert!(outcome.library("never").unwrap().state().is_unknown());
    }

    #[test]
    fn write_outputs_is_gated_on_errors() {
        let host = Host::new();
        let out = TempDir::new().unwrap();
        let mut options = host.options();
        options.files.autoconfig = out.path().join("AutoConfig.kmk");
        options.files.env = out.path().join("env.sh");
        let harness = MockHarness::new();

        let failed = host.run(options.clone(), vec![lib("bad")], &harness);
        assert!(!failed.write_outputs().unwrap());
        assert!(!options.files.autoconfig.exists());

        let clean = host.run(options.clone(), Vec::new(), &harness);
        assert!(clean.write_outputs().unwrap());
        assert!(options.files.autoconfig.exists());
        assert!(options.files.env.exists());
    }

    #[test]
    fn advisories_report_counts() {
        let host = Host::new();
        let harness = MockHarness::new();
        let outcome = host.run(
            host.options().with_continue_on_error(true),
            vec![lib("bad")],
            &harness,
        );

        let lines = outcome.advisories(false);

        assert!(lines
            .iter()
            .any(|l| l.starts_with("Configuration failed with 1 error(s)")));
        assert!(lines.iter().any(|l| l.starts_with("Hardening is enabled")));
    }
}
