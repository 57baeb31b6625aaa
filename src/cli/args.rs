//! CLI argument definitions.
//!
//! Global switches are declared with clap's derive macros on [`Cli`].
//! Per-probe switches (`--disable-<name>`, `--with-<name>-path`,
//! `--only-<name>`) are generated from the probe catalog at runtime and read
//! back into an explicit map of [`ProbeOverride`] records.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::config::{FeatureFlags, OutputFiles, PathList, ProbeOverride, RunOptions, SearchPaths};
use crate::error::Result;
use crate::probe::{catalog, Probe};
use crate::target::{BuildType, Target, TargetArch, TargetOs};

/// confprobe - probe build dependencies and write the build configuration.
#[derive(Debug, Parser)]
#[command(name = "confprobe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Raise verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug logging and keep compile test scratch files
    #[arg(long)]
    pub debug: bool,

    /// Keep checking after a failure
    #[arg(long, visible_alias = "nofatal")]
    pub continue_on_error: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Target operating system (defaults to the host)
    #[arg(long, value_name = "OS")]
    pub build_target: Option<String>,

    /// Target architecture (defaults to the host)
    #[arg(long, value_name = "ARCH")]
    pub build_arch: Option<String>,

    /// Configure a debug build
    #[arg(long, conflicts_with = "build_profile")]
    pub build_debug: bool,

    /// Configure a profile build
    #[arg(long)]
    pub build_profile: bool,

    /// Build without a GUI
    #[arg(long)]
    pub build_headless: bool,

    /// Do not build the documentation
    #[arg(long)]
    pub disable_docs: bool,

    /// Do not build the Python bindings
    #[arg(long)]
    pub disable_python: bool,

    /// Do not run pylint
    #[arg(long)]
    pub disable_pylint: bool,

    /// Do not build the SDL frontend
    #[arg(long)]
    pub disable_sdl: bool,

    /// Do not build the UDP tunnel
    #[arg(long)]
    pub disable_udptunnel: bool,

    /// Do not build COM/XPCOM and its consumers
    #[arg(long)]
    pub disable_com: bool,

    /// Build with hardening (the default)
    #[arg(long, conflicts_with = "without_hardening")]
    pub with_hardening: bool,

    /// Build without hardening
    #[arg(long, visible_alias = "disable-hardening")]
    pub without_hardening: bool,

    /// Only build the Guest Additions
    #[arg(long)]
    pub only_additions: bool,

    /// Only build the documentation
    #[arg(long)]
    pub only_docs: bool,

    /// Build the open source edition
    #[arg(long)]
    pub ose: bool,

    /// Output directory (default: <source-root>/out)
    #[arg(long, value_name = "DIR")]
    pub path_out_base: Option<PathBuf>,

    /// Build-variable file to write
    #[arg(long, value_name = "FILE", default_value = "AutoConfig.kmk")]
    pub file_autoconfig: PathBuf,

    /// Environment script to write (default: env.sh, env.bat on Windows)
    #[arg(long, value_name = "FILE")]
    pub file_env: Option<PathBuf>,

    /// Log file
    #[arg(long, value_name = "FILE", default_value = "configure.log")]
    pub file_log: PathBuf,

    /// Also write the run summary as JSON
    #[arg(long, value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Root of the source tree to configure
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source_root: PathBuf,

    /// vcpkg root used for Windows library lookups
    #[arg(long = "with-win-vcpkg-root", value_name = "DIR", env = "VCPKG_ROOT")]
    pub vcpkg_root: Option<PathBuf>,

    /// Searched before the Program Files directories
    #[arg(long, value_name = "DIR")]
    pub prepend_programfiles_path: Vec<PathBuf>,

    /// Searched after the Program Files directories
    #[arg(long, value_name = "DIR")]
    pub append_programfiles_path: Vec<PathBuf>,

    /// Searched for devtools before the in-tree tools directory
    #[arg(long, value_name = "DIR")]
    pub prepend_tools_path: Vec<PathBuf>,

    /// Searched for devtools after the in-tree tools directory
    #[arg(long, value_name = "DIR")]
    pub append_tools_path: Vec<PathBuf>,
}

/// Names that get per-probe switches: every catalog library and tool.
pub fn probe_names() -> Vec<String> {
    let mut names: Vec<String> = catalog::libraries()
        .iter()
        .map(|l| l.name().to_string())
        .chain(catalog::tools().iter().map(|t| t.name().to_string()))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn arg_id(kind: &str, probe: &str) -> String {
    format!("{kind}:{probe}")
}

/// The full command: derived globals plus generated per-probe switches.
pub fn command(probes: &[String]) -> clap::Command {
    let mut cmd = Cli::command();
    for name in probes {
        cmd = cmd
            .arg(
                Arg::new(arg_id("disable", name))
                    .long(format!("disable-{name}"))
                    .action(ArgAction::SetTrue)
                    .help(format!("Disable {name}"))
                    .help_heading("Probes"),
            )
            .arg(
                Arg::new(arg_id("path", name))
                    .long(format!("with-{name}-path"))
                    .value_name("PATH")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help(format!("Look for {name} in PATH"))
                    .help_heading("Probes"),
            )
            .arg(
                Arg::new(arg_id("only", name))
                    .long(format!("only-{name}"))
                    .action(ArgAction::SetTrue)
                    .hide(true),
            );
    }
    cmd
}

/// Collect the per-probe switches that were given.
fn probe_overrides(matches: &ArgMatches, probes: &[String]) -> BTreeMap<String, ProbeOverride> {
    let mut overrides = BTreeMap::new();
    for name in probes {
        let o = ProbeOverride {
            disabled: matches.get_flag(&arg_id("disable", name)),
            custom_path: matches.get_one::<PathBuf>(&arg_id("path", name)).cloned(),
            only: matches.get_flag(&arg_id("only", name)),
        };
        if o != ProbeOverride::default() {
            overrides.insert(name.clone(), o);
        }
    }
    overrides
}

impl Cli {
    /// Parse `args` (program name first) against `probes`' switches.
    pub fn try_parse_with_probes<I, T>(
        args: I,
        probes: &[String],
    ) -> std::result::Result<(Self, BTreeMap<String, ProbeOverride>), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command(probes).try_get_matches_from(args)?;
        let cli = Cli::from_arg_matches(&matches)?;
        Ok((cli, probe_overrides(&matches, probes)))
    }

    fn build_type(&self) -> BuildType {
        if self.build_debug {
            BuildType::Debug
        } else if self.build_profile {
            BuildType::Profile
        } else {
            BuildType::Release
        }
    }

    /// Translate into the record the core runs from.
    pub fn into_options(
        self,
        overrides: BTreeMap<String, ProbeOverride>,
        command_line: Vec<String>,
    ) -> Result<RunOptions> {
        let host = Target::host();
        let os = match self.build_target.as_deref() {
            Some(value) => value.parse::<TargetOs>()?,
            None => host.os,
        };
        let arch = match self.build_arch.as_deref() {
            Some(value) => value.parse::<TargetArch>()?,
            None => host.arch,
        };

        let mut options = RunOptions::new(Target::new(os, arch));
        options.build_type = self.build_type();
        options.debug = self.debug;
        options.continue_on_error = self.continue_on_error;
        options.verbosity = self.verbose;
        options.source_root = self.source_root;
        options.out_base = self.path_out_base;
        options.vcpkg_root = self.vcpkg_root;
        options.kbuild_path = overrides.get("kbuild").and_then(|o| o.custom_path.clone());

        let defaults = OutputFiles::for_host(options.host.os.is_windows());
        options.files = OutputFiles {
            autoconfig: self.file_autoconfig,
            env: self.file_env.unwrap_or(defaults.env),
            log: self.file_log,
            summary_json: self.summary_json,
        };

        options.features = FeatureFlags {
            headless: self.build_headless,
            disable_docs: self.disable_docs,
            disable_python: self.disable_python,
            disable_pylint: self.disable_pylint,
            disable_sdl: self.disable_sdl,
            disable_udptunnel: self.disable_udptunnel,
            disable_com: self.disable_com,
            with_hardening: self.with_hardening,
            without_hardening: self.without_hardening,
            only_additions: self.only_additions,
            only_docs: self.only_docs,
            ose: self.ose,
        };
        options.search_paths = SearchPaths {
            programfiles: PathList {
                prepend: self.prepend_programfiles_path,
                append: self.append_programfiles_path,
            },
            tools: PathList {
                prepend: self.prepend_tools_path,
                append: self.append_tools_path,
            },
        };
        options.probe_overrides = overrides;
        options.command_line = command_line;
        Ok(options)
    }
}
