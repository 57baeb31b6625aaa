//! Custom [`ToolDetector`](super::ToolDetector) implementations.
//!
//! Each detector handles one tool whose presence can't be decided by
//! looking up command names: compiler toolchains, kBuild trees, installer
//! databases, interpreter capabilities.

mod devtools;
mod gcc;
mod gsoap;
mod kbuild;
mod openwatcom;
mod python;
mod visualcpp;
mod xcode;

pub use devtools::DevToolsDetector;
pub use gcc::GccDetector;
pub use gsoap::GsoapDetector;
pub use kbuild::KbuildDetector;
pub use openwatcom::OpenWatcomDetector;
pub use python::{PythonCApiDetector, PythonModulesDetector};
pub use visualcpp::VisualCppDetector;
pub use xcode::XcodeDetector;

use std::path::PathBuf;

use super::which::CommandLookup;
use super::ProbeContext;

/// `<source root>/tools`, the in-tree devtools root.
pub(crate) fn devtools_root(ctx: &ProbeContext<'_>) -> PathBuf {
    ctx.source_root().join("tools")
}

/// `<target>.<arch>` directory name used by kBuild and devtools.
pub(crate) fn target_dir_name(ctx: &ProbeContext<'_>) -> String {
    let target = ctx.target();
    format!("{}.{}", target.os, target.arch)
}

/// Command lookup on the store's `PATH`.
pub(crate) fn path_lookup<'a>(name: &'a str, ctx: &ProbeContext<'_>) -> CommandLookup<'a> {
    CommandLookup::new(name, ctx.store.get("PATH"), ctx.host().os.exe_suffix())
}
