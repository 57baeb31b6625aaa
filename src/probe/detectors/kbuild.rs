//! kBuild tree detection.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{devtools_root, target_dir_name};
use crate::error::ProbeError;
use crate::probe::which::CommandLookup;
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};

/// Makefiles every kBuild tree ships.
const REQUIRED_MAKEFILES: &[&str] = &["header.kmk", "footer.kmk", "rules.kmk"];

/// Finds a usable kBuild tree and records `KBUILD_PATH`.
///
/// The tree is taken from the custom path, an existing `KBUILD_PATH`, or the
/// `kBuild/kBuild` and `kBuild` directories of the source root, in that
/// order.
#[derive(Debug, Default, Clone, Copy)]
pub struct KbuildDetector;

impl ToolDetector for KbuildDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let candidates = candidates(req, ctx);
        let bin_name = target_dir_name(ctx);
        let exe_suffix = ctx.host().os.exe_suffix();

        let mut last_err = None;
        for root in &candidates {
            debug!("{}: checking {}", req.name, root.display());
            match check_tree(req.name, root, &bin_name, exe_suffix) {
                Ok(kmk) => {
                    info!("{}: using {}", req.name, root.display());
                    ctx.store.set("KBUILD_PATH", root.display().to_string());
                    check_devtools(req.name, ctx);
                    return Ok(ToolDetection {
                        command_path: Some(kmk),
                        version: None,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ProbeError::detection(req.name, "no kBuild tree found")
        }))
    }
}

fn candidates(req: &DetectRequest<'_>, ctx: &ProbeContext<'_>) -> Vec<PathBuf> {
    if let Some(custom) = req.custom_path {
        return vec![custom.to_path_buf()];
    }
    if let Some(path) = ctx.options.kbuild_path.as_ref() {
        return vec![path.clone()];
    }
    if let Some(path) = ctx.store.get("KBUILD_PATH") {
        return vec![PathBuf::from(path)];
    }
    // Git submodules place kBuild one level deeper than svn externals.
    let root = ctx.source_root();
    vec![root.join("kBuild").join("kBuild"), root.join("kBuild")]
        .into_iter()
        .filter(|p| p.is_dir())
        .collect()
}

/// `bin/<target>.<arch>` must hold `kmk` and `kmk_ash`, and the tree the
/// core makefiles. Returns the `kmk` path.
fn check_tree(
    probe: &str,
    root: &Path,
    bin_name: &str,
    exe_suffix: &'static str,
) -> Result<PathBuf, ProbeError> {
    let bin = root.join("bin").join(bin_name);
    let lookup = CommandLookup::new(probe, None, exe_suffix).in_dir(Some(&bin));
    let kmk = lookup.find("kmk")?;
    lookup.find("kmk_ash")?;

    let missing: Vec<String> = REQUIRED_MAKEFILES
        .iter()
        .filter(|f| !root.join(f).is_file())
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ProbeError::detection(
            probe,
            format!("{} is missing {}", root.display(), missing.join(", ")),
        ));
    }
    Ok(kmk)
}

/// A devtools tree without `ZIP.kmk` is reported but does not fail kBuild.
fn check_devtools(probe: &str, ctx: &mut ProbeContext<'_>) {
    let devtools = ctx
        .store
        .get("KBUILD_DEVTOOLS")
        .map(PathBuf::from)
        .or_else(|| Some(devtools_root(ctx)).filter(|p| p.is_dir()));

    match devtools {
        Some(dir) if dir.join("ZIP.kmk").is_file() => {
            info!("{}: devtools at {}", probe, dir.display());
        }
        Some(dir) => ctx.diagnostics.warning(format!(
            "{probe}: devtools at {} look incomplete (no ZIP.kmk)",
            dir.display()
        )),
        None => ctx
            .diagnostics
            .warning(format!("{probe}: kBuild devtools not found")),
    }
}
