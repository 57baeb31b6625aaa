//! Open Watcom compilers.

use super::path_lookup;
use crate::error::ProbeError;
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};
use crate::target::{Target, TargetArch, TargetOs};

/// Looks up the Open Watcom commands, inside the per-OS binary directory
/// when a custom installation root is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenWatcomDetector;

/// Binary sub-directory Open Watcom ships for `target`.
fn bin_subdir(target: Target) -> Option<&'static str> {
    match target.os {
        TargetOs::Darwin => Some("binosx"),
        TargetOs::Linux if target.arch == TargetArch::Arm64 => Some("arml64"),
        TargetOs::Linux => Some("binl64"),
        TargetOs::Solaris => Some("binsol"),
        TargetOs::Windows => Some("binnt"),
        TargetOs::Bsd => Some("binnbsd"),
        TargetOs::Haiku | TargetOs::Unknown => None,
    }
}

impl ToolDetector for OpenWatcomDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let target = ctx.target();
        let subdir = bin_subdir(target).ok_or_else(|| {
            ProbeError::detection(req.name, format!("Open Watcom is not supported on {}", target.os))
        })?;
        let dir = req.custom_path.map(|p| p.join(subdir));
        let lookup = path_lookup(req.name, ctx).in_dir(dir.as_deref());

        let mut detection = ToolDetection::default();
        for cmd in req.commands {
            let found = lookup.locate(cmd)?;
            if detection.command_path.is_none() {
                detection.command_path = Some(found.path);
                detection.version = Some(found.version);
            }
        }
        Ok(detection)
    }
}
