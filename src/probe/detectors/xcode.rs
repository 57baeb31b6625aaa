//! Xcode Command Line Tools.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::ProbeError;
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};

const COMMAND_LINE_TOOLS: &str = "/Library/Developer/CommandLineTools";

#[derive(Debug, Clone)]
pub struct XcodeDetector {
    default_root: PathBuf,
}

impl Default for XcodeDetector {
    fn default() -> Self {
        Self {
            default_root: PathBuf::from(COMMAND_LINE_TOOLS),
        }
    }
}

impl XcodeDetector {
    /// Search `root` instead of the system Command Line Tools location.
    pub fn with_default_root(root: impl Into<PathBuf>) -> Self {
        Self {
            default_root: root.into(),
        }
    }
}

impl ToolDetector for XcodeDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        _ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let candidates = req
            .custom_path
            .map(|p| p.to_path_buf())
            .into_iter()
            .chain(std::iter::once(self.default_root.clone()));

        for root in candidates.filter(|p| p.is_dir()) {
            debug!("{}: checking for CommandLineTools at {}", req.name, root.display());
            let clang = root.join("usr/bin/clang");
            let xcodebuild = root.join("usr/bin/xcodebuild");
            if clang.is_file() && xcodebuild.is_file() {
                info!("{}: found CommandLineTools at {}", req.name, root.display());
                return Ok(ToolDetection {
                    command_path: Some(xcodebuild),
                    version: None,
                });
            }
        }

        Err(ProbeError::detection(req.name, "CommandLineTools not found"))
    }
}
