//! In-tree development tools (`tools/<target>.<arch>`).

use super::{devtools_root, target_dir_name};
use crate::error::ProbeError;
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};

/// Records `KBUILD_DEVTOOLS`. Missing devtools are only a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevToolsDetector;

impl ToolDetector for DevToolsDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        if let Some(existing) = ctx.store.get("KBUILD_DEVTOOLS") {
            return Ok(ToolDetection {
                command_path: Some(existing.into()),
                version: None,
            });
        }

        let roots = match req.custom_path {
            Some(path) => vec![path.to_path_buf()],
            None => ctx.options.search_paths.tools.around(vec![devtools_root(ctx)]),
        };
        let leaf = target_dir_name(ctx);
        if let Some(dir) = roots.iter().map(|r| r.join(&leaf)).find(|d| d.is_dir()) {
            ctx.store.set("KBUILD_DEVTOOLS", dir.display().to_string());
            return Ok(ToolDetection {
                command_path: Some(dir),
                version: None,
            });
        }

        ctx.diagnostics.warning(format!(
            "{}: no {leaf} devtools in {} location(s)",
            req.name,
            roots.len()
        ));
        Ok(ToolDetection::default())
    }
}
