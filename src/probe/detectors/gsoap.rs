//! gSOAP toolkit, needed for the web services.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use super::{devtools_root, path_lookup};
use crate::error::ProbeError;
use crate::harness::{run_with_timeout, Completion};
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};

const PACKAGE: &str = "gsoapssl++";
const PKG_CONFIG_TIMEOUT: Duration = Duration::from_secs(10);

/// Locates a gSOAP installation.
///
/// Sources tried in order: custom path or `VBOX_PATH_GSOAP`, pkg-config,
/// the newest `tools/common/gsoap/v*` devtools copy, then `soapcpp2` and
/// `wsdl2h` side by side on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GsoapDetector;

impl ToolDetector for GsoapDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let mut libs = None;
        let mut root = req
            .custom_path
            .map(Path::to_path_buf)
            .or_else(|| ctx.store.get("VBOX_PATH_GSOAP").map(PathBuf::from));

        if root.is_none() {
            if let Ok(pkg_config) = path_lookup(req.name, ctx).find("pkg-config") {
                libs = package_info(&pkg_config, "--libs");
                if libs.is_some() {
                    root = package_info(&pkg_config, "--variable=exec_prefix").map(PathBuf::from);
                }
            }
        }
        if root.is_none() {
            root = newest_devtools_copy(&devtools_root(ctx));
        }
        let mut command_path = None;
        if root.is_none() {
            let lookup = path_lookup(req.name, ctx);
            if let (Ok(soapcpp2), Ok(wsdl2h)) = (lookup.find("soapcpp2"), lookup.find("wsdl2h")) {
                if soapcpp2.parent() == wsdl2h.parent() {
                    // <prefix>/bin/soapcpp2
                    root = soapcpp2.parent().and_then(Path::parent).map(Path::to_path_buf);
                    command_path = Some(soapcpp2);
                }
            }
        }

        let Some(root) = root else {
            return Err(ProbeError::detection(req.name, "gSOAP not found"));
        };
        info!("{}: using {}", req.name, root.display());

        let share = root.join("share").join("gsoap");
        let source = share.join("stdsoap2.cpp");
        ctx.store.set("VBOX_GSOAP_INSTALLED", "1");
        ctx.store.set("VBOX_PATH_GSOAP", root.display().to_string());
        ctx.store.set("VBOX_PATH_GSOAP_IMPORT", share.join("import").display().to_string());
        ctx.store.set_opt(
            "VBOX_GSOAP_CXX_SOURCES",
            source.is_file().then(|| source.display().to_string()),
        );
        ctx.store.set_opt("VBOX_GSOAP_CXX_LIBS", libs);

        Ok(ToolDetection {
            command_path: command_path.or(Some(root)),
            version: None,
        })
    }
}

/// Trimmed stdout of `pkg-config <what> gsoapssl++`, `None` on any failure.
fn package_info(pkg_config: &Path, what: &str) -> Option<String> {
    let mut cmd = Command::new(pkg_config);
    cmd.args([what, PACKAGE]);
    match run_with_timeout(&mut cmd, PKG_CONFIG_TIMEOUT) {
        Ok(Completion::Exited(out)) if out.success() => {
            let text = out.stdout_lossy().trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => {
            debug!("package '{}' invalid or not found", PACKAGE);
            None
        }
    }
}

fn newest_devtools_copy(devtools: &Path) -> Option<PathBuf> {
    let base = devtools.join("common").join("gsoap");
    let mut versions: Vec<PathBuf> = std::fs::read_dir(base)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('v'))
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort();
    versions.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::detectors::testing::Bench;
    use crate::target::TargetOs;
    use tempfile::TempDir;

    fn empty_path(bench: &mut Bench, dir: &Path) {
        bench.store.set("PATH", dir.display().to_string());
    }

    #[test]
    fn newest_devtools_copy_wins() {
        let source = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let gsoap = source.path().join("tools/common/gsoap");
        std::fs::create_dir_all(gsoap.join("v2.8.104")).unwrap();
        std::fs::create_dir_all(gsoap.join("v2.8.132/share/gsoap")).unwrap();
        std::fs::write(gsoap.join("v2.8.132/share/gsoap/stdsoap2.cpp"), "").unwrap();
        let mut bench = Bench::new(TargetOs::Linux, source.path());
        empty_path(&mut bench, bin.path());

        bench.detect(&GsoapDetector, "gsoap", &[], None).unwrap();

        let root = gsoap.join("v2.8.132");
        let root_str = root.display().to_string();
        assert_eq!(bench.store.get("VBOX_PATH_GSOAP"), Some(root_str.as_str()));
        assert_eq!(bench.store.get("VBOX_GSOAP_INSTALLED"), Some("1"));
        assert!(bench.store.is_set("VBOX_GSOAP_CXX_SOURCES"));
        assert!(!bench.store.is_set("VBOX_GSOAP_CXX_LIBS"));
    }

    #[test]
    fn nothing_found_fails_and_records_nothing() {
        let source = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let mut bench = Bench::new(TargetOs::Linux, source.path());
        empty_path(&mut bench, bin.path());

        let err = bench.detect(&GsoapDetector, "gsoap", &[], None).unwrap_err();

        assert!(matches!(err, ProbeError::DetectionFailed { .. }));
        assert!(!bench.store.is_set("VBOX_GSOAP_INSTALLED"));
    }

    #[cfg(unix)]
    #[test]
    fn pkg_config_supplies_libs_and_prefix() {
        use crate::probe::detectors::testing::script;

        let source = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        script(
            bin.path(),
            "pkg-config",
            "case \"$1\" in --libs) echo '-lgsoapssl++ -lssl';; --variable=exec_prefix) echo /opt/gsoap;; esac",
        );
        let mut bench = Bench::new(TargetOs::Linux, source.path());
        empty_path(&mut bench, bin.path());

        bench.detect(&GsoapDetector, "gsoap", &[], None).unwrap();

        assert_eq!(bench.store.get("VBOX_PATH_GSOAP"), Some("/opt/gsoap"));
        assert_eq!(bench.store.get("VBOX_GSOAP_CXX_LIBS"), Some("-lgsoapssl++ -lssl"));
        assert_eq!(
            bench.store.get("VBOX_PATH_GSOAP_IMPORT"),
            Some("/opt/gsoap/share/gsoap/import")
        );
    }

    #[cfg(unix)]
    #[test]
    fn side_by_side_binaries_give_prefix() {
        use crate::probe::detectors::testing::script;

        let source = TempDir::new().unwrap();
        let prefix = TempDir::new().unwrap();
        let bin = prefix.path().join("bin");
        script(&bin, "soapcpp2", "exit 0");
        script(&bin, "wsdl2h", "exit 0");
        let mut bench = Bench::new(TargetOs::Linux, source.path());
        empty_path(&mut bench, &bin);

        let found = bench.detect(&GsoapDetector, "gsoap", &[], None).unwrap();

        assert_eq!(found.command_path, Some(bin.join("soapcpp2")));
        let prefix_str = prefix.path().display().to_string();
        assert_eq!(bench.store.get("VBOX_PATH_GSOAP"), Some(prefix_str.as_str()));
    }
}
