//! GNU compiler collection.

use std::path::Path;

use tracing::info;

use super::path_lookup;
use crate::error::ProbeError;
use crate::harness::{CPP_COMPILER_KEY, C_COMPILER_KEY};
use crate::probe::{DetectRequest, ProbeContext, ToolDetection, ToolDetector};
use crate::target::{TargetArch, TargetOs};

const VERSION_SWITCHES: &[&str] = &["-dumpfullversion", "-dumpversion"];

/// Finds matching `gcc` and `g++` and records the kBuild GCC tool keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct GccDetector;

impl ToolDetector for GccDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError> {
        let lookup = path_lookup(req.name, ctx)
            .in_dir(req.custom_path)
            .with_switches(VERSION_SWITCHES);
        let gcc = lookup.locate("gcc")?;
        let gxx = lookup.locate("g++")?;

        if gcc.version != gxx.version {
            return Err(ProbeError::detection(
                req.name,
                format!(
                    "gcc ({}) and g++ ({}) versions do not match",
                    gcc.version, gxx.version
                ),
            ));
        }
        info!("{}: gcc/g++ {} at {}", req.name, gcc.version, gcc.path.display());

        let cc = base_name(&gcc.path);
        let cxx = base_name(&gxx.path);
        record_tool_keys(ctx, &cc, &cxx);

        ctx.store.set(C_COMPILER_KEY, gcc.path.display().to_string());
        ctx.store.set(CPP_COMPILER_KEY, gxx.path.display().to_string());

        Ok(ToolDetection {
            command_path: Some(gcc.path),
            version: Some(gcc.version),
        })
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn record_tool_keys(ctx: &mut ProbeContext<'_>, cc: &str, cxx: &str) {
    let host_arch = ctx.host().arch;
    let target = ctx.target();
    let store = &mut *ctx.store;

    store.set("CC32", cc);
    store.set("CXX32", cxx);
    match (host_arch, target.arch) {
        (TargetArch::Amd64, _) => {
            store.append("CC32", " -m32");
            store.append("CXX32", " -m32");
        }
        (TargetArch::X86, TargetArch::Amd64) => {
            store.append("CC32", " -m64");
            store.append("CXX32", " -m64");
        }
        (_, TargetArch::Amd64) => {
            store.unset("CC32");
            store.unset("CXX32");
        }
        _ => {}
    }

    if cc != "gcc" {
        for key in ["TOOL_GCC3_CC", "TOOL_GCC3_AS", "TOOL_GCC3_LD", "TOOL_GXX3_CC", "TOOL_GXX3_AS"] {
            store.set(key, cc);
        }
    }
    if cxx != "g++" {
        for key in ["TOOL_GCC3_CXX", "TOOL_GXX3_CXX", "TOOL_GXX3_LD"] {
            store.set(key, cxx);
        }
    }

    if let Some(cc32) = store.get("CC32").map(str::to_string) {
        if cc32 != "gcc -m32" {
            for key in ["TOOL_GCC3_CC", "TOOL_GCC3_AS", "TOOL_GCC3_LD", "TOOL_GXX3_CC", "TOOL_GXX3_AS"] {
                store.set(key, cc32.as_str());
            }
        }
    }
    if let Some(cxx32) = store.get("CXX32").map(str::to_string) {
        if cxx32 != "g++ -m32" {
            for key in ["TOOL_GCC32_CXX", "TOOL_GXX32_CXX", "TOOL_GXX32_LD"] {
                store.set(key, cxx32.as_str());
            }
        }
    }

    let cc64 = store.get("CC64").unwrap_or(cc).to_string();
    let cxx64 = store.get("CXX64").unwrap_or(cxx).to_string();
    store.set("TOOL_Bs3Gcc64Elf64_CC", cc64);
    store.set("TOOL_Bs3Gcc64Elf64_CXX", cxx64);

    // Solaris ships a 32-bit gcc by default.
    if target.os == TargetOs::Solaris && target.arch == TargetArch::Amd64 && cc == "gcc" {
        store.set("CC", "gcc -m64");
        store.set("CXX", "g++ -m64");
    }
}
