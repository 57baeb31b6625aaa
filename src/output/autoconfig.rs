//! `AutoConfig.kmk` build-variable file.

use std::fmt::Write;

use super::{normalize, ConfigWriter};
use crate::probe::{variable_base, Probe};

/// Store key prefixes written to the build-variable file.
pub const PREFIXES: &[&str] = &["VBOX_", "PATH_TOOL_", "SDK_", "TOOL_"];

pub(super) fn render(w: &ConfigWriter<'_>) -> String {
    let mut out = String::from("\n");
    for line in w.banner("Makefile") {
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            let _ = writeln!(out, "# {line}");
        }
    }
    out.push('\n');

    for (key, value) in w.store.with_prefixes(PREFIXES) {
        let _ = writeln!(out, "{key}={}", normalize(value));
    }

    // Libraries without a flag are written as explicitly disabled.
    let disabled: Vec<String> = w
        .libraries
        .iter()
        .map(|lib| format!("VBOX_WITH_{}", variable_base(lib.name())))
        .filter(|key| !w.store.is_set(key))
        .collect();
    if !disabled.is_empty() {
        out.push('\n');
        for key in disabled {
            let _ = writeln!(out, "{key}=");
        }
    }
    out
}
