//! Library probes.

use tracing::{debug, info};

use super::{variable_base, Detection, Probe, ProbeContext, ProbeKind, ProbeState};
use crate::config::ProbeOverride;
use crate::error::ProbeError;
use crate::harness::{synthesize_source, CompileRequest, Toolchain, FOUND_MARKER};
use crate::store::ConfigStore;
use crate::target::{TargetOs, TargetSet};

/// Detects a native library from its headers and library files.
#[derive(Debug, Clone)]
pub struct LibraryProbe {
    name: String,
    headers: Vec<String>,
    alt_headers: Vec<String>,
    libraries: Vec<String>,
    targets: TargetSet,
    excluded: Vec<TargetOs>,
    code: Option<String>,
    overrides: ProbeOverride,
    state: ProbeState,
}

impl LibraryProbe {
    pub fn new(name: &str, headers: &[&str], libraries: &[&str], targets: TargetSet) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            alt_headers: Vec::new(),
            libraries: libraries.iter().map(|s| s.to_string()).collect(),
            targets,
            excluded: Vec::new(),
            code: None,
            overrides: ProbeOverride::default(),
            state: ProbeState::Unknown,
        }
    }

    /// Test program printing the library version.
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Headers accepted when a primary header is missing.
    pub fn with_alt_headers(mut self, headers: &[&str]) -> Self {
        self.alt_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Targets on which the probe never runs, even if `targets` allows it.
    pub fn excluding(mut self, oses: &[TargetOs]) -> Self {
        self.excluded = oses.to_vec();
        self
    }

    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().map(String::as_str).collect()
    }

    pub fn libraries(&self) -> Vec<&str> {
        self.libraries.iter().map(String::as_str).collect()
    }

    fn evaluate(&self, ctx: &mut ProbeContext<'_>) -> ProbeState {
        let os = ctx.target().os;
        if self.excluded.contains(&os) {
            debug!("{}: excluded on {}", self.name, os);
            return ProbeState::SkippedByTarget;
        }
        if self.overrides.disabled {
            info!("{}: disabled", self.name);
            return ProbeState::Disabled;
        }
        if !self.targets.contains(os) {
            debug!(
                "{}: only for {}, skipping on {}",
                self.name,
                self.targets.describe(),
                os
            );
            return ProbeState::SkippedByTarget;
        }

        let custom = self.overrides.custom_path.as_deref();
        if custom.is_none() {
            if let Some(copy) = ctx.resolver.vendored_copy(&self.name) {
                info!(
                    "{}: found library in-tree at '{}', skipping check",
                    self.name,
                    copy.path.display()
                );
                return ProbeState::Present(Detection {
                    version: copy.version,
                    include_paths: vec![copy.path],
                    vendored: true,
                    ..Default::default()
                });
            }
        }

        info!("{}: testing library ...", self.name);
        match self.check(ctx, custom) {
            Ok(detection) => ProbeState::Present(detection),
            Err(e) => ProbeState::Absent(e),
        }
    }

    fn check(
        &self,
        ctx: &mut ProbeContext<'_>,
        custom: Option<&std::path::Path>,
    ) -> Result<Detection, ProbeError> {
        let headers = self.headers();
        let alt_headers: Vec<&str> = self.alt_headers.iter().map(String::as_str).collect();
        let libraries = self.libraries();

        let all_headers: Vec<&str> = headers.iter().chain(&alt_headers).copied().collect();
        let search = ctx.resolver.include_paths(&self.name, &all_headers, custom);
        let include_paths = ctx
            .resolver
            .locate_headers(&self.name, &headers, &alt_headers, &search)?;
        if !all_headers.is_empty() {
            debug!("{}: all header files found", self.name);
        }

        let library_paths = if libraries.is_empty() {
            Vec::new()
        } else {
            let search = ctx.resolver.library_paths(&self.name, &libraries, custom);
            let found = ctx
                .resolver
                .locate_libraries(&self.name, &libraries, &search)?;
            debug!("{}: all libraries found", self.name);
            found
        };

        let source = synthesize_source(&headers, &alt_headers, self.code.as_deref());
        if source.is_empty() {
            return Ok(Detection {
                include_paths,
                library_paths,
                ..Default::default()
            });
        }

        let toolchain = Toolchain::from_store(ctx.store, ctx.target().os);
        let request = CompileRequest {
            name: &self.name,
            target: ctx.target(),
            include_paths: &include_paths,
            library_paths: &library_paths,
            headers: &headers,
            libraries: &libraries,
            source: &source,
        };
        let output = ctx.harness.compile_and_run(&toolchain, &request)?;
        let version = if output.is_empty() || output == FOUND_MARKER {
            None
        } else {
            Some(output)
        };

        Ok(Detection {
            version,
            include_paths,
            library_paths,
            ..Default::default()
        })
    }

    /// Write the outcome into the store.
    fn publish(&self, store: &mut ConfigStore) {
        let var = variable_base(&self.name);
        let flag = format!("VBOX_WITH_{var}");
        match &self.state {
            ProbeState::Present(d) => {
                store.set(flag, "1");
                if let Some(inc) = d.include_paths.first() {
                    store.set(format!("SDK_{var}_INCS"), inc.display().to_string());
                }
                if let Some(lib) = d.library_paths.first() {
                    store.set(format!("SDK_{var}_LIBS"), lib.display().to_string());
                }
            }
            _ => {
                store.unset(&flag);
            }
        }
    }
}

impl Probe for LibraryProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Library
    }

    fn targets(&self) -> &TargetSet {
        &self.targets
    }

    fn state(&self) -> &ProbeState {
        &self.state
    }

    fn apply_override(&mut self, o: &ProbeOverride) {
        if self.state.is_unknown() {
            self.overrides = o.clone();
        }
    }

    fn perform_check(&mut self, ctx: &mut ProbeContext<'_>) -> &ProbeState {
        if !self.state.is_unknown() {
            return &self.state;
        }
        self.state = self.evaluate(ctx);
        self.publish(ctx.store);
        &self.state
    }
}
