//! Tool probes.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::which::CommandLookup;
use super::{Detection, Probe, ProbeContext, ProbeKind, ProbeState};
use crate::config::ProbeOverride;
use crate::error::ProbeError;
use crate::target::TargetSet;

/// What a tool probe asks a detector to find.
#[derive(Debug, Clone, Copy)]
pub struct DetectRequest<'a> {
    pub name: &'a str,
    pub commands: &'a [String],
    pub custom_path: Option<&'a Path>,
}

/// What a detector found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolDetection {
    pub command_path: Option<PathBuf>,
    pub version: Option<String>,
}

/// Custom detection for tools that do not follow the command conventions.
pub trait ToolDetector {
    fn detect(
        &self,
        req: &DetectRequest<'_>,
        ctx: &mut ProbeContext<'_>,
    ) -> Result<ToolDetection, ProbeError>;
}

/// Detects a tool by its commands or a custom [`ToolDetector`].
///
/// Without a detector, every listed command must resolve for the tool to be
/// present; the commands are parts of one tool, not alternative names for
/// it. A tool known under several names needs a [`ToolDetector`] that tries
/// each of them.
pub struct ToolProbe {
    name: String,
    commands: Vec<String>,
    detector: Option<Box<dyn ToolDetector>>,
    targets: TargetSet,
    overrides: ProbeOverride,
    state: ProbeState,
}

impl fmt::Debug for ToolProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolProbe")
            .field("name", &self.name)
            .field("commands", &self.commands)
            .field("custom_detector", &self.detector.is_some())
            .field("targets", &self.targets)
            .field("state", &self.state)
            .finish()
    }
}

impl ToolProbe {
    pub fn new(name: &str, commands: &[&str], targets: TargetSet) -> Self {
        Self {
            name: name.to_string(),
            commands: commands.iter().map(|c| c.to_string()).collect(),
            detector: None,
            targets,
            overrides: ProbeOverride::default(),
            state: ProbeState::Unknown,
        }
    }

    pub fn with_detector(mut self, detector: impl ToolDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Every command must resolve. The first one names the tool.
    fn locate_commands(
        &self,
        ctx: &ProbeContext<'_>,
        custom: Option<&Path>,
    ) -> Result<ToolDetection, ProbeError> {
        let lookup = CommandLookup::new(&self.name, ctx.store.get("PATH"), ctx.host().os.exe_suffix())
            .in_dir(custom);
        let mut detection = ToolDetection::default();
        for cmd in &self.commands {
            let found = lookup.locate(cmd)?;
            if detection.command_path.is_none() {
                detection.command_path = Some(found.path);
                detection.version = Some(found.version);
            }
        }
        Ok(detection)
    }

    fn evaluate(&self, ctx: &mut ProbeContext<'_>) -> ProbeState {
        let os = ctx.target().os;
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

        info!("{}: checking ...", self.name);
        let custom = self.overrides.custom_path.as_deref();
        let result = match &self.detector {
            Some(detector) => {
                let req = DetectRequest {
                    name: &self.name,
                    commands: &self.commands,
                    custom_path: custom,
                };
                detector.detect(&req, ctx)
            }
            None => self.locate_commands(ctx, custom),
        };

        match result {
            Ok(found) => ProbeState::Present(Detection {
                version: found.version,
                command_path: found.command_path,
                ..Default::default()
            }),
            Err(e) => ProbeState::Absent(e),
        }
    }
}

impl Probe for ToolProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProbeKind {
        ProbeKind::Tool
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
        if self.state.is_unknown() {
            self.state = self.evaluate(ctx);
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::harness::MockHarness;
    use crate::paths::PathResolver;
    use crate::runner::Diagnostics;
    use crate::store::ConfigStore;
    use crate::target::{Target, TargetArch, TargetOs};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct CountingDetector {
        calls: Rc<Cell<u32>>,
        result: Result<ToolDetection, ProbeError>,
    }

    impl ToolDetector for CountingDetector {
        fn detect(
            &self,
            _req: &DetectRequest<'_>,
            ctx: &mut ProbeContext<'_>,
        ) -> Result<ToolDetection, ProbeError> {
            self.calls.set(self.calls.get() + 1);
            ctx.store.set("DETECTOR_RAN", "1");
            self.result.clone()
        }
    }

    fn run(probe: &mut ToolProbe, os: TargetOs, store: &mut ConfigStore) -> ProbeState {
        let source = TempDir::new().unwrap();
        let target = Target::new(os, TargetArch::Amd64);
        let resolver = PathResolver::new(target, source.path());
        let options = RunOptions::new(target);
        let harness = MockHarness::new();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = ProbeContext {
            store,
            resolver: &resolver,
            harness: &harness,
            options: &options,
            diagnostics: &mut diagnostics,
        };
        probe.perform_check(&mut ctx).clone()
    }

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn detector_result_becomes_present() {
        let calls = counter();
        let mut probe = ToolProbe::new("xcode", &[], TargetSet::Any).with_detector(CountingDetector {
            calls: Rc::clone(&calls),
            result: Ok(ToolDetection {
                command_path: Some(PathBuf::from("/Library/Developer/CommandLineTools/usr/bin/xcodebuild")),
                version: None,
            }),
        });
        let mut store = ConfigStore::new();

        let state = run(&mut probe, TargetOs::Darwin, &mut store);

        assert_eq!(state.status(), "ok (xcodebuild)");
        assert_eq!(store.get("DETECTOR_RAN"), Some("1"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn detector_failure_becomes_absent() {
        let calls = counter();
        let mut probe = ToolProbe::new("xcode", &[], TargetSet::Any).with_detector(CountingDetector {
            calls: Rc::clone(&calls),
            result: Err(ProbeError::detection("xcode", "CommandLineTools not found")),
        });
        let mut store = ConfigStore::new();

        let state = run(&mut probe, TargetOs::Darwin, &mut store);

        assert!(state.is_absent());
        assert_eq!(probe.status(), "failed");
    }

    #[test]
    fn target_gating_applies_to_detectors() {
        let calls = counter();
        let mut probe = ToolProbe::new("xcode", &[], TargetSet::only(&[TargetOs::Darwin]))
            .with_detector(CountingDetector {
                calls: Rc::clone(&calls),
                result: Ok(ToolDetection::default()),
            });
        let mut store = ConfigStore::new();

        let state = run(&mut probe, TargetOs::Linux, &mut store);

        assert_eq!(state, ProbeState::SkippedByTarget);
        assert_eq!(calls.get(), 0);
        assert!(!store.is_set("DETECTOR_RAN"));
    }

    #[test]
    fn disabled_tool_is_not_checked() {
        let calls = counter();
        let mut probe = ToolProbe::new("gsoap", &[], TargetSet::Any).with_detector(CountingDetector {
            calls: Rc::clone(&calls),
            result: Ok(ToolDetection::default()),
        });
        probe.apply_override(&ProbeOverride {
            disabled: true,
            ..Default::default()
        });
        let mut store = ConfigStore::new();

        assert_eq!(run(&mut probe, TargetOs::Linux, &mut store), ProbeState::Disabled);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn missing_command_is_absent() {
        let empty = TempDir::new().unwrap();
        let mut store = ConfigStore::new();
        store.set("PATH", empty.path().display().to_string());
        let mut probe = ToolProbe::new("yasm", &["yasm"], TargetSet::Any);

        let state = run(&mut probe, TargetOs::Linux, &mut store);

        assert!(matches!(state.error(), Some(ProbeError::ToolNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn all_commands_must_resolve() {
        use std::os::unix::fs::PermissionsExt;

        let bin = TempDir::new().unwrap();
        let wcl = bin.path().join("wcl");
        std::fs::write(&wcl, "#!/bin/sh\necho 'Open Watcom 2.0'\n").unwrap();
        std::fs::set_permissions(&wcl, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut store = ConfigStore::new();
        store.set("PATH", bin.path().display().to_string());
        let mut probe = ToolProbe::new("watcom", &["wcl", "wlink"], TargetSet::Any);

        let state = run(&mut probe, TargetOs::Linux, &mut store);

        match state.error() {
            Some(ProbeError::ToolNotFound { command, .. }) => assert_eq!(command, "wlink"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
