//! A scripted harness for exercising probes without a compiler.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{CompileRequest, TestHarness, Toolchain};
use crate::error::{ProbeError, Stage};

/// What the mock should answer for a probe.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// The test binary printed this text.
    Prints(String),
    /// The compiler rejected the program.
    CompileFails,
    /// The compiler exceeded its bound.
    CompileTimesOut,
}

/// Harness that records every request and answers from a script.
///
/// Probes without a scripted outcome "print" the found marker.
#[derive(Debug, Default)]
pub struct MockHarness {
    outcomes: HashMap<String, MockOutcome>,
    calls: RefCell<Vec<String>>,
}

impl MockHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, probe: &str, outcome: MockOutcome) -> Self {
        self.outcomes.insert(probe.to_string(), outcome);
        self
    }

    /// Names of the probes that reached the compiler, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn was_called_for(&self, probe: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == probe)
    }
}

impl TestHarness for MockHarness {
    fn compile_and_run(
        &self,
        toolchain: &Toolchain,
        req: &CompileRequest<'_>,
    ) -> Result<String, ProbeError> {
        self.calls.borrow_mut().push(req.name.to_string());
        match self.outcomes.get(req.name) {
            Some(MockOutcome::Prints(text)) => Ok(text.clone()),
            Some(MockOutcome::CompileFails) => Err(ProbeError::CompileFailure {
                probe: req.name.to_string(),
                command: toolchain.c_compiler.clone(),
                stdout: String::new(),
                stderr: "error: mock compile failure".to_string(),
            }),
            Some(MockOutcome::CompileTimesOut) => Err(ProbeError::Timeout {
                probe: req.name.to_string(),
                stage: Stage::Compile,
                seconds: 15,
            }),
            None => Ok(super::FOUND_MARKER.to_string()),
        }
    }
}
