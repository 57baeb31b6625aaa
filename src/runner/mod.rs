//! Run orchestration.
//!
//! [`ConfigureRun`] drives one configure pass over the catalog: it seeds the
//! store from [`RunOptions`](crate::config::RunOptions), checks the OS base
//! tools, the tool probes and the library probes in their declared order,
//! applies the transform rules and hands back a [`RunOutcome`]. The outcome
//! owns the final store and probe states, writes the generated files and
//! produces the [`RunSummary`].
//!
//! Probes run strictly one after another. In fail-fast mode the first
//! failure stops the pass; with continue-on-error every probe runs and the
//! failures are aggregated.

pub mod diagnostics;
mod run;
mod summary;

pub use diagnostics::Diagnostics;
pub use run::{ConfigureRun, OsToolCheck, RunOutcome};
pub use summary::{LibraryRow, RunSummary, ToolRow};
