//! Command-line interface for confprobe.
//!
//! - [`args`] - Argument definitions and translation into [`RunOptions`](crate::config::RunOptions)
//! - [`run`] - The configure command

pub mod args;
pub mod run;

pub use args::{command, probe_names, Cli};
pub use run::execute;
