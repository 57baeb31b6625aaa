//! confprobe - pre-build dependency probing and build configuration synthesis.
//!
//! confprobe checks a host for the libraries and tools a build needs, for a
//! chosen target operating system and architecture, and writes the results
//! as a build-variable file plus an environment script.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument translation
//! - [`config`] - The run configuration record and per-probe overrides
//! - [`error`] - Error types and result aliases
//! - [`harness`] - Compile-and-execute validation of library candidates
//! - [`output`] - Generated build files
//! - [`paths`] - Header and library search path resolution
//! - [`probe`] - Library and tool probes, the built-in catalog
//! - [`runner`] - Run orchestration, diagnostics and summary
//! - [`store`] - The ordered configuration store
//! - [`target`] - Target operating systems and architectures
//! - [`transform`] - Ordered derivation rules over the store
//! - [`ui`] - Summary tables and status styling
//!
//! # Example
//!
//! ```
//! use confprobe::transform::TransformEngine;
//! use confprobe::store::ConfigStore;
//!
//! let mut store = ConfigStore::new();
//! store.set("config_libs_disable_libvpx", "1");
//! store.set("VBOX_WITH_RECORDING", "1");
//!
//! TransformEngine::standard().apply(&mut store);
//! assert!(!store.is_set("VBOX_WITH_RECORDING"));
//! ```
//!
//! For full runs against a fake host, see the integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod output;
pub mod paths;
pub mod probe;
pub mod runner;
pub mod store;
pub mod target;
pub mod transform;
pub mod ui;

pub use error::{ConfigureError, ProbeError, Result};
