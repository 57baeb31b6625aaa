//! Run configuration.
//!
//! [`RunOptions`] is the plain record the command line is translated into.
//! Per-probe switches live in an explicit map of [`ProbeOverride`] records
//! keyed by probe name.

pub mod options;

pub use options::{FeatureFlags, OutputFiles, PathList, ProbeOverride, RunOptions, SearchPaths};
