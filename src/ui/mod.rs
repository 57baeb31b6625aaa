//! Terminal presentation for the end-of-run summary.
//!
//! - [`Table`] for aligned probe tables
//! - [`ProbeTheme`] for status coloring

pub mod table;
pub mod theme;

pub use table::Table;
pub use theme::{should_use_colors, ProbeTheme};
