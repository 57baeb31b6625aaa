//! End-of-run summary.

use std::path::PathBuf;

use serde::Serialize;

use super::{OsToolCheck, RunOutcome};
use crate::probe::{Probe, ProbeState};
use crate::ui::{ProbeTheme, Table};

/// Placeholder for empty cells.
const NONE: &str = "-";

/// One row of the tools table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRow {
    pub name: String,
    pub status: String,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// One library, possibly spanning several table rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryRow {
    pub name: String,
    pub status: String,
    pub version: Option<String>,
    pub include_paths: Vec<PathBuf>,
    pub library_paths: Vec<PathBuf>,
    pub vendored: bool,
}

/// Everything reported after a run, also written as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub host: String,
    pub target: String,
    pub build_type: String,
    pub success: bool,
    pub os_tools: Vec<OsToolCheck>,
    pub tools: Vec<ToolRow>,
    pub libraries: Vec<LibraryRow>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Table status: the first word of the probe status.
fn short_status(state: &ProbeState) -> String {
    state
        .status()
        .split_whitespace()
        .next()
        .unwrap_or(NONE)
        .to_string()
}

impl RunSummary {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let options = outcome.options();
        let tools = outcome
            .tools()
            .iter()
            .map(|tool| {
                let detection = tool.state().detection();
                ToolRow {
                    name: tool.name().to_string(),
                    status: short_status(tool.state()),
                    version: detection.and_then(|d| d.version.clone()),
                    path: detection.and_then(|d| d.command_path.clone()),
                }
            })
            .collect();
        let libraries = outcome
            .libraries()
            .iter()
            .map(|lib| {
                let detection = lib.state().detection().cloned().unwrap_or_default();
                LibraryRow {
                    name: lib.name().to_string(),
                    status: short_status(lib.state()),
                    version: detection.version,
                    include_paths: detection.include_paths,
                    library_paths: detection.library_paths,
                    vendored: detection.vendored,
                }
            })
            .collect();

        Self {
            host: options.host.to_string(),
            target: options.target.to_string(),
            build_type: options.build_type.to_string(),
            success: outcome.success(),
            os_tools: outcome.os_tools().to_vec(),
            tools,
            libraries,
            errors: outcome.diagnostics().errors.clone(),
            warnings: outcome.diagnostics().warnings.clone(),
        }
    }

    pub fn tools_table(&self, theme: &ProbeTheme) -> Table {
        let mut table = Table::new(vec!["Tool", "Status", "Version", "Path"]);
        for row in &self.tools {
            table.add_row(vec![
                row.name.clone(),
                theme.status(&row.status),
                row.version.clone().unwrap_or_else(|| NONE.to_string()),
                row.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| NONE.to_string()),
            ]);
        }
        table
    }

    /// Additional include paths go on continuation rows below the library.
    pub fn libraries_table(&self, theme: &ProbeTheme) -> Table {
        let mut table = Table::new(vec!["Library", "Status", "Version", "Include Path(s)"]);
        for row in &self.libraries {
            let mut includes = row.include_paths.iter().map(|p| p.display().to_string());
            table.add_row(vec![
                row.name.clone(),
                theme.status(&row.status),
                row.version.clone().unwrap_or_else(|| NONE.to_string()),
                includes.next().unwrap_or_else(|| NONE.to_string()),
            ]);
            for extra in includes {
                table.add_row(vec![String::new(), String::new(), String::new(), extra]);
            }
        }
        table
    }

    /// Both tables, ready to print.
    pub fn render(&self, theme: &ProbeTheme) -> String {
        let mut out = String::new();
        if !self.tools.is_empty() {
            out.push_str(&self.tools_table(theme).render());
            out.push_str("\n\n");
        }
        if !self.libraries.is_empty() {
            out.push_str(&self.libraries_table(theme).render());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::probe::Detection;

    fn summary() -> RunSummary {
        RunSummary {
            host: "linux.amd64".into(),
            target: "linux.amd64".into(),
            build_type: "release".into(),
            success: false,
            os_tools: Vec::new(),
            tools: vec![ToolRow {
                name: "yasm".into(),
                status: "ok".into(),
                version: Some("yasm 1.3.0".into()),
                path: Some(PathBuf::from("/usr/bin/yasm")),
            }],
            libraries: vec![
                LibraryRow {
                    name: "qt6".into(),
                    status: "ok".into(),
                    version: Some("6.5.3".into()),
                    include_paths: vec![
                        PathBuf::from("/usr/include/qt6"),
                        PathBuf::from("/usr/include/qt6/QtCore"),
                    ],
                    library_paths: Vec::new(),
                    vendored: false,
                },
                LibraryRow {
                    name: "zlib".into(),
                    status: "failed".into(),
                    version: None,
                    include_paths: Vec::new(),
                    library_paths: Vec::new(),
                    vendored: false,
                },
            ],
            errors: vec!["zlib: library files [\"libz\"] not found in 0 search path(s)".into()],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn status_is_first_word() {
        let state = ProbeState::Present(Detection {
            command_path: Some(PathBuf::from("/usr/bin/yasm")),
            ..Default::default()
        });
        assert_eq!(short_status(&state), "ok");
        assert_eq!(
            short_status(&ProbeState::Absent(ProbeError::environment("x", "y"))),
            "failed"
        );
        assert_eq!(short_status(&ProbeState::Disabled), "DISABLED");
    }

    #[test]
    fn extra_include_paths_continue_on_new_rows() {
        let table = summary().libraries_table(&ProbeTheme::plain());
        assert_eq!(table.row_count(), 3);

        let text = table.render();
        let continuation = text
            .lines()
            .find(|l| l.contains("/usr/include/qt6/QtCore"))
            .unwrap();
        assert!(!continuation.contains("qt6 "));
        assert!(text.contains("zlib"));
    }

    #[test]
    fn tools_table_shows_version_and_path() {
        let text = summary().tools_table(&ProbeTheme::plain()).render();
        assert!(text.contains("yasm 1.3.0"));
        assert!(text.contains("/usr/bin/yasm"));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["libraries"][1]["status"], "failed");
        assert_eq!(json["tools"][0]["path"], "/usr/bin/yasm");
        assert_eq!(json["success"], false);
    }
}
