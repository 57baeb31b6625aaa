//! Visual theme and styling.

use console::Style;

/// Styles for summary tables and closing messages.
#[derive(Debug, Clone)]
pub struct ProbeTheme {
    /// Present probes (green).
    pub success: Style,
    /// Advisories (orange).
    pub warning: Style,
    /// Failed probes and counted errors (red bold).
    pub error: Style,
    /// Disabled and skipped probes (dim).
    pub dim: Style,
    /// Section headers (bold).
    pub header: Style,
}

impl Default for ProbeTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            header: Style::new().bold(),
        }
    }

    /// A theme without colors (for non-TTY or `NO_COLOR`).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            header: Style::new(),
        }
    }

    /// Style a summary status word.
    pub fn status(&self, word: &str) -> String {
        let style = match word {
            "ok" => &self.success,
            "failed" => &self.error,
            "DISABLED" | "skipped" => &self.dim,
            _ => return word.to_string(),
        };
        style.apply_to(word).to_string()
    }

    pub fn format_header(&self, title: &str) -> String {
        self.header.apply_to(title).to_string()
    }

    pub fn format_warning(&self, msg: &str) -> String {
        self.warning.apply_to(msg).to_string()
    }

    pub fn format_error(&self, msg: &str) -> String {
        self.error.apply_to(msg).to_string()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_status_is_unchanged() {
        let theme = ProbeTheme::plain();
        assert_eq!(theme.status("ok"), "ok");
        assert_eq!(theme.status("failed"), "failed");
        assert_eq!(theme.status("?"), "?");
    }

    #[test]
    fn colored_status_keeps_the_word() {
        let theme = ProbeTheme::new();
        assert!(theme.status("DISABLED").contains("DISABLED"));
        assert!(theme.format_error("2 error(s)").contains("2 error(s)"));
    }

    #[test]
    fn default_impl_matches_new() {
        assert_eq!(
            ProbeTheme::default().format_warning("x"),
            ProbeTheme::new().format_warning("x")
        );
    }
}
