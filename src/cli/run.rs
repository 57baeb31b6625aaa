//! The configure command: run the probes, report, write the files.

use tracing::info;

use crate::config::RunOptions;
use crate::error::Result;
use crate::harness::CompileHarness;
use crate::runner::ConfigureRun;
use crate::ui::ProbeTheme;

/// Run a full configure pass and return the process exit status.
pub fn execute(options: RunOptions, theme: &ProbeTheme) -> Result<u8> {
    let harness = CompileHarness::new(options.debug);
    let outcome = ConfigureRun::new(options).check(&harness);

    let summary = outcome.summary();
    println!();
    print!("{}", summary.render(theme));

    let written = outcome.write_outputs()?;
    if let Some(path) = outcome.write_summary_json()? {
        info!("Wrote run summary to {}", path.display());
    }

    println!();
    for line in outcome.advisories(written) {
        println!("{}", style_advisory(theme, &line));
    }
    Ok(outcome.exit_code())
}

fn style_advisory(theme: &ProbeTheme, line: &str) -> String {
    if line.starts_with("Configuration failed") {
        theme.format_error(line)
    } else if line.starts_with("Configuration completed") || line.starts_with("Hardening") {
        theme.format_warning(line)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_leaves_advisories_untouched() {
        let theme = ProbeTheme::plain();
        assert_eq!(
            style_advisory(&theme, "Configuration failed with 1 error(s)."),
            "Configuration failed with 1 error(s)."
        );
        assert_eq!(style_advisory(&theme, "  kmk"), "  kmk");
    }
}
