//! Command: visual — compare a fresh screenshot against the stored baseline.

use std::path::Path;

use resume_site::{
    capture_from_base64, RegressionPaths, RunOutcome, SiteResult, VisualConfig, VisualRegression,
};

/// Where the screenshot comes from.
pub enum ScreenshotInput<'a> {
    File(&'a Path),
    /// Base64 text (e.g. a CDP `Page.captureScreenshot` payload).
    Base64 { data: String, mime: &'a str },
}

/// Run one comparison and describe the outcome.
pub fn run(
    config: VisualConfig,
    dir: &Path,
    input: ScreenshotInput<'_>,
    as_json: bool,
) -> SiteResult<String> {
    let paths = RegressionPaths::in_dir(dir);
    tracing::info!(
        baseline = %paths.baseline.display(),
        ci = config.ci,
        threshold = config.effective_threshold(),
        "Starting visual comparison"
    );
    let regression = VisualRegression::new(config, paths);

    let outcome = match input {
        ScreenshotInput::File(path) => regression.run_from_file(path)?,
        ScreenshotInput::Base64 { data, mime } => regression.run(capture_from_base64(&data, mime)?)?,
    };

    if as_json {
        return Ok(serde_json::to_string_pretty(&outcome)?);
    }

    Ok(match outcome {
        RunOutcome::Passed(report) => format!(
            "Visual comparison passed! {:.2}% difference (limit {:.2}%)",
            report.diff_percentage, report.threshold
        ),
        RunOutcome::BaselineCreated { path } => {
            format!("Baseline created at: {}. Review it before committing.", path.display())
        }
    })
}
