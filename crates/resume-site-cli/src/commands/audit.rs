//! Commands: perf, a11y — gate on reports written by the browser driver.

use std::path::Path;

use resume_site::accessibility::{self, Impact};
use resume_site::performance::{self, PerformanceBudget};
use resume_site::SiteResult;

/// Evaluate performance metrics. The summary is written before the budget is checked.
pub fn perf(
    metrics_path: &Path,
    budget_path: Option<&Path>,
    summary_path: Option<&Path>,
) -> SiteResult<String> {
    let metrics = performance::load_metrics(&std::fs::read_to_string(metrics_path)?)?;
    let budget: PerformanceBudget = match budget_path {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => PerformanceBudget::default(),
    };

    let summary = performance::render_summary(&metrics);
    write_summary(summary_path, &summary)?;

    tracing::info!(
        load_time = metrics.load_time,
        dom_content_loaded = metrics.dom_content_loaded,
        dom_size = metrics.dom_size,
        "Performance metrics loaded"
    );
    performance::check(&metrics, &budget)?;
    Ok("All performance metrics within acceptable ranges!".to_string())
}

/// Evaluate an axe result document.
pub fn a11y(
    results_path: &Path,
    min_impact: Option<Impact>,
    summary_path: Option<&Path>,
) -> SiteResult<String> {
    let results = accessibility::load_results(&std::fs::read_to_string(results_path)?)?;

    let summary = accessibility::render_summary(&results.filtered(min_impact));
    write_summary(summary_path, &summary)?;

    accessibility::check(&results, min_impact)?;
    Ok("No accessibility violations found!".to_string())
}

fn write_summary(path: Option<&Path>, summary: &str) -> SiteResult<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, summary)?;
    tracing::info!("Summary written to {}", path.display());
    Ok(())
}
