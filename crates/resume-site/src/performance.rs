//! Performance budget checks over metrics collected by the page-load driver.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::types::{SiteError, SiteResult};

/// Metrics as written by the browser driver (`performance.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub load_time: u64,
    pub dom_content_loaded: u64,
    pub scripts: u32,
    pub styles: u32,
    pub images: u32,
    pub dom_size: u32,
    #[serde(default)]
    pub deferred_scripts: u32,
    pub has_viewport: bool,
    pub has_description: bool,
    #[serde(default)]
    pub has_canonical_link: bool,
}

/// Limits the metrics are held to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceBudget {
    pub max_load_time_ms: u64,
    pub max_dom_content_loaded_ms: u64,
    pub max_dom_size: u32,
    pub require_viewport: bool,
    pub require_description: bool,
}

impl Default for PerformanceBudget {
    fn default() -> Self {
        Self {
            max_load_time_ms: 3000,
            max_dom_content_loaded_ms: 1000,
            max_dom_size: 1500,
            require_viewport: true,
            require_description: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetViolation {
    LoadTime { actual: u64, limit: u64 },
    DomContentLoaded { actual: u64, limit: u64 },
    DomSize { actual: u32, limit: u32 },
    MissingViewport,
    MissingDescription,
}

impl std::fmt::Display for BudgetViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetViolation::LoadTime { actual, limit } => {
                write!(f, "Page load time {actual}ms exceeds {limit}ms")
            }
            BudgetViolation::DomContentLoaded { actual, limit } => {
                write!(f, "DOM content load {actual}ms exceeds {limit}ms")
            }
            BudgetViolation::DomSize { actual, limit } => {
                write!(f, "DOM size {actual} exceeds {limit} elements")
            }
            BudgetViolation::MissingViewport => write!(f, "Missing viewport meta tag"),
            BudgetViolation::MissingDescription => write!(f, "Missing meta description"),
        }
    }
}

pub fn load_metrics(json: &str) -> SiteResult<PerformanceMetrics> {
    Ok(serde_json::from_str(json)?)
}

/// Every budget the metrics break, in a stable order.
pub fn evaluate(metrics: &PerformanceMetrics, budget: &PerformanceBudget) -> Vec<BudgetViolation> {
    let mut violations = Vec::new();
    if metrics.load_time > budget.max_load_time_ms {
        violations.push(BudgetViolation::LoadTime {
            actual: metrics.load_time,
            limit: budget.max_load_time_ms,
        });
    }
    if metrics.dom_content_loaded > budget.max_dom_content_loaded_ms {
        violations.push(BudgetViolation::DomContentLoaded {
            actual: metrics.dom_content_loaded,
            limit: budget.max_dom_content_loaded_ms,
        });
    }
    if metrics.dom_size > budget.max_dom_size {
        violations.push(BudgetViolation::DomSize {
            actual: metrics.dom_size,
            limit: budget.max_dom_size,
        });
    }
    if budget.require_viewport && !metrics.has_viewport {
        violations.push(BudgetViolation::MissingViewport);
    }
    if budget.require_description && !metrics.has_description {
        violations.push(BudgetViolation::MissingDescription);
    }
    violations
}

/// Evaluate and turn any violation into an error.
pub fn check(metrics: &PerformanceMetrics, budget: &PerformanceBudget) -> SiteResult<()> {
    let violations = evaluate(metrics, budget);
    if violations.is_empty() {
        return Ok(());
    }
    for v in &violations {
        tracing::error!("{v}");
    }
    Err(SiteError::BudgetExceeded(
        violations.iter().map(ToString::to_string).collect(),
    ))
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

/// Markdown summary of the collected metrics.
pub fn render_summary(metrics: &PerformanceMetrics) -> String {
    let mut out = String::from("# Performance Test Results\n\n");
    let _ = writeln!(out, "## Load Times");
    let _ = writeln!(out, "- Page Load: {}ms", metrics.load_time);
    let _ = writeln!(out, "- DOM Content Loaded: {}ms\n", metrics.dom_content_loaded);

    let _ = writeln!(out, "## Resource Counts");
    let _ = writeln!(out, "- Scripts: {}", metrics.scripts);
    let _ = writeln!(out, "- Stylesheets: {}", metrics.styles);
    let _ = writeln!(out, "- Images: {}", metrics.images);
    let _ = writeln!(out, "- Total DOM Elements: {}\n", metrics.dom_size);

    let _ = writeln!(out, "## Best Practices");
    let _ = writeln!(
        out,
        "- Deferred/Async Scripts: {}/{}",
        metrics.deferred_scripts, metrics.scripts
    );
    let _ = writeln!(out, "- Viewport Meta Tag: {}", mark(metrics.has_viewport));
    let _ = writeln!(out, "- Meta Description: {}", mark(metrics.has_description));
    let _ = writeln!(out, "- Canonical Link: {}", mark(metrics.has_canonical_link));
    out
}
