//! Summaries of axe-core accessibility scan results.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::types::{SiteError, SiteResult};

/// Severity levels reported by axe, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minor" => Ok(Impact::Minor),
            "moderate" => Ok(Impact::Moderate),
            "serious" => Ok(Impact::Serious),
            "critical" => Ok(Impact::Critical),
            other => Err(format!(
                "unknown impact {other:?} (expected minor, moderate, serious or critical)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationNode {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub id: String,
    pub help: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: Option<Impact>,
    #[serde(default)]
    pub nodes: Vec<ViolationNode>,
}

/// The part of an axe result document this tool looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxeResults {
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl AxeResults {
    /// Violations at or above `min_impact`. Violations without an impact are always kept.
    pub fn filtered(&self, min_impact: Option<Impact>) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| match (min_impact, v.impact) {
                (Some(min), Some(impact)) => impact >= min,
                _ => true,
            })
            .collect()
    }
}

pub fn load_results(json: &str) -> SiteResult<AxeResults> {
    Ok(serde_json::from_str(json)?)
}

/// Markdown report listing each violation and the elements it affects.
pub fn render_summary(violations: &[&Violation]) -> String {
    let mut out = String::from("# Accessibility Test Results\n\n");
    if violations.is_empty() {
        out.push_str("✅ No accessibility violations found!\n");
        return out;
    }

    let _ = writeln!(out, "Found {} accessibility violations:\n", violations.len());
    for v in violations {
        let _ = writeln!(out, "## {}", v.help);
        match v.impact {
            Some(impact) => {
                let _ = writeln!(out, "Impact: {impact}");
            }
            None => {
                let _ = writeln!(out, "Impact: unknown");
            }
        }
        let _ = writeln!(out, "Description: {}", v.description);
        out.push_str("Elements affected:\n");
        for node in &v.nodes {
            let _ = writeln!(out, "- `{}`", node.html);
        }
        out.push('\n');
    }
    out
}

/// Fail when any violation at or above `min_impact` remains.
pub fn check(results: &AxeResults, min_impact: Option<Impact>) -> SiteResult<()> {
    let violations = results.filtered(min_impact);
    if violations.is_empty() {
        return Ok(());
    }
    for v in &violations {
        tracing::error!(id = %v.id, nodes = v.nodes.len(), "{} - {}", v.help, v.description);
    }
    Err(SiteError::AccessibilityViolations(violations.len()))
}
