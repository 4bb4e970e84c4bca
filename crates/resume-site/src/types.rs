//! Core data types shared by the experience and visual regression checks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One entry of the job-list document embedded in the resume page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub company: String,
    #[serde(rename = "date", alias = "dateRange", alias = "date_range")]
    pub date_range: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl JobRecord {
    pub fn new(company: &str, date_range: &str, achievements: &[&str]) -> Self {
        Self {
            company: company.to_string(),
            date_range: date_range.to_string(),
            achievements: achievements.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Resolved calendar years of a job's date range (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl DateRange {
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}

/// Target browser viewport a screenshot is taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 1024,
        }
    }
}

/// A rectangle region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Process exit statuses for each terminal failure kind.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const MISSING_BASELINE: i32 = 2;
    pub const DIMENSION_MISMATCH: i32 = 3;
    pub const THRESHOLD_EXCEEDED: i32 = 4;
    pub const CAPTURE_FAILURE: i32 = 5;
    pub const BUDGET_EXCEEDED: i32 = 6;
    pub const ACCESSIBILITY_VIOLATIONS: i32 = 7;
}

/// Errors that can occur in the resume site checks.
#[derive(thiserror::Error, Debug)]
pub enum SiteError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date range {raw:?}: {reason}")]
    InvalidDate { raw: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error(
        "No baseline image at {}. Run again with --bootstrap (or VISUAL_BOOTSTRAP_BASELINE=1) \
         to create it from the current capture, then review and commit it.",
        .path.display()
    )]
    MissingBaseline { path: PathBuf },

    #[error(
        "Dimensions changed: baseline {}x{}, current {}x{}. The page layout changed structurally; \
         review it and replace the baseline.",
        .baseline.0, .baseline.1, .current.0, .current.1
    )]
    DimensionMismatch {
        baseline: (u32, u32),
        current: (u32, u32),
    },

    #[error(
        "Visual differences detected ({percentage:.2}% different, limit {threshold:.2}%). \
         Diff image: {}. Current capture: {}.{}",
        .diff_path.display(),
        .current_path.display(),
        ci_remediation(.ci)
    )]
    ThresholdExceeded {
        percentage: f64,
        threshold: f64,
        diff_path: PathBuf,
        current_path: PathBuf,
        ci: bool,
    },

    #[error("Performance budget exceeded: {}", .0.join("; "))]
    BudgetExceeded(Vec<String>),

    #[error("Found {0} accessibility violations")]
    AccessibilityViolations(usize),
}

fn ci_remediation(ci: &bool) -> &'static str {
    if *ci {
        " Failing in CI: reproduce locally, inspect the diff and commit an updated baseline only if the change is intended."
    } else {
        ""
    }
}

impl SiteError {
    /// Exit status a driver should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        use exit_codes::*;
        match self {
            SiteError::MissingBaseline { .. } => MISSING_BASELINE,
            SiteError::DimensionMismatch { .. } => DIMENSION_MISMATCH,
            SiteError::ThresholdExceeded { .. } => THRESHOLD_EXCEEDED,
            SiteError::Capture(_) => CAPTURE_FAILURE,
            SiteError::BudgetExceeded(_) => BUDGET_EXCEEDED,
            SiteError::AccessibilityViolations(_) => ACCESSIBILITY_VIOLATIONS,
            SiteError::Image(_)
            | SiteError::Io(_)
            | SiteError::Json(_)
            | SiteError::InvalidDate { .. }
            | SiteError::InvalidInput(_) => GENERIC_FAILURE,
        }
    }
}

/// Convenience result type.
pub type SiteResult<T> = Result<T, SiteError>;
