//! resume-site — checks behind the resume website: skill experience years and visual regression.

pub mod accessibility;
pub mod capture;
pub mod diff;
pub mod experience;
pub mod performance;
pub mod regression;
pub mod types;

pub use capture::{capture_from_base64, capture_from_file, persist_capture};
pub use diff::{compute_diff, DiffOptions, PixelDiff};
pub use experience::{
    annotate_skill_labels, calculate_years_of_experience, calculate_years_of_experience_now,
    clean_skill_label, format_years,
};
pub use regression::{RegressionPaths, RunOutcome, VisualConfig, VisualRegression};
pub use types::*;
