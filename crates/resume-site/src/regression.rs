//! One visual regression run: persist the capture, resolve the baseline,
//! compare, and decide pass or fail.
//!
//! ```text
//! CAPTURING -> BASELINE_MISSING            (bootstrap, or MissingBaseline)
//!           -> DIMENSION_MISMATCH          (always fatal)
//!           -> COMPARING -> PASS | FAIL    (ThresholdExceeded)
//! ```

use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::capture::{capture_from_file, check_viewport, persist_capture};
use crate::diff::{compute_diff, DiffOptions};
use crate::types::{exit_codes, Rect, SiteError, SiteResult, Viewport};

/// Recognised options for a visual regression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualConfig {
    /// Per-channel colour sensitivity in `[0, 1]`.
    pub channel_threshold: f64,
    /// Largest diff percentage (0-100) that still passes.
    pub diff_percent_threshold: f64,
    /// Limit applied instead of `diff_percent_threshold` when `ci` is set.
    pub ci_diff_percent_threshold: Option<f64>,
    /// Create the baseline from the capture when it is missing.
    pub bootstrap_baseline: bool,
    /// Permit bootstrapping while `ci` is set.
    pub allow_ci_bootstrap: bool,
    pub viewport: Viewport,
    /// The capture covers the whole page rather than only the viewport.
    pub full_page: bool,
    pub include_aa: bool,
    /// Opacity of the baseline under the highlighted diff.
    pub alpha: f64,
    pub diff_color_alt: Option<[u8; 3]>,
    pub ci: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            channel_threshold: 0.1,
            diff_percent_threshold: 1.0,
            ci_diff_percent_threshold: Some(0.1),
            bootstrap_baseline: false,
            allow_ci_bootstrap: false,
            viewport: Viewport::default(),
            full_page: true,
            include_aa: true,
            alpha: 0.5,
            diff_color_alt: None,
            ci: false,
        }
    }
}

impl VisualConfig {
    /// Pass/fail cutoff for this run, in percent.
    pub fn effective_threshold(&self) -> f64 {
        match (self.ci, self.ci_diff_percent_threshold) {
            (true, Some(ci)) => ci,
            _ => self.diff_percent_threshold,
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            threshold: self.channel_threshold,
            include_aa: self.include_aa,
            alpha: self.alpha,
            diff_color_alt: self.diff_color_alt,
            ..DiffOptions::default()
        }
    }

    pub fn validate(&self) -> SiteResult<()> {
        self.diff_options().validate()?;
        let limits = [Some(self.diff_percent_threshold), self.ci_diff_percent_threshold];
        for limit in limits.into_iter().flatten() {
            if !(0.0..=100.0).contains(&limit) {
                return Err(SiteError::InvalidInput(format!(
                    "diff percent threshold must be within 0..=100, got {limit}"
                )));
            }
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(SiteError::InvalidInput("viewport must not be empty".into()));
        }
        Ok(())
    }
}

/// Where the run's artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionPaths {
    pub baseline: PathBuf,
    pub current: PathBuf,
    pub diff: PathBuf,
}

impl RegressionPaths {
    /// `<dir>/baseline.png`, `<dir>/results/current.png`, `<dir>/results/diff.png`.
    pub fn in_dir(dir: &Path) -> Self {
        let results = dir.join("results");
        Self {
            baseline: dir.join("baseline.png"),
            current: results.join("current.png"),
            diff: results.join("diff.png"),
        }
    }
}

/// Summary of a comparison that stayed within the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub width: u32,
    pub height: u32,
    pub diff_pixels: u64,
    pub diff_percentage: f64,
    pub threshold: f64,
    pub changed_regions: Vec<Rect>,
    pub diff_path: PathBuf,
}

/// Successful terminal states of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    Passed(ComparisonReport),
    BaselineCreated { path: PathBuf },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        exit_codes::SUCCESS
    }
}

/// Drives a single comparison run.
pub struct VisualRegression {
    config: VisualConfig,
    paths: RegressionPaths,
}

impl VisualRegression {
    pub fn new(config: VisualConfig, paths: RegressionPaths) -> Self {
        Self { config, paths }
    }

    /// Run against a screenshot file written by the browser driver.
    pub fn run_from_file(&self, screenshot: &Path) -> SiteResult<RunOutcome> {
        // A failed capture must not leave the previous run's artifacts behind.
        remove_if_exists(&self.paths.current)?;
        remove_if_exists(&self.paths.diff)?;
        let current = capture_from_file(screenshot)?;
        self.run(current)
    }

    /// Run against an already decoded capture.
    pub fn run(&self, current: RgbaImage) -> SiteResult<RunOutcome> {
        self.config.validate()?;
        remove_if_exists(&self.paths.diff)?;

        // CAPTURING
        if let Some(warning) = check_viewport(&current, &self.config.viewport, self.config.full_page) {
            tracing::warn!("{warning}");
        }
        persist_capture(&current, &self.paths.current)?;
        tracing::info!("Screenshot saved to: {}", self.paths.current.display());

        if !self.paths.baseline.exists() {
            return self.handle_missing_baseline();
        }

        let baseline = image::open(&self.paths.baseline)?.to_rgba8();

        if baseline.dimensions() != current.dimensions() {
            tracing::error!(
                "Dimensions changed: baseline {:?}, current {:?}",
                baseline.dimensions(),
                current.dimensions()
            );
            return Err(SiteError::DimensionMismatch {
                baseline: baseline.dimensions(),
                current: current.dimensions(),
            });
        }

        // COMPARING
        let diff = compute_diff(&baseline, &current, &self.config.diff_options())?;
        persist_capture(&diff.diff_image, &self.paths.diff)?;

        let percentage = diff.percentage();
        let threshold = self.config.effective_threshold();

        if percentage > threshold {
            tracing::error!(
                regions = diff.changed_regions.len(),
                "Visual differences detected ({percentage:.2}% different)"
            );
            return Err(SiteError::ThresholdExceeded {
                percentage,
                threshold,
                diff_path: self.paths.diff.clone(),
                current_path: self.paths.current.clone(),
                ci: self.config.ci,
            });
        }

        tracing::info!("Visual comparison passed! {percentage:.2}% difference");
        let (width, height) = baseline.dimensions();
        Ok(RunOutcome::Passed(ComparisonReport {
            width,
            height,
            diff_pixels: diff.diff_pixels,
            diff_percentage: percentage,
            threshold,
            changed_regions: diff.changed_regions,
            diff_path: self.paths.diff.clone(),
        }))
    }

    fn handle_missing_baseline(&self) -> SiteResult<RunOutcome> {
        let bootstrap = self.config.bootstrap_baseline && (!self.config.ci || self.config.allow_ci_bootstrap);
        if !bootstrap {
            if self.config.bootstrap_baseline {
                tracing::warn!("Refusing to create a baseline in CI; set allowCiBootstrap to override");
            }
            return Err(SiteError::MissingBaseline {
                path: self.paths.baseline.clone(),
            });
        }

        if let Some(parent) = self.paths.baseline.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&self.paths.current, &self.paths.baseline)?;
        tracing::info!("Baseline created at: {}", self.paths.baseline.display());
        Ok(RunOutcome::BaselineCreated {
            path: self.paths.baseline.clone(),
        })
    }
}

/// Artifacts from an earlier run must not pass for this run's result.
fn remove_if_exists(path: &Path) -> SiteResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
