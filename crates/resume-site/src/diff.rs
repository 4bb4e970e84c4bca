//! Anti-aliasing aware pixel diff between a baseline and a current capture.
//!
//! Colour distance is measured in YIQ space with semi-transparent pixels
//! blended onto white. A pixel whose distance exceeds the configured channel
//! threshold is a difference unless it looks like anti-aliasing in either
//! image (and anti-aliased pixels are not being counted).

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::types::{Rect, SiteError, SiteResult};

/// Largest possible squared YIQ distance between two colours.
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Minimum region size (pixels) to report as a changed region.
const MIN_REGION_SIZE: u32 = 10;

/// Tuning for [`compute_diff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffOptions {
    /// Per-pixel colour sensitivity in `[0, 1]`; smaller is stricter.
    pub threshold: f64,
    /// Count anti-aliased pixels as differences instead of ignoring them.
    pub include_aa: bool,
    /// Opacity of the baseline drawn under the diff.
    pub alpha: f64,
    pub aa_color: [u8; 3],
    pub diff_color: [u8; 3],
    /// Colour for pixels that got darker, to tell removed from added content.
    pub diff_color_alt: Option<[u8; 3]>,
    /// Draw differences over a transparent background.
    pub diff_mask: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            include_aa: true,
            alpha: 0.5,
            aa_color: [255, 255, 0],
            diff_color: [255, 0, 0],
            diff_color_alt: None,
            diff_mask: false,
        }
    }
}

impl DiffOptions {
    pub fn validate(&self) -> SiteResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SiteError::InvalidInput(format!(
                "channel threshold must be within 0..=1, got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SiteError::InvalidInput(format!(
                "diff alpha must be within 0..=1, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Result of comparing two equally sized rasters.
#[derive(Debug, Clone)]
pub struct PixelDiff {
    pub diff_pixels: u64,
    pub total_pixels: u64,
    pub diff_image: RgbaImage,
    pub changed_regions: Vec<Rect>,
}

impl PixelDiff {
    /// Share of differing pixels, in percent.
    pub fn percentage(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.diff_pixels as f64 * 100.0 / self.total_pixels as f64
    }
}

/// Compare `baseline` with `current` pixel by pixel.
///
/// Fails with [`SiteError::DimensionMismatch`] before doing any work when
/// the two images differ in size.
pub fn compute_diff(
    baseline: &RgbaImage,
    current: &RgbaImage,
    options: &DiffOptions,
) -> SiteResult<PixelDiff> {
    if baseline.dimensions() != current.dimensions() {
        return Err(SiteError::DimensionMismatch {
            baseline: baseline.dimensions(),
            current: current.dimensions(),
        });
    }
    options.validate()?;

    let (width, height) = baseline.dimensions();
    let total_pixels = u64::from(width) * u64::from(height);
    let mut output = RgbaImage::new(width, height);

    if baseline.as_raw() == current.as_raw() {
        if !options.diff_mask {
            for (x, y, px) in baseline.enumerate_pixels() {
                output.put_pixel(x, y, gray_pixel(px, options.alpha));
            }
        }
        return Ok(PixelDiff {
            diff_pixels: 0,
            total_pixels,
            diff_image: output,
            changed_regions: Vec::new(),
        });
    }

    let max_delta = MAX_YIQ_DELTA * options.threshold * options.threshold;
    let mut changed = vec![false; total_pixels as usize];
    let mut diff_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let a = baseline.get_pixel(x, y);
            let b = current.get_pixel(x, y);
            let delta = color_delta(a, b, false);

            if delta.abs() > max_delta {
                if !options.include_aa
                    && (antialiased(baseline, x, y, current) || antialiased(current, x, y, baseline))
                {
                    if !options.diff_mask {
                        output.put_pixel(x, y, opaque(options.aa_color));
                    }
                } else {
                    let color = match options.diff_color_alt {
                        Some(alt) if delta < 0.0 => alt,
                        _ => options.diff_color,
                    };
                    output.put_pixel(x, y, opaque(color));
                    changed[(y * width + x) as usize] = true;
                    diff_pixels += 1;
                }
            } else if !options.diff_mask {
                output.put_pixel(x, y, gray_pixel(a, options.alpha));
            }
        }
    }

    tracing::debug!(diff_pixels, total_pixels, "pixel comparison finished");

    Ok(PixelDiff {
        diff_pixels,
        total_pixels,
        diff_image: output,
        changed_regions: find_changed_regions(&changed, width, height),
    })
}

/// Squared YIQ distance between two pixels; negative when `b` is darker than `a`.
/// With `y_only`, returns the signed brightness difference instead.
fn color_delta(a: &Rgba<u8>, b: &Rgba<u8>, y_only: bool) -> f64 {
    if a == b {
        return 0.0;
    }

    let (r1, g1, b1) = blend_onto_white(a);
    let (r2, g2, b2) = blend_onto_white(b);

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

fn blend_onto_white(px: &Rgba<u8>) -> (f64, f64, f64) {
    let [r, g, b, a] = px.0;
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    if a == 255 {
        return (r, g, b);
    }
    let a = f64::from(a) / 255.0;
    (blend(r, a), blend(g, a), blend(b, a))
}

fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

fn opaque([r, g, b]: [u8; 3]) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

fn gray_pixel(px: &Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let [r, g, b, a] = px.0;
    let luma = rgb2y(f64::from(r), f64::from(g), f64::from(b));
    let val = blend(luma, alpha * f64::from(a) / 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([val, val, val, 255])
}

/// Inclusive 3x3 neighbourhood bounds around `(x, y)`, clamped to the image.
fn neighbourhood(img: &RgbaImage, x: u32, y: u32) -> (u32, u32, u32, u32) {
    let (w, h) = img.dimensions();
    (
        x.saturating_sub(1),
        y.saturating_sub(1),
        (x + 1).min(w - 1),
        (y + 1).min(h - 1),
    )
}

/// Whether the pixel at `(x1, y1)` of `img` looks like anti-aliasing.
///
/// An anti-aliased pixel sits between a darker and a brighter neighbour, and
/// one of those extremes is part of a flat area in both images.
fn antialiased(img: &RgbaImage, x1: u32, y1: u32, other: &RgbaImage) -> bool {
    let (x0, y0, x2, y2) = neighbourhood(img, x1, y1);
    let center = img.get_pixel(x1, y1);
    let on_edge = x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2;
    let mut zeroes = u32::from(on_edge);
    let mut min = 0.0;
    let mut max = 0.0;
    let mut darkest = (0, 0);
    let mut brightest = (0, 0);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let delta = color_delta(center, img.get_pixel(x, y), true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                darkest = (x, y);
            } else if delta > max {
                max = delta;
                brightest = (x, y);
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, darkest.0, darkest.1) && has_many_siblings(other, darkest.0, darkest.1))
        || (has_many_siblings(img, brightest.0, brightest.1)
            && has_many_siblings(other, brightest.0, brightest.1))
}

/// Whether the pixel has three or more identical neighbours.
fn has_many_siblings(img: &RgbaImage, x1: u32, y1: u32) -> bool {
    let (x0, y0, x2, y2) = neighbourhood(img, x1, y1);
    let center = img.get_pixel(x1, y1);
    let on_edge = x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2;
    let mut zeroes = u32::from(on_edge);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            if img.get_pixel(x, y) == center {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}

/// Find bounding boxes of changed regions using simple grid-based detection.
fn find_changed_regions(changed: &[bool], w: u32, h: u32) -> Vec<Rect> {
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // Divide image into a grid and find cells with significant changes.
    // The last row and column of cells may be partial.
    let cell_w = (w / 8).max(MIN_REGION_SIZE).min(w);
    let cell_h = (h / 8).max(MIN_REGION_SIZE).min(h);
    let mut regions = Vec::new();

    for gy in 0..h.div_ceil(cell_h) {
        for gx in 0..w.div_ceil(cell_w) {
            let x0 = gx * cell_w;
            let y0 = gy * cell_h;
            let x1 = ((gx + 1) * cell_w).min(w);
            let y1 = ((gy + 1) * cell_h).min(h);

            let total = (x1 - x0) * (y1 - y0);
            let count = (y0..y1)
                .flat_map(|y| (x0..x1).map(move |x| (y * w + x) as usize))
                .filter(|&i| changed[i])
                .count() as u32;

            // If more than 10% of cell pixels changed, mark this region
            if total > 0 && count > total / 10 {
                regions.push(Rect {
                    x: x0,
                    y: y0,
                    w: x1 - x0,
                    h: y1 - y0,
                });
            }
        }
    }

    merge_adjacent_regions(&mut regions);
    regions
}

/// Merge adjacent or overlapping rectangles.
fn merge_adjacent_regions(regions: &mut Vec<Rect>) {
    if regions.len() < 2 {
        return;
    }

    let mut merged = true;
    while merged {
        merged = false;
        let mut i = 0;
        while i < regions.len() {
            let mut j = i + 1;
            while j < regions.len() {
                if rects_adjacent(&regions[i], &regions[j]) {
                    let a = regions[i];
                    let b = regions.remove(j);
                    regions[i] = merge_rects(&a, &b);
                    merged = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
}

fn rects_adjacent(a: &Rect, b: &Rect) -> bool {
    !(a.x + a.w < b.x || b.x + b.w < a.x || a.y + a.h < b.y || b.y + b.h < a.y)
}

fn merge_rects(a: &Rect, b: &Rect) -> Rect {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    let right = (a.x + a.w).max(b.x + b.w);
    let bottom = (a.y + a.h).max(b.y + b.h);
    Rect {
        x,
        y,
        w: right - x,
        h: bottom - y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn test_identical_images() {
        let img = solid(100, 100, [40, 80, 120, 255]);
        let diff = compute_diff(&img, &img, &DiffOptions::default()).unwrap();
        assert_eq!(diff.diff_pixels, 0);
        assert_eq!(diff.percentage(), 0.0);
        assert!(diff.changed_regions.is_empty());
        assert_eq!(diff.diff_image.dimensions(), (100, 100));
    }

    #[test]
    fn test_completely_different_images() {
        let white = solid(100, 100, [255, 255, 255, 255]);
        let black = solid(100, 100, [0, 0, 0, 255]);
        let diff = compute_diff(&white, &black, &DiffOptions::default()).unwrap();
        assert_eq!(diff.diff_pixels, 10_000);
        assert!((diff.percentage() - 100.0).abs() < 1e-9);
        assert_eq!(*diff.diff_image.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
        assert_eq!(diff.changed_regions.len(), 1);
    }

    #[test]
    fn test_regions_cover_trailing_rows() {
        // 107 rows split into cells of 13 leave rows 104..107 over
        let baseline = solid(100, 107, [255, 255, 255, 255]);
        let mut current = baseline.clone();
        for y in 104..107 {
            for x in 0..100 {
                current.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let diff = compute_diff(&baseline, &current, &DiffOptions::default()).unwrap();
        assert_eq!(diff.diff_pixels, 300);
        assert_eq!(
            diff.changed_regions,
            vec![Rect {
                x: 0,
                y: 104,
                w: 100,
                h: 3
            }]
        );
    }

    #[test]
    fn test_regions_on_narrow_image() {
        let white = solid(40, 40, [255, 255, 255, 255]);
        let black = solid(40, 40, [0, 0, 0, 255]);
        let diff = compute_diff(&white, &black, &DiffOptions::default()).unwrap();
        assert_eq!(
            diff.changed_regions,
            vec![Rect {
                x: 0,
                y: 0,
                w: 40,
                h: 40
            }]
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = solid(100, 100, [0, 0, 0, 255]);
        let b = solid(100, 200, [0, 0, 0, 255]);
        let err = compute_diff(&a, &b, &DiffOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            SiteError::DimensionMismatch {
                baseline: (100, 100),
                current: (100, 200)
            }
        ));
    }

    #[test]
    fn test_channel_threshold_tolerates_small_shifts() {
        let a = solid(10, 10, [200, 200, 200, 255]);
        let b = solid(10, 10, [205, 205, 205, 255]);
        let strict = DiffOptions {
            threshold: 0.0,
            ..DiffOptions::default()
        };
        assert_eq!(compute_diff(&a, &b, &strict).unwrap().diff_pixels, 100);
        assert_eq!(compute_diff(&a, &b, &DiffOptions::default()).unwrap().diff_pixels, 0);
    }

    #[test]
    fn test_alt_color_marks_darkened_pixels() {
        let a = solid(4, 4, [255, 255, 255, 255]);
        let mut b = a.clone();
        b.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let options = DiffOptions {
            diff_color_alt: Some([0, 255, 0]),
            ..DiffOptions::default()
        };
        let diff = compute_diff(&a, &b, &options).unwrap();
        assert_eq!(diff.diff_pixels, 1);
        assert_eq!(*diff.diff_image.get_pixel(1, 1), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_mask_leaves_background_transparent() {
        let a = solid(4, 4, [255, 255, 255, 255]);
        let mut b = a.clone();
        b.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let options = DiffOptions {
            diff_mask: true,
            ..DiffOptions::default()
        };
        let diff = compute_diff(&a, &b, &options).unwrap();
        assert_eq!(diff.diff_image.get_pixel(0, 0).0[3], 0);
        assert_eq!(diff.diff_image.get_pixel(2, 2).0[3], 255);
    }

    #[test]
    fn test_antialiased_edge_is_ignored_when_excluded() {
        // A hard black/white edge in the baseline; the current capture softens it
        // with a gray column, the way font smoothing does.
        let mut a = solid(9, 9, [255, 255, 255, 255]);
        for y in 0..9 {
            for x in 0..4 {
                a.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let mut b = a.clone();
        for y in 0..9 {
            b.put_pixel(4, y, Rgba([128, 128, 128, 255]));
        }

        let exclude = DiffOptions {
            include_aa: false,
            ..DiffOptions::default()
        };
        let ignored = compute_diff(&a, &b, &exclude).unwrap();
        assert_eq!(ignored.diff_pixels, 0);
        assert_eq!(*ignored.diff_image.get_pixel(4, 4), Rgba([255, 255, 0, 255]));

        let counted = compute_diff(&a, &b, &DiffOptions::default()).unwrap();
        assert_eq!(counted.diff_pixels, 9);
    }

    #[test]
    fn test_transparent_pixels_blend_with_white() {
        let transparent = solid(3, 3, [0, 0, 0, 0]);
        let white = solid(3, 3, [255, 255, 255, 255]);
        let diff = compute_diff(&transparent, &white, &DiffOptions::default()).unwrap();
        assert_eq!(diff.diff_pixels, 0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let img = solid(2, 2, [0, 0, 0, 255]);
        let options = DiffOptions {
            threshold: 1.5,
            ..DiffOptions::default()
        };
        assert!(matches!(
            compute_diff(&img, &img, &options),
            Err(SiteError::InvalidInput(_))
        ));
    }
}
