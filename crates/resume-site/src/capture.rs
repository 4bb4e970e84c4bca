//! Loading and persisting screenshots produced by the external browser driver.

use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::types::{SiteError, SiteResult, Viewport};

/// Load a screenshot from a file path.
///
/// Any failure to read or decode is a capture failure: the comparison must
/// never run against a substituted image.
pub fn capture_from_file(path: &Path) -> SiteResult<RgbaImage> {
    if !path.exists() {
        return Err(SiteError::Capture(format!(
            "screenshot not found at {}",
            path.display()
        )));
    }
    if !is_supported_format(&path.to_string_lossy()) {
        return Err(SiteError::Capture(format!(
            "unsupported screenshot format: {}",
            path.display()
        )));
    }
    let img = image::open(path).map_err(|e| {
        SiteError::Capture(format!("failed to decode {}: {e}", path.display()))
    })?;
    Ok(img.to_rgba8())
}

/// Load a screenshot from base64-encoded data, e.g. piped from a CDP session.
pub fn capture_from_base64(data: &str, mime: &str) -> SiteResult<RgbaImage> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| SiteError::Capture(format!("Invalid base64: {e}")))?;

    let format = match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    };

    let img = if let Some(fmt) = format {
        image::load_from_memory_with_format(&bytes, fmt)
    } else {
        image::load_from_memory(&bytes)
    }
    .map_err(|e| SiteError::Capture(format!("failed to decode screenshot: {e}")))?;

    Ok(img.to_rgba8())
}

/// Write an image as PNG, creating parent directories and replacing any previous file.
pub fn persist_capture(img: &RgbaImage, path: &Path) -> SiteResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Check a capture against the target viewport.
///
/// The width must match exactly. Full-page captures may be taller than the
/// viewport. Returns a description of the mismatch, if any.
pub fn check_viewport(img: &RgbaImage, viewport: &Viewport, full_page: bool) -> Option<String> {
    let (w, h) = img.dimensions();
    if w != viewport.width {
        return Some(format!(
            "capture is {w}px wide, expected viewport width {}px",
            viewport.width
        ));
    }
    let height_ok = if full_page {
        h >= viewport.height
    } else {
        h == viewport.height
    };
    if !height_ok {
        return Some(format!(
            "capture is {h}px tall, expected {}{}px",
            if full_page { "at least " } else { "" },
            viewport.height
        ));
    }
    None
}

/// Check if a file path points to a supported image format.
pub fn is_supported_format(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "webp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results/current.png");
        let img = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
        persist_capture(&img, &path).unwrap();

        let loaded = capture_from_file(&path).unwrap();
        assert_eq!(loaded, img);

        // Overwrites the previous run's artifact
        let next = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        persist_capture(&next, &path).unwrap();
        assert_eq!(capture_from_file(&path).unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn test_missing_file_is_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = capture_from_file(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, SiteError::Capture(_)));
    }

    #[test]
    fn test_corrupt_file_is_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(capture_from_file(&path), Err(SiteError::Capture(_))));
    }

    #[test]
    fn test_base64_capture() {
        use base64::Engine;
        let img = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);

        assert_eq!(capture_from_base64(&b64, "image/png").unwrap(), img);
        assert_eq!(capture_from_base64(&b64, "").unwrap(), img);
        assert!(matches!(
            capture_from_base64("%%%", "image/png"),
            Err(SiteError::Capture(_))
        ));
    }

    #[test]
    fn test_check_viewport() {
        let viewport = Viewport {
            width: 100,
            height: 50,
        };
        let exact = RgbaImage::new(100, 50);
        let tall = RgbaImage::new(100, 80);
        let narrow = RgbaImage::new(90, 50);

        assert!(check_viewport(&exact, &viewport, false).is_none());
        assert!(check_viewport(&tall, &viewport, true).is_none());
        assert!(check_viewport(&tall, &viewport, false).is_some());
        assert!(check_viewport(&narrow, &viewport, true).is_some());
    }

    #[test]
    fn test_unsupported_extension_is_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.txt");
        std::fs::write(&path, b"text").unwrap();
        assert!(matches!(capture_from_file(&path), Err(SiteError::Capture(_))));
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format("current.png"));
        assert!(is_supported_format("shot.JPG"));
        assert!(!is_supported_format("report.json"));
    }
}
