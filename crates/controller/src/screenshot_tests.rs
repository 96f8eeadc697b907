// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::screenshot::{capture, ScreenshotFormat};

fn write_test_png(dir: &std::path::Path) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join("frame.png");
    let image = image::DynamicImage::new_rgb8(64, 32);
    image.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

#[test]
fn format_parsing() {
    assert_eq!(ScreenshotFormat::parse("jpeg"), Some(ScreenshotFormat::Jpeg));
    assert_eq!(ScreenshotFormat::parse("JPG"), Some(ScreenshotFormat::Jpeg));
    assert_eq!(ScreenshotFormat::parse("png"), Some(ScreenshotFormat::Png));
    assert_eq!(ScreenshotFormat::parse("webp"), None);
    assert_eq!(ScreenshotFormat::Jpeg.mime_type(), "image/jpeg");
}

#[tokio::test]
async fn full_size_png_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_test_png(dir.path())?;
    let cmd = format!("cat {}", path.display());

    let bytes = capture(&cmd, None, None, 95, ScreenshotFormat::Png).await?;
    let decoded = image::load_from_memory(&bytes)?;
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
    Ok(())
}

#[tokio::test]
async fn fits_within_requested_bounds() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_test_png(dir.path())?;
    let cmd = format!("cat {}", path.display());

    let bytes = capture(&cmd, Some(32), Some(32), 95, ScreenshotFormat::Jpeg).await?;
    let decoded = image::load_from_memory(&bytes)?;
    assert!(decoded.width() <= 32 && decoded.height() <= 32);
    // Aspect ratio is preserved, so the height shrinks with the width.
    assert_eq!((decoded.width(), decoded.height()), (32, 16));
    Ok(())
}

#[tokio::test]
async fn never_upscales() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_test_png(dir.path())?;
    let cmd = format!("cat {}", path.display());

    let bytes = capture(&cmd, Some(4096), Some(4096), 95, ScreenshotFormat::Png).await?;
    let decoded = image::load_from_memory(&bytes)?;
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
    Ok(())
}

#[tokio::test]
async fn failing_grabber_is_an_error() {
    let result = capture("false", None, None, 95, ScreenshotFormat::Png).await;
    assert!(result.is_err());
}
