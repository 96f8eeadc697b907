// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Viewport screenshots for the operator dashboard.
//!
//! Capture itself is delegated to an external grabber command that writes a
//! PNG to stdout; this module fits the result to the requested bounds and
//! re-encodes it.

use std::io::Cursor;
use std::process::Stdio;

use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use tokio::process::Command;

/// Requested output format. `jpg` and `jpeg` are the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotFormat {
    Jpeg,
    Png,
}

impl ScreenshotFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Grab the display and encode it within `width`×`height` (never upscaled).
pub async fn capture(
    grabber_cmd: &str,
    width: Option<u32>,
    height: Option<u32>,
    quality: u8,
    format: ScreenshotFormat,
) -> anyhow::Result<Vec<u8>> {
    let output = Command::new("sh")
        .args(["-c", grabber_cmd])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;
    if !output.status.success() {
        anyhow::bail!("screenshot grabber exited with {}", output.status);
    }

    let image = image::load_from_memory(&output.stdout)?;
    let fitted = fit(image, width, height);

    let mut encoded = Vec::new();
    match format {
        ScreenshotFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
            fitted.write_with_encoder(encoder)?;
        }
        ScreenshotFormat::Png => {
            fitted.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
        }
    }
    Ok(encoded)
}

fn fit(
    image: image::DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
) -> image::DynamicImage {
    let (image_width, image_height) = (image.width(), image.height());
    let width = width.unwrap_or(image_width);
    let height = height.unwrap_or(image_height);

    let ratio = (width as f64 / image_width as f64)
        .min(height as f64 / image_height as f64)
        .min(1.0);
    if ratio >= 1.0 || ratio <= 0.0 {
        return image;
    }

    image.resize(
        (ratio * image_width as f64) as u32,
        (ratio * image_height as f64) as u32,
        image::imageops::FilterType::Triangle,
    )
}

#[cfg(test)]
#[path = "screenshot_tests.rs"]
mod tests;
