//! Photo clean-up before classification.
//!
//! Phone photos of ID cards tend to be dim and soft. A percentile contrast
//! stretch followed by an unsharp mask makes the printed text noticeably
//! easier for the vision model to read. The result is re-encoded as JPEG at
//! quality 92.
//!
//! Enhancement is best-effort: any decode or encode failure returns the
//! original file untouched.

use crate::config::IntakeConfig;
use crate::model::SubmittedFile;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::io::Cursor;
use tracing::{debug, warn};

pub const JPEG_QUALITY: u8 = 92;

/// Share of darkest/brightest pixels clipped by the contrast stretch.
const CLIP_FRACTION: f64 = 0.01;

/// Enhance an image submission. PDFs and other files pass through.
pub async fn enhance_image(file: SubmittedFile, config: &IntakeConfig) -> SubmittedFile {
    if !config.enhance_images || !file.is_image() {
        return file;
    }
    let max_pixels = config.max_rendered_pixels;
    let original = file.clone();

    match tokio::task::spawn_blocking(move || enhance_blocking(&file, max_pixels)).await {
        Ok(Ok(enhanced)) => enhanced,
        Ok(Err(e)) => {
            warn!("Image enhancement failed for {}, using original: {}", original.name, e);
            original
        }
        Err(e) => {
            warn!("Enhancement task panicked for {}: {}", original.name, e);
            original
        }
    }
}

fn enhance_blocking(file: &SubmittedFile, max_pixels: u32) -> Result<SubmittedFile, image::ImageError> {
    let mut img = image::load_from_memory(&file.data)?;
    if img.width().max(img.height()) > max_pixels {
        img = img.resize(max_pixels, max_pixels, FilterType::Lanczos3);
    }

    let mut rgb = img.to_rgb8();
    stretch_contrast(&mut rgb);
    let sharpened = DynamicImage::ImageRgb8(rgb).unsharpen(3.0, 0);

    let mut buf = Vec::new();
    sharpened
        .to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), JPEG_QUALITY))?;

    debug!(
        "Enhanced {}: {} → {} bytes ({}x{})",
        file.name,
        file.len(),
        buf.len(),
        sharpened.width(),
        sharpened.height()
    );
    Ok(SubmittedFile::new(file.name.clone(), "image/jpeg", buf))
}

/// Linear per-channel stretch between the 1st and 99th luma percentiles.
pub fn stretch_contrast(img: &mut RgbImage) {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[luma(p.0) as usize] += 1;
    }
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return;
    }
    let cut = (total as f64 * CLIP_FRACTION) as u64;
    let low = percentile(hist.iter().enumerate(), cut);
    let high = percentile(hist.iter().enumerate().rev(), cut);
    if high <= low {
        return;
    }

    let scale = 255.0 / (high - low) as f32;
    for p in img.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = ((*c as f32 - low as f32) * scale).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn luma([r, g, b]: [u8; 3]) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

/// First bucket at which the running count exceeds `cut`.
fn percentile<'a>(buckets: impl Iterator<Item = (usize, &'a u64)>, cut: u64) -> u8 {
    let mut seen = 0;
    let mut last = 0;
    for (value, count) in buckets {
        last = value;
        seen += count;
        if seen > cut {
            break;
        }
    }
    last as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn stretch_widens_a_dim_image() {
        let mut img = RgbImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgb([100, 100, 100])
            } else {
                Rgb([140, 140, 140])
            }
        });
        stretch_contrast(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(19, 0).0, [255, 255, 255]);
    }

    #[test]
    fn flat_image_is_left_alone() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([90, 90, 90]));
        stretch_contrast(&mut img);
        assert_eq!(img.get_pixel(2, 2).0, [90, 90, 90]);
    }

    #[tokio::test]
    async fn enhanced_image_is_jpeg() {
        let img = RgbImage::from_fn(64, 40, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 120]));
        let file = SubmittedFile::new("front.png", "image/png", png(img));
        let out = enhance_image(file, &IntakeConfig::default()).await;
        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(out.name, "front.png");
        assert!(out.data.starts_with(&[0xFF, 0xD8]));
    }

    #[tokio::test]
    async fn undecodable_image_passes_through() {
        let file = SubmittedFile::new("broken.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00]);
        let out = enhance_image(file.clone(), &IntakeConfig::default()).await;
        assert_eq!(out, file);
    }

    #[tokio::test]
    async fn pdf_and_disabled_pass_through() {
        let pdf = SubmittedFile::new("doc.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        assert_eq!(enhance_image(pdf.clone(), &IntakeConfig::default()).await, pdf);

        let config = IntakeConfig::builder().enhance_images(false).build().unwrap();
        let jpg = SubmittedFile::new("a.jpg", "image/jpeg", vec![1, 2, 3]);
        assert_eq!(enhance_image(jpg.clone(), &config).await, jpg);
    }
}
