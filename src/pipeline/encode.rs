//! Image encoding for the vision request body.
//!
//! Photos are forwarded as-is (already JPEG/PNG); rendered PDF pages are
//! PNG-encoded first. Both end up base64-wrapped in an `ImageData` with
//! `detail: "high"` so GPT-4-class models read the fine print on the card.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised PDF page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(encode_bytes(&buf, "image/png"))
}

/// Wrap already-encoded image bytes.
pub fn encode_bytes(data: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(data);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}
