//! PDF rasterisation and pdfium binding.
//!
//! pdfium wraps a C++ library with thread-local state, so every call here
//! runs inside `tokio::task::spawn_blocking`. The longest edge of a rendered
//! page is capped by `max_rendered_pixels` rather than a DPI, which keeps a
//! scanned A4 registry and a photographed card at comparable sizes.

use crate::error::IntakeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bind to a pdfium library.
///
/// `PDFIUM_LIB_PATH` may name the library itself or the directory holding
/// it; otherwise the system loader is asked.
pub fn bind_pdfium() -> Result<Pdfium, IntakeError> {
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(env_path);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        if lib.exists() {
            return Pdfium::bind_to_library(&lib)
                .map(Pdfium::new)
                .map_err(|e| IntakeError::PdfiumBindingFailed(format!("{}: {e}", lib.display())));
        }
        warn!("PDFIUM_LIB_PATH '{}' not found; trying the system library", lib.display());
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| IntakeError::PdfiumBindingFailed(e.to_string()))
}

/// Rasterise the first `max_pages` pages of an in-memory PDF.
pub async fn render_pages(
    name: &str,
    data: Arc<[u8]>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, IntakeError> {
    let owned_name = name.to_string();
    tokio::task::spawn_blocking(move || render_pages_blocking(&owned_name, &data, max_pages, max_pixels))
        .await
        .map_err(|e| IntakeError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    name: &str,
    data: &[u8],
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, IntakeError> {
    let render_failed = |detail: String| IntakeError::RenderFailed {
        name: name.to_string(),
        detail,
    };

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| render_failed(format!("{:?}", e)))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("{}: {} page(s), rendering up to {}", name, total_pages, max_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total_pages.min(max_pages));
    for idx in 0..total_pages.min(max_pages) {
        let page = pages
            .get(idx as u16)
            .map_err(|e| render_failed(format!("page {}: {:?}", idx + 1, e)))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_failed(format!("page {}: {:?}", idx + 1, e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    if images.is_empty() {
        return Err(render_failed("document has no pages".to_string()));
    }
    Ok(images)
}
