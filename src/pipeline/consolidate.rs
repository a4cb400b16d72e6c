//! PDF consolidation adapter.
//!
//! [`PdfConsolidator`] lays accepted images out on one A4 portrait page with
//! pdfium: a title naming the document kind, a UTC timestamp line, then
//! either the front and back images stacked in two 170 × 115 mm boxes or a
//! single image in a 170 × 230 mm box. Images keep their aspect ratio and are
//! centred horizontally within their box.
//!
//! Like rendering, page assembly runs inside `spawn_blocking`.

use super::render::bind_pdfium;
use crate::error::ConsolidationError;
use crate::model::{Artifact, ArtifactSource, DocumentKind, SubmittedFile};
use crate::ports::Consolidator;
use async_trait::async_trait;
use chrono::Utc;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_WIDTH_MM: f32 = 170.0;
const SIDE_BOX_HEIGHT_MM: f32 = 115.0;
const FULL_BOX_HEIGHT_MM: f32 = 230.0;

/// A rectangle measured in millimetres from the top-left page corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxMm {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Where an image lands inside its box, same units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Scale `(img_w, img_h)` to fit the box, top-aligned and centred horizontally.
pub fn place_image(img_w: u32, img_h: u32, area: BoxMm) -> Placement {
    let scale = (area.width / img_w.max(1) as f32).min(area.height / img_h.max(1) as f32);
    let width = img_w as f32 * scale;
    let height = img_h as f32 * scale;
    Placement {
        left: area.left + (area.width - width) / 2.0,
        top: area.top,
        width,
        height,
    }
}

/// Builds the downloadable PDF with pdfium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfConsolidator;

impl PdfConsolidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Consolidator for PdfConsolidator {
    async fn consolidate(
        &self,
        front: &SubmittedFile,
        back: &SubmittedFile,
        kind: DocumentKind,
    ) -> Result<Artifact, ConsolidationError> {
        let front = decode("front", front)?;
        let back = decode("back", back)?;
        let bytes = run_blocking(move || write_two_sided(&front, &back, kind)).await?;
        Ok(Artifact::pdf(Artifact::file_name_for(kind), bytes, ArtifactSource::TwoSided))
    }

    async fn consolidate_single_full(
        &self,
        full: &SubmittedFile,
        kind: DocumentKind,
    ) -> Result<Artifact, ConsolidationError> {
        let img = decode("full", full)?;
        let bytes = run_blocking(move || write_single(&img, kind)).await?;
        Ok(Artifact::pdf(Artifact::file_name_for(kind), bytes, ArtifactSource::SingleFull))
    }
}

fn decode(side: &str, file: &SubmittedFile) -> Result<DynamicImage, ConsolidationError> {
    image::load_from_memory(&file.data).map_err(|e| ConsolidationError::UndecodableImage {
        side: side.to_string(),
        detail: e.to_string(),
    })
}

async fn run_blocking<F>(job: F) -> Result<Vec<u8>, ConsolidationError>
where
    F: FnOnce() -> Result<Vec<u8>, ConsolidationError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ConsolidationError::PdfWriteFailed {
            detail: format!("PDF task panicked: {}", e),
        })?
}

fn write_two_sided(
    front: &DynamicImage,
    back: &DynamicImage,
    kind: DocumentKind,
) -> Result<Vec<u8>, ConsolidationError> {
    let front_area = BoxMm {
        left: MARGIN_MM,
        top: 44.0,
        width: CONTENT_WIDTH_MM,
        height: SIDE_BOX_HEIGHT_MM,
    };
    let back_area = BoxMm {
        top: front_area.top + SIDE_BOX_HEIGHT_MM + 12.0,
        ..front_area
    };
    write_page(
        kind,
        &[
            (Some("Front side"), front, front_area),
            (Some("Back side"), back, back_area),
        ],
    )
}

fn write_single(img: &DynamicImage, kind: DocumentKind) -> Result<Vec<u8>, ConsolidationError> {
    let area = BoxMm {
        left: MARGIN_MM,
        top: 40.0,
        width: CONTENT_WIDTH_MM,
        height: FULL_BOX_HEIGHT_MM,
    };
    write_page(kind, &[(None, img, area)])
}

fn write_page(
    kind: DocumentKind,
    items: &[(Option<&str>, &DynamicImage, BoxMm)],
) -> Result<Vec<u8>, ConsolidationError> {
    let pdf_err = |e: PdfiumError| ConsolidationError::PdfWriteFailed {
        detail: format!("{:?}", e),
    };

    let pdfium = bind_pdfium().map_err(|e| ConsolidationError::EngineUnavailable {
        detail: e.to_string(),
    })?;
    let mut document = pdfium.create_new_pdf().map_err(pdf_err)?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(pdf_err)?;
        let objects = page.objects_mut();

        objects
            .create_text_object(x(MARGIN_MM), y(MARGIN_MM), kind.label(), bold, PdfPoints::new(16.0))
            .map_err(pdf_err)?;
        let stamp = format!("Date: {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
        objects
            .create_text_object(x(MARGIN_MM), y(MARGIN_MM + 7.0), stamp, regular, PdfPoints::new(10.0))
            .map_err(pdf_err)?;

        for (heading, img, area) in items {
            if let Some(heading) = heading {
                objects
                    .create_text_object(x(area.left), y(area.top - 3.0), *heading, bold, PdfPoints::new(12.0))
                    .map_err(pdf_err)?;
            }
            let at = place_image(img.width(), img.height(), *area);
            debug!("Placing {}x{} px image at {:?}", img.width(), img.height(), at);
            objects
                .create_image_object(
                    x(at.left),
                    y(at.top + at.height),
                    img,
                    Some(PdfPoints::from_mm(at.width)),
                    Some(PdfPoints::from_mm(at.height)),
                )
                .map_err(pdf_err)?;
        }
    }

    let bytes = document.save_to_bytes().map_err(pdf_err)?;
    info!("Consolidated {} into a {} byte PDF", kind.as_str(), bytes.len());
    Ok(bytes)
}

/// Horizontal position in points.
fn x(mm: f32) -> PdfPoints {
    PdfPoints::from_mm(mm)
}

/// Vertical position in points; pdfium measures from the bottom edge.
fn y(mm_from_top: f32) -> PdfPoints {
    PdfPoints::from_mm(PAGE_HEIGHT_MM - mm_from_top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntakeConfig;
    use crate::pipeline::input::resolve_input;

    const SIDE: BoxMm = BoxMm {
        left: MARGIN_MM,
        top: 44.0,
        width: CONTENT_WIDTH_MM,
        height: SIDE_BOX_HEIGHT_MM,
    };

    #[test]
    fn wide_card_fills_the_width() {
        // ID-1 card proportions, 85.6 × 54 mm.
        let p = place_image(856, 540, SIDE);
        assert!((p.width - 170.0).abs() < 1e-3);
        assert!((p.height - 107.24).abs() < 0.01);
        assert!((p.left - MARGIN_MM).abs() < 1e-3);
    }

    #[test]
    fn tall_page_is_centred() {
        let p = place_image(1000, 2000, SIDE);
        assert!((p.height - 115.0).abs() < 1e-3);
        assert!((p.width - 57.5).abs() < 1e-3);
        assert!((p.left - (MARGIN_MM + (170.0 - 57.5) / 2.0)).abs() < 1e-3);
        assert_eq!(p.top, SIDE.top);
    }

    #[test]
    fn both_side_boxes_fit_on_a4() {
        let back_top = SIDE.top + SIDE_BOX_HEIGHT_MM + 12.0;
        assert!(back_top + SIDE_BOX_HEIGHT_MM <= PAGE_HEIGHT_MM);
    }

    #[tokio::test]
    async fn undecodable_side_is_reported() {
        let good = SubmittedFile::new("front.png", "image/png", tiny_png());
        let bad = SubmittedFile::new("back.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00]);
        let err = PdfConsolidator::new()
            .consolidate(&good, &bad, DocumentKind::CedulaCiudadania)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsolidationError::UndecodableImage { ref side, .. } if side == "back"));
    }

    #[tokio::test]
    async fn gif_submission_decodes_for_layout() {
        // 1 × 1 GIF89a.
        const GIF: [u8; 43] = [
            0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xFF,
            0xFF, 0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C,
            0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00,
            0x3B,
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamp.gif");
        std::fs::write(&path, GIF).unwrap();

        let file = resolve_input(path.to_str().unwrap(), &IntakeConfig::default())
            .await
            .unwrap();
        assert_eq!(file.mime_type, "image/gif");

        let img = decode("front", &file).unwrap();
        assert_eq!((img.width(), img.height()), (1, 1));
    }

    fn tiny_png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(4, 3)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }
}
