//! Pipeline stages around the intake state machine.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the adapters can be swapped without touching the machine.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ enhance ──▶ (machine) ──▶ llm ──▶ postprocess ──▶ (machine) ──▶ consolidate
//! (URL/path) (photo fix)             (VLM)    (JSON cleanup)               (pdfium)
//!                                     │
//!                            render + encode
//!                          (PDF pages, base64)
//! ```
//!
//! 1. [`input`] : read a path or download a URL into memory, sniff the MIME
//!    type, enforce the size limit
//! 2. [`enhance`]: contrast stretch and sharpening for photos (best-effort)
//! 3. [`render`]: rasterise PDF pages in `spawn_blocking`; also binds pdfium
//! 4. [`encode`]: base64-wrap images for the multimodal request body
//! 5. [`llm`]   : [`llm::VisionClassifier`], the classification adapter with
//!    retry/backoff; the only stage with LLM network I/O
//! 6. [`postprocess`]: deterministic cleanup and lenient parsing of the reply
//! 7. [`consolidate`]: [`consolidate::PdfConsolidator`], the A4 layout

pub mod consolidate;
pub mod encode;
pub mod enhance;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
