//! Error types for the edgequake-intake library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IntakeError`]: **Fatal for one call**: the call cannot proceed at all
//!   (unreadable input, oversized file, provider not configured, a submission
//!   made while the machine is analysing). Returned as `Err(IntakeError)`.
//!
//! * [`ConsolidationError`]: **Non-fatal**: both sides were accepted but the
//!   output PDF could not be produced. The session stays `Completed` without
//!   an artifact and the error is recorded in the conversation log, so the
//!   caller can retry consolidation or restart.
//!
//! Classification failures never appear here. A broken vision call is folded
//! into a rejection-shaped [`crate::model::ClassificationResult`] by the
//! classifier itself.

use crate::model::FlowState;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-intake library.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck that the URL is valid and reachable.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file is neither an image nor a PDF.
    #[error("Unsupported file type '{mime_type}' for '{name}'. Only images and PDFs are accepted.")]
    UnsupportedType { name: String, mime_type: String },

    /// The file exceeds the configured size limit.
    #[error("File '{name}' is too large ({size} bytes). Maximum allowed: {limit} bytes.")]
    FileTooLarge { name: String, size: usize, limit: usize },

    /// A PDF submission could not be rasterised.
    #[error("Could not render '{name}': {detail}")]
    RenderFailed { name: String, detail: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// `submit` was called while the machine was not waiting for a file.
    #[error("Not accepting submissions while the session is {state}")]
    NotAccepting { state: FlowState },

    /// A multi-page document was offered for the second side.
    #[error("Only a single-page image is accepted for the second side")]
    MultiPageNotAllowed,

    /// `retry_consolidation` was called but there is no failed consolidation.
    #[error("Nothing to retry: the session is {state} and has {artifact} artifact")]
    NothingToRetry {
        state: FlowState,
        artifact: &'static str,
    },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory containing it),\n\
or install pdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure while producing the consolidated PDF.
///
/// Recorded in the conversation log and returned inside
/// [`crate::machine::SubmitOutcome::Completed`]; the session keeps both
/// accepted sides so consolidation can be retried.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ConsolidationError {
    /// An accepted side could not be decoded as an image.
    #[error("{side} image could not be decoded: {detail}")]
    UndecodableImage { side: String, detail: String },

    /// The PDF writer returned an error.
    #[error("PDF generation failed: {detail}")]
    PdfWriteFailed { detail: String },

    /// The PDF engine is unavailable.
    #[error("PDF engine unavailable: {detail}")]
    EngineUnavailable { detail: String },

    /// A slot needed for the recorded completion path is empty.
    #[error("the {side} side is missing")]
    MissingSide { side: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_accepting_names_state() {
        let e = IntakeError::NotAccepting {
            state: FlowState::AnalyzingFirst,
        };
        assert!(e.to_string().contains("analyzing"), "got: {e}");
    }

    #[test]
    fn file_too_large_display() {
        let e = IntakeError::FileTooLarge {
            name: "front.jpg".into(),
            size: 30,
            limit: 20,
        };
        let msg = e.to_string();
        assert!(msg.contains("front.jpg"));
        assert!(msg.contains("30 bytes"));
    }

    #[test]
    fn nothing_to_retry_display() {
        let e = IntakeError::NothingToRetry {
            state: FlowState::AwaitingFirst,
            artifact: "no",
        };
        assert!(e.to_string().contains("has no artifact"), "got: {e}");
    }

    #[test]
    fn consolidation_error_display() {
        let e = ConsolidationError::UndecodableImage {
            side: "back".into(),
            detail: "unexpected EOF".into(),
        };
        assert!(e.to_string().starts_with("back image"));
    }
}
