//! # edgequake-intake
//!
//! Guided intake of two-sided identity documents, validated by a Vision
//! Language Model (VLM) and consolidated into a single PDF.
//!
//! ## Why this crate?
//!
//! Asking people to upload "a scan of your ID" produces a mix of blurry
//! photos, the same side twice, a passport instead of the national ID card,
//! or one PDF that already holds both sides. This crate runs the upload as a
//! short conversation: each file is classified by a VLM (kind, side, validity,
//! legibility, extracted fields) and the session only advances when the file
//! is what was asked for. When both sides are in, they are laid out on one A4
//! page and returned as a downloadable PDF.
//!
//! ## Flow Overview
//!
//! ```text
//! file / URL
//!  │
//!  ├─ 1. Input     resolve local path or download, sniff MIME, size limit
//!  ├─ 2. Enhance   contrast + sharpening for photos (best-effort)
//!  ├─ 3. Machine   AwaitingFirst → AnalyzingFirst → AwaitingSecond → …
//!  │    └─ Classify  VLM call with retry/backoff, lenient JSON parsing
//!  ├─ 4. Review    merge fields from both sides, low-confidence alerts
//!  └─ 5. Output    original PDF as-is, or pdfium A4 layout of the images
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_intake::{run_intake, write_artifact, IntakeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = IntakeConfig::default();
//!     let report = run_intake(&["front.jpg", "back.jpg"], &config).await?;
//!     if let Some(ref artifact) = report.artifact {
//!         write_artifact(artifact, &artifact.file_name)?;
//!     }
//!     for message in report.transcript.messages() {
//!         println!("{}", message.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Bringing your own adapters
//!
//! The state machine only talks to the [`Classifier`] and [`Consolidator`]
//! traits. Build an [`IntakeMachine`] directly to plug in a different model
//! client, a rules engine, or fakes in tests.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `intake` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-intake = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod conversation;
pub mod error;
pub mod intake;
pub mod machine;
pub mod model;
pub mod pipeline;
pub mod ports;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IntakeConfig, IntakeConfigBuilder};
pub use conversation::{Attachment, ConversationLog, Message, Role};
pub use error::{ConsolidationError, IntakeError};
pub use intake::{
    classify_file, drive, open_session, prepare_file, resolve_provider, run_intake,
    write_artifact, IntakeReport,
};
pub use machine::{IntakeMachine, Phase, RejectReason, SubmitOutcome, Ticket};
pub use model::{
    Artifact, ArtifactSource, ClassificationResult, DocumentKind, DocumentSide, ExtractedData,
    ExtractedField, Field, FlowState, SubmittedFile,
};
pub use pipeline::consolidate::PdfConsolidator;
pub use pipeline::llm::VisionClassifier;
pub use ports::{ClassificationRequest, Classifier, Consolidator};
pub use progress::{IntakeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{Completion, Session, SessionSnapshot};
