//! The two external collaborators of the intake machine.
//!
//! Both are object-safe async traits so the machine can hold them as
//! `Arc<dyn …>` and tests can substitute scripted fakes.

use crate::error::ConsolidationError;
use crate::model::{Artifact, ClassificationResult, DocumentKind, DocumentSide, SubmittedFile};
use async_trait::async_trait;

/// What the classifier is asked to judge.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRequest<'a> {
    pub file: &'a SubmittedFile,
    /// The side the flow is waiting for.
    pub expected_side: Option<DocumentSide>,
    /// Kind of the document already on file, if any.
    pub expected_kind: Option<DocumentKind>,
}

/// Judges validity, legibility and side of one submitted file.
///
/// Implementations must not fail: transport or parse errors are reported as
/// [`ClassificationResult::failed`] so that, for the machine, a broken call is
/// indistinguishable from a rejected document.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: ClassificationRequest<'_>) -> ClassificationResult;
}

/// Produces the downloadable document from accepted sides.
#[async_trait]
pub trait Consolidator: Send + Sync {
    /// Combine a front and a back image into one document.
    async fn consolidate(
        &self,
        front: &SubmittedFile,
        back: &SubmittedFile,
        kind: DocumentKind,
    ) -> Result<Artifact, ConsolidationError>;

    /// Lay out a single image that already shows both sides.
    async fn consolidate_single_full(
        &self,
        full: &SubmittedFile,
        kind: DocumentKind,
    ) -> Result<Artifact, ConsolidationError>;
}
