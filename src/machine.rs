//! The document-intake state machine.
//!
//! ## Flow
//!
//! ```text
//!  AwaitingFirst ──begin──▶ AnalyzingFirst ──resolve──┬──▶ AwaitingSecond
//!        ▲                                            ├──▶ Completed  (full document)
//!        └────────────── rejected ◀───────────────────┘
//!
//!  AwaitingSecond ──begin──▶ AnalyzingSecond ──resolve──┬──▶ Completed
//!        ▲                                              │
//!        └──────────────── rejected ◀───────────────────┘
//! ```
//!
//! `submit` is `begin` + classify + `resolve`. The split lets a caller run
//! the classification elsewhere; a [`Ticket`] carries the session generation
//! so a result arriving after [`IntakeMachine::restart`] is discarded.
//!
//! Every step appends to the [`ConversationLog`] before the next one runs,
//! and every analysis path ends in a visible transition.

use crate::config::IntakeConfig;
use crate::conversation::{ConversationLog, Message};
use crate::error::{ConsolidationError, IntakeError};
use crate::model::{
    has_pdf_signature, Artifact, ArtifactSource, ClassificationResult, DocumentKind,
    DocumentSide, ExtractedData, FlowState, SubmittedFile,
};
use crate::ports::{ClassificationRequest, Classifier, Consolidator};
use crate::progress::ProgressCallback;
use crate::review;
use crate::session::{Completion, Session, SessionSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GREETING: &str = "Hello! Please send a photo of the FRONT side of your identity document. \
You can also send a single PDF that contains both sides.";

/// Which half of the flow a ticket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    First,
    Second,
}

/// Why a submission was turned down. All of them are recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Invalid,
    Illegible,
    /// A known document kind other than the one already on file.
    DifferentDocument,
    /// The side detected is already held in its slot.
    DuplicateSide,
    /// A PDF offered while waiting for the second side.
    MultiPageNotAllowed,
}

/// Result of one submission as seen by the caller.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// First side accepted into `filled`; `missing` is requested next.
    AwaitingSecond {
        filled: DocumentSide,
        missing: DocumentSide,
    },
    /// The session completed. `artifact` is `None` when consolidation failed,
    /// in which case `failure` says why.
    Completed {
        artifact: Option<Artifact>,
        failure: Option<ConsolidationError>,
        needs_review: bool,
    },
    Rejected(RejectReason),
    /// The rejection limit was reached; the session is now in `Error`.
    Failed { rejections: u32 },
    /// The result belonged to an older generation and was ignored.
    Discarded,
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed { .. })
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            SubmitOutcome::Completed { artifact, .. } => artifact.as_ref(),
            _ => None,
        }
    }
}

/// An accepted submission waiting for its classification result.
///
/// Returned by [`IntakeMachine::begin`] and consumed by
/// [`IntakeMachine::resolve`].
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    seq: u64,
    phase: Phase,
    expected_side: Option<DocumentSide>,
    expected_kind: Option<DocumentKind>,
    file: SubmittedFile,
    is_multi_page: bool,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn expected_side(&self) -> Option<DocumentSide> {
        self.expected_side
    }

    pub fn expected_kind(&self) -> Option<DocumentKind> {
        self.expected_kind
    }

    pub fn file(&self) -> &SubmittedFile {
        &self.file
    }

    pub fn is_multi_page(&self) -> bool {
        self.is_multi_page
    }

    /// The request to hand to a [`Classifier`].
    pub fn request(&self) -> ClassificationRequest<'_> {
        ClassificationRequest {
            file: &self.file,
            expected_side: self.expected_side,
            expected_kind: self.expected_kind,
        }
    }
}

/// Drives one intake session from the first upload to the final artifact.
pub struct IntakeMachine {
    session: Session,
    log: ConversationLog,
    classifier: Arc<dyn Classifier>,
    consolidator: Arc<dyn Consolidator>,
    config: IntakeConfig,
    callback: Option<ProgressCallback>,
    needs_review: bool,
    /// Sequence number of the last ticket issued.
    issued: u64,
}

impl IntakeMachine {
    /// Start a fresh session and greet the user.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        consolidator: Arc<dyn Consolidator>,
        config: IntakeConfig,
    ) -> Self {
        let callback = config.progress_callback.clone();
        let mut machine = Self {
            session: Session::new(),
            log: ConversationLog::new(),
            classifier,
            consolidator,
            config,
            callback,
            needs_review: false,
            issued: 0,
        };
        info!(session = %machine.session.id(), "Intake session started");
        machine.say(GREETING);
        machine
    }

    pub fn state(&self) -> FlowState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn final_artifact(&self) -> Option<&Artifact> {
        self.session.final_artifact()
    }

    /// Whether the completed session was flagged by the confidence review.
    pub fn needs_review(&self) -> bool {
        self.needs_review
    }

    /// Fields read from both accepted sides, merged.
    pub fn merged_data(&self) -> ExtractedData {
        review::merge_extracted(
            self.session.front().extracted(),
            self.session.back().extracted(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Submit a file and wait for the verdict.
    ///
    /// A PDF offered for the second side is reported as
    /// `Ok(Rejected(MultiPageNotAllowed))`; the only errors are precondition
    /// failures.
    pub async fn submit(
        &mut self,
        file: SubmittedFile,
        is_multi_page: bool,
    ) -> Result<SubmitOutcome, IntakeError> {
        let ticket = match self.begin(file, is_multi_page) {
            Ok(ticket) => ticket,
            Err(IntakeError::MultiPageNotAllowed) => {
                return Ok(match self.state() {
                    FlowState::Error => SubmitOutcome::Failed {
                        rejections: self.session.consecutive_rejections(),
                    },
                    _ => SubmitOutcome::Rejected(RejectReason::MultiPageNotAllowed),
                });
            }
            Err(e) => return Err(e),
        };

        let classifier = Arc::clone(&self.classifier);
        let result = classifier.classify(ticket.request()).await;
        Ok(self.resolve(ticket, result).await)
    }

    /// Accept a file for analysis and lock the machine until it is resolved.
    pub fn begin(
        &mut self,
        file: SubmittedFile,
        is_multi_page: bool,
    ) -> Result<Ticket, IntakeError> {
        let state = self.session.state();
        if !state.accepts_submissions() {
            return Err(IntakeError::NotAccepting { state });
        }

        self.push(Message::user_upload(&file));
        let is_multi_page = is_multi_page || has_pdf_signature(&file.data);
        debug!(
            file = %file.name,
            bytes = file.len(),
            multi_page = is_multi_page,
            "Submission received"
        );

        let (phase, expected_side, expected_kind) = if state == FlowState::AwaitingFirst {
            self.transition(FlowState::AnalyzingFirst);
            (Phase::First, Some(DocumentSide::Front), None)
        } else {
            let missing = self.session.missing_side();
            if is_multi_page {
                self.reject(
                    RejectReason::MultiPageNotAllowed,
                    format!(
                        "Multi-page documents are only accepted as the first submission. \
Please send a single image of the {} side.",
                        missing.as_str().to_uppercase()
                    ),
                    FlowState::AwaitingSecond,
                );
                return Err(IntakeError::MultiPageNotAllowed);
            }
            self.transition(FlowState::AnalyzingSecond);
            let kind = self.session.kind();
            (
                Phase::Second,
                Some(missing),
                (kind != DocumentKind::Unknown).then_some(kind),
            )
        };

        self.issued += 1;
        Ok(Ticket {
            generation: self.session.generation(),
            seq: self.issued,
            phase,
            expected_side,
            expected_kind,
            file,
            is_multi_page,
        })
    }

    /// Apply a classification result to the submission it was issued for.
    pub async fn resolve(&mut self, ticket: Ticket, result: ClassificationResult) -> SubmitOutcome {
        let expected_state = match ticket.phase {
            Phase::First => FlowState::AnalyzingFirst,
            Phase::Second => FlowState::AnalyzingSecond,
        };
        if ticket.generation != self.session.generation()
            || ticket.seq != self.issued
            || self.state() != expected_state
        {
            debug!(
                ticket_generation = ticket.generation,
                ticket_seq = ticket.seq,
                generation = self.session.generation(),
                state = %self.state(),
                "Discarding stale classification result"
            );
            return SubmitOutcome::Discarded;
        }

        debug!(
            valid = result.is_valid,
            legible = result.is_legible,
            side = %result.detected_side,
            kind = result.kind.as_str(),
            "Classification result"
        );

        match ticket.phase {
            Phase::First => self.resolve_first(ticket, result).await,
            Phase::Second => self.resolve_second(ticket, result).await,
        }
    }

    async fn resolve_first(&mut self, ticket: Ticket, result: ClassificationResult) -> SubmitOutcome {
        if !result.is_valid {
            let text = feedback_or(&result.feedback, INVALID_FALLBACK);
            return self.reject(RejectReason::Invalid, text, FlowState::AwaitingFirst);
        }
        if !result.is_legible {
            let text = feedback_or(&result.feedback, ILLEGIBLE_FALLBACK);
            return self.reject(RejectReason::Illegible, text, FlowState::AwaitingFirst);
        }

        self.session.consecutive_rejections = 0;
        self.session.kind = result.kind;
        let Ticket {
            file,
            is_multi_page,
            ..
        } = ticket;
        let ClassificationResult {
            detected_side,
            feedback,
            extracted,
            ..
        } = result;

        match detected_side {
            DocumentSide::Full => {
                let completion = if is_multi_page && has_pdf_signature(&file.data) {
                    Completion::Original
                } else {
                    Completion::SingleFull
                };
                self.session.front.fill(file, extracted);
                self.session.completion = Some(completion);
                self.say_feedback(&feedback);
                self.complete().await
            }
            side => {
                let filled = if side == DocumentSide::Back {
                    DocumentSide::Back
                } else {
                    DocumentSide::Front
                };
                self.session.slot_mut(filled).fill(file, extracted);
                self.session.touch();
                let missing = self.session.missing_side();
                info!(
                    session = %self.session.id(),
                    filled = %filled,
                    kind = self.session.kind().as_str(),
                    "First side accepted"
                );
                self.say_feedback(&feedback);
                self.say(format!(
                    "{} side received. Now send the {} side.",
                    capitalise(filled.as_str()),
                    missing.as_str().to_uppercase()
                ));
                self.transition(FlowState::AwaitingSecond);
                SubmitOutcome::AwaitingSecond { filled, missing }
            }
        }
    }

    async fn resolve_second(&mut self, ticket: Ticket, result: ClassificationResult) -> SubmitOutcome {
        if !result.is_valid {
            let text = feedback_or(&result.feedback, INVALID_FALLBACK);
            return self.reject(RejectReason::Invalid, text, FlowState::AwaitingSecond);
        }
        if !result.is_legible {
            let text = feedback_or(&result.feedback, ILLEGIBLE_FALLBACK);
            return self.reject(RejectReason::Illegible, text, FlowState::AwaitingSecond);
        }

        let missing = self.session.missing_side();
        let on_file = self.session.kind();
        if on_file != DocumentKind::Unknown
            && result.kind != DocumentKind::Unknown
            && result.kind != on_file
        {
            let text = format!(
                "This looks like a different document ({}). Please send the {} side of the same {}.",
                result.kind.label(),
                missing.as_str().to_uppercase(),
                on_file.label()
            );
            return self.reject(RejectReason::DifferentDocument, text, FlowState::AwaitingSecond);
        }

        let duplicate = self
            .session
            .slot(result.detected_side)
            .is_some_and(|slot| slot.is_occupied());
        if duplicate {
            let text = format!(
                "We already have the {} side. Please send the {} side of the document.",
                result.detected_side,
                missing.as_str().to_uppercase()
            );
            return self.reject(RejectReason::DuplicateSide, text, FlowState::AwaitingSecond);
        }

        self.session.consecutive_rejections = 0;
        if on_file == DocumentKind::Unknown {
            self.session.kind = result.kind;
        }
        self.session.slot_mut(missing).fill(ticket.file, result.extracted);
        self.session.completion = Some(Completion::TwoSided);
        info!(
            session = %self.session.id(),
            filled = %missing,
            "Second side accepted"
        );
        self.say_feedback(&result.feedback);
        self.complete().await
    }

    /// Enter `Completed`, consolidate once and review the extracted data.
    async fn complete(&mut self) -> SubmitOutcome {
        self.transition(FlowState::Completed);
        let (artifact, failure) = self.consolidate().await;

        let merged = self.merged_data();
        let alerts = review::build_alerts(&merged, self.session.kind(), self.config.confidence_threshold);
        for alert in &alerts {
            self.say(alert.clone());
        }
        self.needs_review = review::needs_review(&alerts, self.config.review_alert_limit);
        if self.needs_review {
            warn!(
                session = %self.session.id(),
                alerts = alerts.len(),
                "Extracted data flagged for manual review"
            );
            self.say(
                "Several key fields were read with low confidence. Please verify the document \
manually, or restart and send sharper images.",
            );
        }

        SubmitOutcome::Completed {
            artifact,
            failure,
            needs_review: self.needs_review,
        }
    }

    /// Re-run the recorded consolidation after a failure.
    pub async fn retry_consolidation(&mut self) -> Result<SubmitOutcome, IntakeError> {
        let state = self.state();
        if state != FlowState::Completed || self.session.final_artifact().is_some() {
            return Err(IntakeError::NothingToRetry {
                state,
                artifact: if self.session.final_artifact().is_some() {
                    "an"
                } else {
                    "no"
                },
            });
        }

        info!(session = %self.session.id(), "Retrying consolidation");
        let (artifact, failure) = self.consolidate().await;
        Ok(SubmitOutcome::Completed {
            artifact,
            failure,
            needs_review: self.needs_review,
        })
    }

    /// Produce the artifact for the recorded completion path and record the
    /// outcome in the session and the log.
    async fn consolidate(&mut self) -> (Option<Artifact>, Option<ConsolidationError>) {
        match self.build_artifact().await {
            Ok(artifact) => {
                info!(
                    session = %self.session.id(),
                    file = %artifact.file_name,
                    bytes = artifact.len(),
                    source = ?artifact.source,
                    "Final document ready"
                );
                self.session.final_artifact = Some(artifact.clone());
                self.session.touch();
                self.push(
                    Message::assistant(format!(
                        "Your {} is ready: {}",
                        self.session.kind().label(),
                        artifact.file_name
                    ))
                    .with_attachment((&artifact).into()),
                );
                if let Some(cb) = &self.callback {
                    cb.on_artifact_ready(&artifact);
                }
                (Some(artifact), None)
            }
            Err(e) => {
                warn!(session = %self.session.id(), error = %e, "Consolidation failed");
                self.push(Message::error(format!(
                    "The final document could not be generated: {e}. \
You can retry the generation or restart the session."
                )));
                (None, Some(e))
            }
        }
    }

    async fn build_artifact(&self) -> Result<Artifact, ConsolidationError> {
        let kind = self.session.kind();
        let front = self.session.front().file().cloned();
        let back = self.session.back().file().cloned();
        let missing = |side: &str| ConsolidationError::MissingSide {
            side: side.to_string(),
        };

        match self.session.completion() {
            Some(Completion::Original) => {
                let file = front.ok_or_else(|| missing("front"))?;
                Ok(Artifact::pdf(
                    Artifact::file_name_for(kind),
                    file.data,
                    ArtifactSource::Original,
                ))
            }
            Some(Completion::SingleFull) => {
                let file = front.ok_or_else(|| missing("front"))?;
                self.consolidator.consolidate_single_full(&file, kind).await
            }
            Some(Completion::TwoSided) => {
                let front = front.ok_or_else(|| missing("front"))?;
                let back = back.ok_or_else(|| missing("back"))?;
                self.consolidator.consolidate(&front, &back, kind).await
            }
            None => Err(missing("front")),
        }
    }

    /// Abandon the session and start over.
    ///
    /// Clears both slots, the artifact, the counters and the transcript, and
    /// bumps the generation so in-flight results are discarded.
    pub fn restart(&mut self) {
        let from = self.state();
        self.session.reset();
        self.log.clear();
        self.needs_review = false;
        info!(
            session = %self.session.id(),
            generation = self.session.generation(),
            "Session restarted"
        );
        if from != FlowState::AwaitingFirst {
            if let Some(cb) = &self.callback {
                cb.on_state_change(from, FlowState::AwaitingFirst);
            }
        }
        self.say(GREETING);
    }

    fn reject(&mut self, reason: RejectReason, text: String, back_to: FlowState) -> SubmitOutcome {
        self.push(Message::error(text));
        self.session.consecutive_rejections += 1;
        let rejections = self.session.consecutive_rejections;
        info!(
            session = %self.session.id(),
            reason = ?reason,
            rejections,
            "Submission rejected"
        );

        if let Some(limit) = self.config.max_consecutive_rejections {
            if rejections >= limit {
                warn!(session = %self.session.id(), rejections, "Rejection limit reached");
                self.push(Message::error(format!(
                    "{rejections} submissions in a row were rejected. Please restart the session."
                )));
                self.transition(FlowState::Error);
                return SubmitOutcome::Failed { rejections };
            }
        }

        self.transition(back_to);
        SubmitOutcome::Rejected(reason)
    }

    fn transition(&mut self, to: FlowState) {
        let from = self.session.state;
        if from == to {
            return;
        }
        debug!(from = %from, to = %to, "State change");
        self.session.state = to;
        self.session.touch();
        if let Some(cb) = &self.callback {
            cb.on_state_change(from, to);
        }
    }

    fn say(&mut self, text: impl Into<String>) {
        self.push(Message::assistant(text));
    }

    fn say_feedback(&mut self, feedback: &str) {
        if !feedback.trim().is_empty() {
            self.say(feedback.trim());
        }
    }

    fn push(&mut self, message: Message) {
        let message = self.log.push(message);
        if let Some(cb) = &self.callback {
            cb.on_message(message);
        }
    }
}

const INVALID_FALLBACK: &str = "The file does not look like a valid identity document. \
Please send a photo of the document.";
const ILLEGIBLE_FALLBACK: &str = "The image is not legible. Please send a sharper, well-lit photo.";

fn feedback_or(feedback: &str, fallback: &str) -> String {
    let feedback = feedback.trim();
    if feedback.is_empty() {
        fallback.to_string()
    } else {
        feedback.to_string()
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(ClassificationResult);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _request: ClassificationRequest<'_>) -> ClassificationResult {
            self.0.clone()
        }
    }

    struct NoPdf;

    #[async_trait]
    impl Consolidator for NoPdf {
        async fn consolidate(
            &self,
            _front: &SubmittedFile,
            _back: &SubmittedFile,
            _kind: DocumentKind,
        ) -> Result<Artifact, ConsolidationError> {
            Err(ConsolidationError::EngineUnavailable {
                detail: "test".into(),
            })
        }

        async fn consolidate_single_full(
            &self,
            _full: &SubmittedFile,
            _kind: DocumentKind,
        ) -> Result<Artifact, ConsolidationError> {
            Err(ConsolidationError::EngineUnavailable {
                detail: "test".into(),
            })
        }
    }

    fn machine(result: ClassificationResult) -> IntakeMachine {
        IntakeMachine::new(
            Arc::new(Fixed(result)),
            Arc::new(NoPdf),
            IntakeConfig::default(),
        )
    }

    fn jpeg(name: &str) -> SubmittedFile {
        SubmittedFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    #[test]
    fn new_machine_greets() {
        let m = machine(ClassificationResult::failed("x"));
        assert_eq!(m.state(), FlowState::AwaitingFirst);
        assert_eq!(m.log().len(), 1);
        assert!(m.log().messages()[0].text.contains("FRONT"));
    }

    #[test]
    fn begin_locks_the_machine() {
        let mut m = machine(ClassificationResult::failed("x"));
        let ticket = m.begin(jpeg("a.jpg"), false).unwrap();
        assert_eq!(ticket.phase(), Phase::First);
        assert_eq!(ticket.expected_side(), Some(DocumentSide::Front));
        assert_eq!(m.state(), FlowState::AnalyzingFirst);

        let err = m.begin(jpeg("b.jpg"), false).unwrap_err();
        assert!(matches!(
            err,
            IntakeError::NotAccepting {
                state: FlowState::AnalyzingFirst
            }
        ));
    }

    #[tokio::test]
    async fn superseded_ticket_is_discarded() {
        let mut m = machine(ClassificationResult::accepted(
            DocumentKind::CedulaCiudadania,
            DocumentSide::Front,
            "",
        ));
        let old = m.begin(jpeg("old.jpg"), false).unwrap();
        let replay = old.clone();
        let outcome = m.resolve(old, ClassificationResult::failed("blurry")).await;
        assert!(matches!(outcome, SubmitOutcome::Rejected(RejectReason::Invalid)));

        let new = m.begin(jpeg("new.jpg"), false).unwrap();
        assert_eq!(new.generation(), replay.generation());
        let accepted = ClassificationResult::accepted(
            DocumentKind::CedulaCiudadania,
            DocumentSide::Front,
            "",
        );
        let outcome = m.resolve(replay, accepted.clone()).await;
        assert!(matches!(outcome, SubmitOutcome::Discarded));
        assert_eq!(m.state(), FlowState::AnalyzingFirst);
        assert!(m.session().front().file().is_none());

        let outcome = m.resolve(new, accepted).await;
        assert!(matches!(outcome, SubmitOutcome::AwaitingSecond { .. }));
        assert_eq!(m.session().front().file().map(|f| f.name.as_str()), Some("new.jpg"));
    }

    #[test]
    fn pdf_signature_marks_ticket_multi_page() {
        let mut m = machine(ClassificationResult::failed("x"));
        let pdf = SubmittedFile::new("doc", "application/octet-stream", b"%PDF-1.4".to_vec());
        let ticket = m.begin(pdf, false).unwrap();
        assert!(ticket.is_multi_page());
    }

    #[tokio::test]
    async fn original_pdf_completion_skips_the_port() {
        let mut m = machine(ClassificationResult::accepted(
            DocumentKind::RegistroCivilNacimiento,
            DocumentSide::Full,
            "",
        ));
        let pdf = SubmittedFile::new("registro", "application/pdf", b"%PDF-1.7 body".to_vec());
        let outcome = m.submit(pdf, true).await.unwrap();

        let artifact = outcome.artifact().expect("artifact");
        assert_eq!(artifact.source, ArtifactSource::Original);
        assert!(artifact.file_name.starts_with("registro_civil_nacimiento_"));
        assert!(artifact.file_name.ends_with(".pdf"));
        assert_eq!(&*artifact.data, b"%PDF-1.7 body");
        assert_eq!(m.state(), FlowState::Completed);
    }

    #[tokio::test]
    async fn consolidation_failure_leaves_completed_without_artifact() {
        let mut m = machine(ClassificationResult::accepted(
            DocumentKind::CedulaCiudadania,
            DocumentSide::Full,
            "",
        ));
        let outcome = m.submit(jpeg("both.jpg"), false).await.unwrap();
        match outcome {
            SubmitOutcome::Completed {
                artifact, failure, ..
            } => {
                assert!(artifact.is_none());
                assert!(matches!(
                    failure,
                    Some(ConsolidationError::EngineUnavailable { .. })
                ));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(m.state(), FlowState::Completed);
        assert!(m.log().last().unwrap().is_error);
    }

    #[test]
    fn helpers() {
        assert_eq!(capitalise("front"), "Front");
        assert_eq!(feedback_or("  ", "fallback"), "fallback");
    }
}
