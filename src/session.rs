//! Session state owned by the intake machine.
//!
//! A [`Session`] is the aggregate of the flow position, the two side slots
//! and the final artifact. Only [`crate::machine::IntakeMachine`] mutates it;
//! [`Session::reset`] is the single path back to the initial state.

use crate::model::{
    Artifact, DocumentKind, DocumentSide, ExtractedData, FlowState, SubmittedFile,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Storage cell for one face of the document.
#[derive(Debug, Clone, Default)]
pub struct SideSlot {
    file: Option<SubmittedFile>,
    extracted: ExtractedData,
}

impl SideSlot {
    pub fn is_occupied(&self) -> bool {
        self.file.is_some()
    }

    pub fn file(&self) -> Option<&SubmittedFile> {
        self.file.as_ref()
    }

    pub fn extracted(&self) -> &ExtractedData {
        &self.extracted
    }

    pub(crate) fn fill(&mut self, file: SubmittedFile, extracted: ExtractedData) {
        debug_assert!(self.file.is_none(), "slot filled twice");
        self.file = Some(file);
        self.extracted = extracted;
    }
}

/// How the artifact of a completed session is (re)produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The submitted multi-page document is the artifact.
    Original,
    /// `front` holds one image showing both sides.
    SingleFull,
    /// `front` and `back` hold one side each.
    TwoSided,
}

/// One end-to-end intake attempt.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    generation: u64,
    pub(crate) state: FlowState,
    pub(crate) front: SideSlot,
    pub(crate) back: SideSlot,
    pub(crate) kind: DocumentKind,
    pub(crate) final_artifact: Option<Artifact>,
    pub(crate) completion: Option<Completion>,
    pub(crate) consecutive_rejections: u32,
    created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            generation: 0,
            state: FlowState::AwaitingFirst,
            front: SideSlot::default(),
            back: SideSlot::default(),
            kind: DocumentKind::Unknown,
            final_artifact: None,
            completion: None,
            consecutive_rejections: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Incremented by every restart; tags in-flight classifications.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn front(&self) -> &SideSlot {
        &self.front
    }

    pub fn back(&self) -> &SideSlot {
        &self.back
    }

    pub fn slot(&self, side: DocumentSide) -> Option<&SideSlot> {
        match side {
            DocumentSide::Front => Some(&self.front),
            DocumentSide::Back => Some(&self.back),
            _ => None,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn final_artifact(&self) -> Option<&Artifact> {
        self.final_artifact.as_ref()
    }

    pub fn completion(&self) -> Option<Completion> {
        self.completion
    }

    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections
    }

    /// The side still missing while awaiting the second submission.
    ///
    /// `back` when the front slot is occupied, otherwise `front`.
    pub fn missing_side(&self) -> DocumentSide {
        if self.front.is_occupied() {
            DocumentSide::Back
        } else {
            DocumentSide::Front
        }
    }

    pub(crate) fn slot_mut(&mut self, side: DocumentSide) -> &mut SideSlot {
        match side {
            DocumentSide::Back => &mut self.back,
            _ => &mut self.front,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Clear every field back to its initial value and bump the generation.
    ///
    /// The id is kept: a restart continues the same interaction.
    pub(crate) fn reset(&mut self) {
        let generation = self.generation + 1;
        let id = self.id;
        let created_at = self.created_at;
        *self = Self {
            id,
            generation,
            created_at,
            ..Self::new()
        };
    }

    /// Serializable summary for status displays.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.to_string(),
            flow_state: self.state,
            document_type: self.kind,
            sides_received: SidesReceived {
                front: self.front.file().map(|f| f.name.clone()),
                back: self.back.file().map(|f| f.name.clone()),
            },
            has_artifact: self.final_artifact.is_some(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// File names currently held in the slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidesReceived {
    pub front: Option<String>,
    pub back: Option<String>,
}

/// Point-in-time view of a [`Session`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub flow_state: FlowState,
    pub document_type: DocumentKind,
    pub sides_received: SidesReceived,
    pub has_artifact: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> SubmittedFile {
        SubmittedFile::new(name, "image/jpeg", vec![0xFF, 0xD8])
    }

    #[test]
    fn new_session_is_empty() {
        let s = Session::new();
        assert_eq!(s.state(), FlowState::AwaitingFirst);
        assert!(!s.front().is_occupied());
        assert!(!s.back().is_occupied());
        assert!(s.final_artifact().is_none());
        assert_eq!(s.generation(), 0);
    }

    #[test]
    fn missing_side_follows_front_slot() {
        let mut s = Session::new();
        assert_eq!(s.missing_side(), DocumentSide::Front);
        s.slot_mut(DocumentSide::Front)
            .fill(file("front.jpg"), ExtractedData::default());
        assert_eq!(s.missing_side(), DocumentSide::Back);
    }

    #[test]
    fn slot_lookup_by_side() {
        let mut s = Session::new();
        s.slot_mut(DocumentSide::Back)
            .fill(file("back.jpg"), ExtractedData::default());
        assert!(s.slot(DocumentSide::Back).is_some_and(|slot| slot.is_occupied()));
        assert!(!s.slot(DocumentSide::Front).is_some_and(|slot| slot.is_occupied()));
        assert!(s.slot(DocumentSide::Full).is_none());
        assert!(s.slot(DocumentSide::Unknown).is_none());
    }

    #[test]
    fn reset_clears_slots_and_bumps_generation() {
        let mut s = Session::new();
        let id = s.id();
        s.slot_mut(DocumentSide::Back)
            .fill(file("back.jpg"), ExtractedData::default());
        s.state = FlowState::AwaitingSecond;
        s.kind = DocumentKind::CedulaCiudadania;

        s.reset();
        assert_eq!(s.id(), id);
        assert_eq!(s.generation(), 1);
        assert_eq!(s.state(), FlowState::AwaitingFirst);
        assert!(!s.back().is_occupied());
        assert_eq!(s.kind(), DocumentKind::Unknown);
    }

    #[test]
    fn snapshot_lists_received_sides() {
        let mut s = Session::new();
        s.slot_mut(DocumentSide::Front)
            .fill(file("front.jpg"), ExtractedData::default());
        let snap = s.snapshot();
        assert_eq!(snap.sides_received.front.as_deref(), Some("front.jpg"));
        assert_eq!(snap.sides_received.back, None);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["flow_state"], "awaiting_first");
    }
}
