//! The conversation transcript shown to the user.
//!
//! Append-only: messages are never edited or reordered, and their order is
//! the order in which the state machine produced them.

use crate::model::{Artifact, SubmittedFile};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A file referenced by a message (a submission or the final PDF).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size: usize,
}

impl From<&SubmittedFile> for Attachment {
    fn from(file: &SubmittedFile) -> Self {
        Self {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.len(),
        }
    }
}

impl From<&Artifact> for Attachment {
    fn from(artifact: &Artifact) -> Self {
        Self {
            name: artifact.file_name.clone(),
            mime_type: artifact.mime_type.clone(),
            size: artifact.len(),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub is_error: bool,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            attachment: None,
            is_error: false,
            at: Utc::now(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(text)
        }
    }

    pub fn user_upload(file: &SubmittedFile) -> Self {
        Self {
            role: Role::User,
            text: file.name.clone(),
            attachment: Some(file.into()),
            is_error: false,
            at: Utc::now(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Ordered, append-only list of messages.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a reference to it.
    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_error).count()
    }

    /// Drop the whole transcript. Only a session restart does this.
    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut log = ConversationLog::new();
        log.push(Message::assistant("one"));
        log.push(Message::error("two"));
        log.push(Message::assistant("three"));

        let texts: Vec<&str> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn upload_message_carries_attachment() {
        let file = SubmittedFile::new("front.jpg", "image/jpeg", vec![1, 2, 3]);
        let msg = Message::user_upload(&file);
        assert_eq!(msg.role, Role::User);
        let att = msg.attachment.expect("attachment");
        assert_eq!(att.size, 3);
        assert_eq!(att.mime_type, "image/jpeg");
    }

    #[test]
    fn serialises_as_array() {
        let mut log = ConversationLog::new();
        log.push(Message::assistant("hi"));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "assistant");
        assert_eq!(json[0]["is_error"], false);
    }
}
