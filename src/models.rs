use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::format;

pub type ContactId = Uuid;
pub type ConversationId = Uuid;
pub type MessageId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub status: ContactStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, status: ContactStatus) -> Self {
        Contact {
            id: Uuid::new_v4(),
            name: name.into(),
            avatar_url: None,
            status,
            last_seen: None,
            email: None,
        }
    }

    pub fn initials(&self) -> String {
        format::initials(&self.name)
    }

    pub fn status_class(&self) -> &'static str {
        format::status_class(self.status)
    }

    /// Presence line shown under the contact's name, e.g. "Last seen 2h ago".
    pub fn status_text(&self, now: DateTime<Utc>) -> String {
        format::status_label(self.status, self.last_seen, now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactStatus {
    Online,
    Away,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    System,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub enum DeliveryStatus {
    Sending = 0,   // Handed to the service, not yet acknowledged
    Sent = 1,      // Accepted by the service
    Delivered = 2, // Delivered to recipient's device
    Read = 3,      // Read by recipient
    Failed = 4,    // Failed to send
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Read | DeliveryStatus::Failed)
    }

    /// Validate a status change.
    ///
    /// Progress only moves forward along `Sending -> Sent -> Delivered -> Read`
    /// (steps may be skipped), and `Failed` is reachable from any non-terminal
    /// state. Re-applying the current status is accepted so duplicate
    /// notifications are harmless.
    pub fn advance(self, to: DeliveryStatus) -> Result<DeliveryStatus, DeliveryError> {
        if self == to {
            return Ok(to);
        }
        let valid = match (self, to) {
            (from, _) if from.is_terminal() => false,
            (_, DeliveryStatus::Failed) => true,
            (from, to) => (to as u8) > (from as u8),
        };
        if valid {
            Ok(to)
        } else {
            Err(DeliveryError::InvalidTransition { from: self, to })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: ContactId,
    pub receiver_id: Option<ContactId>,
    pub conversation_id: ConversationId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub kind: MessageType,
    pub delivery_status: DeliveryStatus,

    // Display-only, filled in by the feed projection
    pub sent_by_viewer: bool,
    pub sender_name: Option<String>,
    pub sender_avatar_url: Option<String>,
    pub sender_initials: Option<String>,
}

impl Message {
    pub fn text(
        conversation_id: ConversationId,
        sender_id: ContactId,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id: None,
            conversation_id,
            content: content.into(),
            timestamp,
            is_read: false,
            kind: MessageType::Text,
            delivery_status: DeliveryStatus::Sent,
            sent_by_viewer: false,
            sender_name: None,
            sender_avatar_url: None,
            sender_initials: None,
        }
    }
}

/// What the composer hands to the message service.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub conversation_id: ConversationId,
    pub sender_id: ContactId,
    pub receiver_id: Option<ContactId>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<Contact>,
    pub messages: Vec<Message>,
    pub unread_count: u32,
    pub group_name: Option<String>,
}

/// How a conversation presents itself to a given viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversationKind<'a> {
    OneToOne {
        other: Option<&'a Contact>,
    },
    Group {
        name: Option<&'a str>,
        participants: &'a [Contact],
    },
}

impl Conversation {
    pub fn new(participants: Vec<Contact>) -> Self {
        Conversation {
            id: Uuid::new_v4(),
            participants,
            messages: Vec::new(),
            unread_count: 0,
            group_name: None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.participants.len() > 2
    }

    /// First participant that is not the viewer.
    pub fn other_participant(&self, viewer: ContactId) -> Option<&Contact> {
        self.participants.iter().find(|p| p.id != viewer)
    }

    pub fn participant(&self, id: ContactId) -> Option<&Contact> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn kind(&self, viewer: ContactId) -> ConversationKind<'_> {
        if self.is_group() {
            ConversationKind::Group {
                name: self.group_name.as_deref().filter(|n| !n.is_empty()),
                participants: &self.participants,
            }
        } else {
            ConversationKind::OneToOne {
                other: self.other_participant(viewer),
            }
        }
    }

    /// Newest message; equal timestamps resolve to the greater message id.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
    }
}
