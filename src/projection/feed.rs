use chrono::{DateTime, Local, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::format::{self, DeliveryIndicator};
use crate::models::{
    ContactId, Conversation, ConversationId, DeliveryStatus, Message, MessageDraft, MessageId,
    MessageType,
};
use crate::service::MessageService;

/// Which side of the conversation a bubble is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleSide {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: MessageId,
    pub content: String,
    pub time_label: String,
    pub sender_name: String,
    pub sender_avatar_url: Option<String>,
    pub sender_initials: String,
    pub side: BubbleSide,
    /// Only present on the viewer's own messages.
    pub delivery: Option<DeliveryIndicator>,
    pub has_avatar: bool,
}

impl MessageRow {
    pub fn no_avatar(&self) -> &str {
        if self.has_avatar {
            ""
        } else {
            &self.sender_initials
        }
    }
}

/// Fill the display fields of `messages` for `viewer` and order them oldest first.
///
/// The sort is stable, so messages sharing a timestamp keep their relative order.
pub fn annotate_messages(
    conversation: &Conversation,
    viewer: ContactId,
    mut messages: Vec<Message>,
) -> Vec<Message> {
    for message in messages.iter_mut() {
        message.sent_by_viewer = message.sender_id == viewer;
        if !message.sent_by_viewer {
            let sender = conversation.participant(message.sender_id);
            message.sender_name = sender.map(|s| s.name.clone());
            message.sender_avatar_url = sender.and_then(|s| s.avatar_url.clone());
            message.sender_initials = sender.map(|s| s.initials());
        }
    }
    messages.sort_by_key(|m| m.timestamp);
    messages
}

/// Read receipt: clear the unread counter and mark every message read.
///
/// Returns false, and changes nothing, when there was nothing unread.
pub fn mark_read(conversation: &mut Conversation) -> bool {
    if conversation.unread_count == 0 {
        return false;
    }
    conversation.unread_count = 0;
    for message in conversation.messages.iter_mut() {
        message.is_read = true;
    }
    true
}

/// The open conversation as the message pane shows it.
#[derive(Debug, Clone)]
pub struct MessageFeed {
    viewer: ContactId,
    conversation: Option<Conversation>,
    messages: Vec<Message>,
}

impl MessageFeed {
    /// A feed with no active conversation.
    pub fn empty(viewer: ContactId) -> Self {
        MessageFeed {
            viewer,
            conversation: None,
            messages: Vec::new(),
        }
    }

    pub fn load(viewer: ContactId, mut conversation: Conversation, messages: Vec<Message>) -> Self {
        let messages = annotate_messages(&conversation, viewer, messages);
        conversation.messages = messages.clone();
        debug!(
            "Feed for {} holds {} messages",
            conversation.id,
            messages.len()
        );
        MessageFeed {
            viewer,
            conversation: Some(conversation),
            messages,
        }
    }

    /// Fetch messages for `conversation` and clear its unread state.
    pub async fn open(service: &dyn MessageService, conversation: Conversation) -> ServiceResult<Self> {
        let viewer = service.current_user().id;
        let messages = service.messages(conversation.id).await?;
        let mut feed = Self::load(viewer, conversation, messages);

        if let Some(id) = feed.conversation_id() {
            if feed.mark_read() {
                service.mark_conversation_read(id).await?;
            }
        }
        Ok(feed)
    }

    pub fn viewer(&self) -> ContactId {
        self.viewer
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation.as_ref().map(|c| c.id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn mark_read(&mut self) -> bool {
        let Some(conversation) = self.conversation.as_mut() else {
            return false;
        };
        if !mark_read(conversation) {
            return false;
        }
        for message in self.messages.iter_mut() {
            message.is_read = true;
        }
        true
    }

    /// Optimistically append a message typed by the viewer.
    ///
    /// Returns `None` for blank text or when no conversation is open.
    pub fn begin_send(&mut self, text: &str, now: DateTime<Utc>) -> Option<Message> {
        let content = text.trim();
        if content.is_empty() {
            return None;
        }
        let conversation = self.conversation.as_mut()?;

        let receiver_id = if conversation.is_group() {
            None
        } else {
            conversation.other_participant(self.viewer).map(|c| c.id)
        };
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: self.viewer,
            receiver_id,
            conversation_id: conversation.id,
            content: content.to_string(),
            timestamp: now,
            is_read: false,
            kind: MessageType::Text,
            delivery_status: DeliveryStatus::Sending,
            sent_by_viewer: true,
            sender_name: None,
            sender_avatar_url: None,
            sender_initials: None,
        };

        conversation.messages.push(message.clone());
        self.messages.push(message.clone());
        Some(message)
    }

    /// Replace the provisional message with the service's acknowledged copy.
    pub fn confirm_sent(&mut self, provisional_id: MessageId, echo: Message) -> Option<&Message> {
        let mut confirmed = echo;
        confirmed.sent_by_viewer = true;
        if confirmed.delivery_status == DeliveryStatus::Sending {
            confirmed.delivery_status = DeliveryStatus::Sent;
        }

        if let Some(conversation) = self.conversation.as_mut() {
            if let Some(slot) = conversation.messages.iter_mut().find(|m| m.id == provisional_id) {
                *slot = confirmed.clone();
            }
        }
        let index = self.messages.iter().position(|m| m.id == provisional_id)?;
        self.messages[index] = confirmed;
        self.messages.get(index)
    }

    pub fn fail_send(&mut self, provisional_id: MessageId) -> Option<&Message> {
        self.set_status(provisional_id, DeliveryStatus::Failed)
    }

    /// Both phases of a send: optimistic append, then the service's echo.
    ///
    /// A service error leaves the message in the feed marked `Failed`.
    pub async fn send(&mut self, service: &dyn MessageService, text: &str) -> Option<Message> {
        let provisional = self.begin_send(text, Utc::now())?;
        let draft = MessageDraft {
            conversation_id: provisional.conversation_id,
            sender_id: provisional.sender_id,
            receiver_id: provisional.receiver_id,
            content: provisional.content.clone(),
        };

        match service.send_message(draft).await {
            Ok(echo) => {
                info!("Message {} acknowledged as {}", provisional.id, echo.id);
                self.confirm_sent(provisional.id, echo).cloned()
            }
            Err(e) => {
                warn!("Sending message {} failed: {}", provisional.id, e);
                self.fail_send(provisional.id).cloned()
            }
        }
    }

    /// Take a newer snapshot of a message pushed by the service.
    pub fn apply_delivery_update(&mut self, update: &Message) -> bool {
        if self.conversation_id() != Some(update.conversation_id) {
            return false;
        }
        match self.set_status(update.id, update.delivery_status) {
            Some(_) => true,
            None => {
                debug!("Delivery update for {} not applied", update.id);
                false
            }
        }
    }

    fn set_status(&mut self, id: MessageId, status: DeliveryStatus) -> Option<&Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        let current = self.messages[index].delivery_status;
        let next = match current.advance(status) {
            Ok(next) => next,
            Err(e) => {
                warn!("Message {}: {}", id, e);
                return None;
            }
        };

        let updated = Message {
            delivery_status: next,
            ..self.messages[index].clone()
        };
        if let Some(conversation) = self.conversation.as_mut() {
            if let Some(slot) = conversation.messages.iter_mut().find(|m| m.id == id) {
                *slot = updated.clone();
            }
        }
        self.messages[index] = updated;
        self.messages.get(index)
    }

    pub fn rows(&self, now: DateTime<Utc>) -> Vec<MessageRow> {
        let today = now.with_timezone(&Local).date_naive();
        self.messages
            .iter()
            .map(|m| {
                let sender_avatar_url = m.sender_avatar_url.clone();
                MessageRow {
                    id: m.id,
                    content: m.content.clone(),
                    time_label: format::message_timestamp_label(&m.timestamp.with_timezone(&Local), today),
                    sender_name: m.sender_name.clone().unwrap_or_default(),
                    has_avatar: sender_avatar_url.as_deref().is_some_and(|a| !a.is_empty()),
                    sender_avatar_url,
                    sender_initials: m.sender_initials.clone().unwrap_or_else(|| "?".to_string()),
                    side: if m.sent_by_viewer {
                        BubbleSide::Sent
                    } else {
                        BubbleSide::Received
                    },
                    delivery: m
                        .sent_by_viewer
                        .then(|| format::delivery_indicator(m.delivery_status)),
                }
            })
            .collect()
    }
}
