// Message service boundary.
// The UI and the projections only ever talk to a `MessageService`; whoever
// implements it owns the canonical contacts, conversations and messages.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::models::{Contact, ContactId, Conversation, ConversationId, Message, MessageDraft};

pub mod mock;

pub use mock::MockMessageService;

/// Notifications pushed by a service after a call has already returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// A fresh snapshot of a message whose delivery status moved on.
    /// Subscribers replace their copy wholesale.
    DeliveryUpdated(Message),
}

#[async_trait]
pub trait MessageService: Send + Sync {
    /// The identity every projection is computed for.
    fn current_user(&self) -> Contact;

    async fn contacts(&self) -> ServiceResult<Vec<Contact>>;

    async fn conversations(&self) -> ServiceResult<Vec<Conversation>>;

    /// Messages of a conversation, in storage order. Unknown ids yield an empty list.
    async fn messages(&self, conversation_id: ConversationId) -> ServiceResult<Vec<Message>>;

    /// Persist a draft. The service assigns id, timestamp and the initial
    /// `Sent` status, and may later publish [`ServiceEvent::DeliveryUpdated`].
    async fn send_message(&self, draft: MessageDraft) -> ServiceResult<Message>;

    /// Clear the unread counter and mark every message read. Unknown ids are ignored.
    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> ServiceResult<()>;

    async fn contact(&self, contact_id: ContactId) -> ServiceResult<Option<Contact>>;
}
