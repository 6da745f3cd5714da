use chrono::{DateTime, Local, Utc};
use log::debug;

use crate::error::ServiceResult;
use crate::format;
use crate::models::{
    Contact, ContactId, ContactStatus, Conversation, ConversationId, ConversationKind, Message,
    MessageId,
};
use crate::service::MessageService;

pub fn other_participant(conversation: &Conversation, viewer: ContactId) -> Option<&Contact> {
    conversation.other_participant(viewer)
}

/// Title of a conversation: the group name, else the other participant's name.
pub fn display_name(conversation: &Conversation, viewer: ContactId) -> String {
    match conversation.kind(viewer) {
        ConversationKind::Group { name: Some(name), .. } => name.to_string(),
        ConversationKind::Group { name: None, .. } => other_name(conversation.other_participant(viewer)),
        ConversationKind::OneToOne { other } => other_name(other),
    }
}

fn other_name(other: Option<&Contact>) -> String {
    other.map_or_else(|| "Unknown".to_string(), |c| c.name.clone())
}

/// Groups never show an avatar.
pub fn display_avatar(conversation: &Conversation, viewer: ContactId) -> Option<&str> {
    match conversation.kind(viewer) {
        ConversationKind::Group { .. } => None,
        ConversationKind::OneToOne { other } => other.and_then(|c| c.avatar_url.as_deref()),
    }
}

pub fn display_initials(conversation: &Conversation, viewer: ContactId) -> String {
    match conversation.kind(viewer) {
        ConversationKind::Group { name: Some(name), .. } => format::initials(name),
        ConversationKind::Group { name: None, .. } => other_initials(conversation.other_participant(viewer)),
        ConversationKind::OneToOne { other } => other_initials(other),
    }
}

fn other_initials(other: Option<&Contact>) -> String {
    other.map_or_else(|| "?".to_string(), Contact::initials)
}

/// A group is online as soon as one member other than the viewer is.
pub fn display_status(conversation: &Conversation, viewer: ContactId) -> ContactStatus {
    match conversation.kind(viewer) {
        ConversationKind::Group { participants, .. } => {
            if participants
                .iter()
                .any(|p| p.id != viewer && p.status == ContactStatus::Online)
            {
                ContactStatus::Online
            } else {
                ContactStatus::Offline
            }
        }
        ConversationKind::OneToOne { other } => other.map_or(ContactStatus::Offline, |c| c.status),
    }
}

pub fn last_message_preview(conversation: &Conversation, viewer: ContactId) -> String {
    let Some(last) = conversation.last_message() else {
        return "No messages yet".to_string();
    };
    let prefix = if last.sender_id == viewer || last.sent_by_viewer {
        "You: "
    } else {
        ""
    };
    format!("{}{}", prefix, format::truncate_preview(&last.content))
}

pub fn last_message_time(conversation: &Conversation, now: DateTime<Utc>) -> String {
    match conversation.last_message() {
        Some(last) => format::conversation_time_label(
            &last.timestamp.with_timezone(&Local),
            now.with_timezone(&Local).date_naive(),
        ),
        None => String::new(),
    }
}

/// Newest activity first; conversations without messages go last.
pub fn sort_conversations(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        let newest = |c: &Conversation| c.last_message().map(|m| m.timestamp);
        newest(b).cmp(&newest(a))
    });
}

pub fn matches_search(conversation: &Conversation, viewer: ContactId, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    display_name(conversation, viewer)
        .to_lowercase()
        .contains(&query.to_lowercase())
}

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationListItem {
    pub id: ConversationId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub initials: String,
    pub status_class: &'static str,
    pub last_message_preview: String,
    pub last_message_time: String,
    pub unread_count: u32,
    pub has_avatar: bool,
    pub has_unread: bool,
    pub is_selected: bool,
}

impl ConversationListItem {
    /// Text drawn in place of a missing avatar.
    pub fn no_avatar(&self) -> &str {
        if self.has_avatar {
            ""
        } else {
            &self.initials
        }
    }
}

/// Header shown above the open conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHeader {
    pub name: String,
    pub avatar_url: Option<String>,
    pub initials: String,
    pub status_class: &'static str,
    pub status_text: String,
    pub has_avatar: bool,
}

pub fn chat_header(conversation: &Conversation, viewer: ContactId, now: DateTime<Utc>) -> ChatHeader {
    let avatar_url = display_avatar(conversation, viewer).map(str::to_string);
    ChatHeader {
        name: display_name(conversation, viewer),
        has_avatar: avatar_url.as_deref().is_some_and(|a| !a.is_empty()),
        avatar_url,
        initials: display_initials(conversation, viewer),
        status_class: format::status_class(display_status(conversation, viewer)),
        status_text: conversation
            .other_participant(viewer)
            .map_or_else(|| "Offline".to_string(), |c| c.status_text(now)),
    }
}

/// The sidebar's view of all conversations: ordering, search and selection.
#[derive(Debug, Clone)]
pub struct ConversationList {
    viewer: ContactId,
    conversations: Vec<Conversation>,
    search_text: String,
    selected: Option<ConversationId>,
}

impl ConversationList {
    pub fn new(viewer: ContactId, mut conversations: Vec<Conversation>) -> Self {
        sort_conversations(&mut conversations);
        ConversationList {
            viewer,
            conversations,
            search_text: String::new(),
            selected: None,
        }
    }

    pub async fn load(service: &dyn MessageService) -> ServiceResult<Self> {
        let viewer = service.current_user().id;
        let conversations = service.conversations().await?;
        debug!("Loaded {} conversations", conversations.len());
        Ok(Self::new(viewer, conversations))
    }

    pub fn viewer(&self) -> ContactId {
        self.viewer
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    /// Conversations passing the search filter, in list order.
    pub fn visible(&self) -> Vec<&Conversation> {
        self.conversations
            .iter()
            .filter(|c| matches_search(c, self.viewer, &self.search_text))
            .collect()
    }

    pub fn selected(&self) -> Option<&Conversation> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: ConversationId) -> Option<&Conversation> {
        if self.get(id).is_none() {
            return None;
        }
        self.selected = Some(id);
        self.get(id)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn select_next(&mut self) -> Option<&Conversation> {
        self.step_selection(1)
    }

    pub fn select_previous(&mut self) -> Option<&Conversation> {
        self.step_selection(-1)
    }

    fn step_selection(&mut self, delta: isize) -> Option<&Conversation> {
        let visible: Vec<ConversationId> = self.visible().iter().map(|c| c.id).collect();
        if visible.is_empty() {
            return None;
        }
        let len = visible.len() as isize;
        let next = match self.selected.and_then(|id| visible.iter().position(|v| *v == id)) {
            Some(current) => (current as isize + delta).rem_euclid(len),
            None if delta >= 0 => 0,
            None => len - 1,
        };
        self.select(visible[next as usize])
    }

    /// Re-apply the ordering after messages changed.
    pub fn refresh(&mut self) {
        sort_conversations(&mut self.conversations);
    }

    /// Append `message` to its conversation, or replace the copy with the same id.
    pub fn record_message(&mut self, message: Message) -> bool {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == message.conversation_id) else {
            return false;
        };
        match conversation.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => conversation.messages.push(message),
        }
        self.refresh();
        true
    }

    /// Swap a provisional message for the copy the service acknowledged.
    pub fn replace_message(&mut self, provisional_id: MessageId, message: Message) -> bool {
        if let Some(conversation) = self.conversations.iter_mut().find(|c| c.id == message.conversation_id) {
            conversation.messages.retain(|m| m.id != provisional_id);
        }
        self.record_message(message)
    }

    /// Take a newer delivery snapshot of a message already in the list.
    pub fn apply_delivery_update(&mut self, update: &Message) -> bool {
        let Some(existing) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == update.conversation_id)
            .and_then(|c| c.messages.iter_mut().find(|m| m.id == update.id))
        else {
            return false;
        };
        if existing.delivery_status.advance(update.delivery_status).is_err() {
            return false;
        }
        *existing = Message {
            sent_by_viewer: existing.sent_by_viewer,
            ..update.clone()
        };
        true
    }

    pub fn mark_read_local(&mut self, id: ConversationId) -> bool {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .is_some_and(super::feed::mark_read)
    }

    pub fn display_items(&self, now: DateTime<Utc>) -> Vec<ConversationListItem> {
        self.visible()
            .into_iter()
            .map(|c| {
                let avatar_url = display_avatar(c, self.viewer).map(str::to_string);
                ConversationListItem {
                    id: c.id,
                    name: display_name(c, self.viewer),
                    has_avatar: avatar_url.as_deref().is_some_and(|a| !a.is_empty()),
                    avatar_url,
                    initials: display_initials(c, self.viewer),
                    status_class: format::status_class(display_status(c, self.viewer)),
                    last_message_preview: last_message_preview(c, self.viewer),
                    last_message_time: last_message_time(c, now),
                    unread_count: c.unread_count,
                    has_unread: c.unread_count > 0,
                    is_selected: self.selected == Some(c.id),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn people() -> (Contact, Contact, Contact) {
        (
            Contact::new("Viewer Person", ContactStatus::Online),
            Contact::new("Alice Johnson", ContactStatus::Offline),
            Contact::new("Bob", ContactStatus::Online),
        )
    }

    #[test]
    fn test_one_to_one_display() {
        let (me, mut alice, _) = people();
        alice.avatar_url = Some("alice.png".to_string());
        let conversation = Conversation::new(vec![me.clone(), alice.clone()]);

        assert_eq!(display_name(&conversation, me.id), "Alice Johnson");
        assert_eq!(display_avatar(&conversation, me.id), Some("alice.png"));
        assert_eq!(display_initials(&conversation, me.id), "AJ");
        assert_eq!(display_status(&conversation, me.id), ContactStatus::Offline);
    }

    #[test]
    fn test_conversation_without_other_participant() {
        let (me, _, _) = people();
        let conversation = Conversation::new(vec![me.clone()]);
        assert_eq!(display_name(&conversation, me.id), "Unknown");
        assert_eq!(display_initials(&conversation, me.id), "?");
        assert_eq!(display_status(&conversation, me.id), ContactStatus::Offline);
        assert_eq!(display_avatar(&conversation, me.id), None);
    }

    #[test]
    fn test_group_display() {
        let (me, alice, bob) = people();
        let mut group = Conversation::new(vec![me.clone(), alice.clone(), bob.clone()]);
        group.group_name = Some("book club".to_string());

        assert_eq!(display_name(&group, me.id), "book club");
        assert_eq!(display_initials(&group, me.id), "BC");
        assert_eq!(display_avatar(&group, me.id), None);
        assert_eq!(display_status(&group, me.id), ContactStatus::Online);

        // Unnamed groups fall back to the first other member
        group.group_name = None;
        assert_eq!(display_name(&group, me.id), "Alice Johnson");
        assert_eq!(display_initials(&group, me.id), "AJ");
    }

    #[test]
    fn test_group_status_ignores_viewer() {
        let (me, alice, mut bob) = people();
        bob.status = ContactStatus::Away;
        let group = Conversation::new(vec![me.clone(), alice, bob]);
        assert_eq!(me.status, ContactStatus::Online);
        assert_eq!(display_status(&group, me.id), ContactStatus::Offline);
    }

    #[test]
    fn test_preview_prefix_and_empty() {
        let (me, alice, _) = people();
        let mut conversation = Conversation::new(vec![me.clone(), alice.clone()]);
        assert_eq!(last_message_preview(&conversation, me.id), "No messages yet");
        assert_eq!(last_message_time(&conversation, Utc::now()), "");

        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        conversation.messages.push(Message::text(conversation.id, alice.id, "hello", t));
        assert_eq!(last_message_preview(&conversation, me.id), "hello");

        conversation
            .messages
            .push(Message::text(conversation.id, me.id, "hi back", t + Duration::minutes(1)));
        assert_eq!(last_message_preview(&conversation, me.id), "You: hi back");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (me, alice, _) = people();
        let conversation = Conversation::new(vec![me.clone(), alice]);
        assert!(matches_search(&conversation, me.id, ""));
        assert!(matches_search(&conversation, me.id, "JOHN"));
        assert!(!matches_search(&conversation, me.id, "carol"));
    }

    #[test]
    fn test_selection_wraps_within_visible() {
        let (me, alice, bob) = people();
        let a = Conversation::new(vec![me.clone(), alice]);
        let b = Conversation::new(vec![me.clone(), bob]);
        let mut list = ConversationList::new(me.id, vec![a.clone(), b.clone()]);

        let first = list.select_next().map(|c| c.id);
        let second = list.select_next().map(|c| c.id);
        let wrapped = list.select_next().map(|c| c.id);
        assert_ne!(first, second);
        assert_eq!(first, wrapped);

        list.set_search_text("bob");
        assert_eq!(list.select_next().map(|c| c.id), Some(b.id));
        assert_eq!(list.select_previous().map(|c| c.id), Some(b.id));
    }
}
