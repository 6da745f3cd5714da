// In-memory message service with generated sample data.
// All state lives in one `Store` behind a tokio mutex; delivery progression
// runs in spawned tasks and publishes message snapshots on a channel.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use uuid::{Builder, Uuid};

use super::{MessageService, ServiceEvent};
use crate::config::{DeliverySettings, Settings};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    Contact, ContactId, ContactStatus, Conversation, ConversationId, DeliveryStatus, Message,
    MessageDraft, MessageId, MessageType,
};

const EVENT_CHANNEL_CAPACITY: usize = 100;

// (content, authored by the current user)
const SAMPLE_THREAD: &[(&str, bool)] = &[
    ("Hey! How's it going?", false),
    ("Hi! I'm doing great, thanks for asking!", true),
    ("Did you see the latest project updates?", false),
    ("Yes, I just reviewed them. Looks good!", true),
    ("Should we schedule a call to discuss?", false),
    ("Sure, I'm free tomorrow afternoon.", true),
    ("Perfect! Let's do 3 PM.", false),
    ("Sounds good to me!", true),
    ("Looking forward to it!", false),
];

const SAMPLE_GROUP_THREAD: &[&str] = &[
    "Who's bringing snacks on Saturday?",
    "I can grab some fruit and trail mix.",
    "Weather looks clear, trailhead at 8?",
    "Works for me, see you all there!",
];

struct Store {
    current_user: Contact,
    contacts: Vec<Contact>,
    // Conversations are kept without messages; those live in `messages`.
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

impl Store {
    fn snapshot(&self, conversation: &Conversation) -> Conversation {
        Conversation {
            messages: self.messages.get(&conversation.id).cloned().unwrap_or_default(),
            ..conversation.clone()
        }
    }

    fn find_contact(&self, id: ContactId) -> Option<&Contact> {
        if self.current_user.id == id {
            return Some(&self.current_user);
        }
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Move a stored message to `status`, returning the new snapshot.
    fn update_status(
        &mut self,
        conversation_id: ConversationId,
        message_id: MessageId,
        status: DeliveryStatus,
    ) -> Option<Message> {
        let stored = self
            .messages
            .get_mut(&conversation_id)?
            .iter_mut()
            .find(|m| m.id == message_id)?;

        match stored.delivery_status.advance(status) {
            Ok(next) => {
                let mut updated = stored.clone();
                updated.delivery_status = next;
                *stored = updated.clone();
                Some(updated)
            }
            Err(e) => {
                warn!("Ignoring status change for message {}: {}", message_id, e);
                None
            }
        }
    }
}

pub struct MockMessageService {
    store: Arc<TokioMutex<Store>>,
    current_user: Contact,
    delivery: DeliverySettings,
    // Failure rolls, seeded alongside the sample data
    failure_rng: TokioMutex<StdRng>,
    event_tx: mpsc::Sender<ServiceEvent>,
}

impl MockMessageService {
    /// Build a service populated with sample data.
    ///
    /// The returned receiver carries delivery updates for sent messages.
    pub fn new(settings: &Settings) -> (Self, mpsc::Receiver<ServiceEvent>) {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut current_user = Contact::new(settings.user.name.clone(), ContactStatus::Online);
        current_user.id = random_id(&mut rng);
        current_user.email = settings.user.email.clone();

        let contacts = sample_contacts(&mut rng);
        let mut store = Store {
            current_user: current_user.clone(),
            contacts,
            conversations: Vec::new(),
            messages: HashMap::new(),
        };
        populate_conversations(&mut store, &mut rng);

        info!(
            "Mock service ready: {} contacts, {} conversations",
            store.contacts.len(),
            store.conversations.len()
        );
        let failure_rng = StdRng::seed_from_u64(rng.gen());
        Self::from_parts(store, settings.delivery.clone(), failure_rng)
    }

    /// Build a service over caller-supplied data, with no generated content.
    pub fn with_data(
        current_user: Contact,
        contacts: Vec<Contact>,
        conversations: Vec<Conversation>,
        delivery: DeliverySettings,
    ) -> (Self, mpsc::Receiver<ServiceEvent>) {
        let mut messages = HashMap::new();
        let conversations = conversations
            .into_iter()
            .map(|mut conversation| {
                messages.insert(conversation.id, std::mem::take(&mut conversation.messages));
                conversation
            })
            .collect();

        let store = Store {
            current_user,
            contacts,
            conversations,
            messages,
        };
        Self::from_parts(store, delivery, StdRng::from_entropy())
    }

    fn from_parts(
        store: Store,
        delivery: DeliverySettings,
        failure_rng: StdRng,
    ) -> (Self, mpsc::Receiver<ServiceEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let current_user = store.current_user.clone();
        (
            Self {
                store: Arc::new(TokioMutex::new(store)),
                current_user,
                delivery,
                failure_rng: TokioMutex::new(failure_rng),
                event_tx,
            },
            event_rx,
        )
    }

    /// Decide up front whether the next sent message will fail delivery.
    async fn roll_failure(&self) -> bool {
        let mut rng = self.failure_rng.lock().await;
        rng.gen::<f64>() < self.delivery.failure_rate
    }

    /// Advance a freshly sent message through `Delivered` and `Read`, or to
    /// `Failed` when `fails` is set.
    fn spawn_delivery_progression(&self, conversation_id: ConversationId, message_id: MessageId, fails: bool) {
        let store = self.store.clone();
        let event_tx = self.event_tx.clone();
        let steps = delivery_steps(&self.delivery, fails);

        tokio::spawn(async move {
            for (delay_ms, target) in steps {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                let snapshot = {
                    let mut store = store.lock().await;
                    store.update_status(conversation_id, message_id, target)
                };
                let Some(snapshot) = snapshot else {
                    break;
                };

                info!("Message {} is now {:?}", message_id, snapshot.delivery_status);
                let terminal = snapshot.delivery_status.is_terminal();
                if let Err(e) = event_tx.send(ServiceEvent::DeliveryUpdated(snapshot)).await {
                    debug!("No listener for delivery update of {}: {}", message_id, e);
                    break;
                }
                if terminal {
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl MessageService for MockMessageService {
    fn current_user(&self) -> Contact {
        self.current_user.clone()
    }

    async fn contacts(&self) -> ServiceResult<Vec<Contact>> {
        Ok(self.store.lock().await.contacts.clone())
    }

    async fn conversations(&self) -> ServiceResult<Vec<Conversation>> {
        let store = self.store.lock().await;
        Ok(store.conversations.iter().map(|c| store.snapshot(c)).collect())
    }

    async fn messages(&self, conversation_id: ConversationId) -> ServiceResult<Vec<Message>> {
        let store = self.store.lock().await;
        Ok(store.messages.get(&conversation_id).cloned().unwrap_or_default())
    }

    async fn send_message(&self, draft: MessageDraft) -> ServiceResult<Message> {
        if self.event_tx.is_closed() {
            error!("Send attempted after event channel closed");
            return Err(ServiceError::ChannelClosed);
        }

        let message = {
            let mut store = self.store.lock().await;
            let sender = store.find_contact(draft.sender_id).cloned();

            let message = Message {
                id: Uuid::new_v4(),
                sender_id: draft.sender_id,
                receiver_id: draft.receiver_id,
                conversation_id: draft.conversation_id,
                content: draft.content,
                timestamp: Utc::now(),
                is_read: false,
                kind: MessageType::Text,
                delivery_status: DeliveryStatus::Sent,
                sent_by_viewer: draft.sender_id == store.current_user.id,
                sender_initials: sender.as_ref().map(Contact::initials),
                sender_avatar_url: sender.as_ref().and_then(|s| s.avatar_url.clone()),
                sender_name: sender.map(|s| s.name),
            };

            store
                .messages
                .entry(message.conversation_id)
                .or_default()
                .push(message.clone());
            message
        };

        info!("Stored message {} in conversation {}", message.id, message.conversation_id);
        let fails = self.roll_failure().await;
        self.spawn_delivery_progression(message.conversation_id, message.id, fails);
        Ok(message)
    }

    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> ServiceResult<()> {
        let mut store = self.store.lock().await;
        let Some(conversation) = store.conversations.iter_mut().find(|c| c.id == conversation_id) else {
            debug!("mark read: unknown conversation {}", conversation_id);
            return Ok(());
        };
        conversation.unread_count = 0;

        if let Some(messages) = store.messages.get_mut(&conversation_id) {
            for message in messages.iter_mut() {
                message.is_read = true;
            }
        }
        debug!("Conversation {} marked read", conversation_id);
        Ok(())
    }

    async fn contact(&self, contact_id: ContactId) -> ServiceResult<Option<Contact>> {
        let store = self.store.lock().await;
        Ok(store.contacts.iter().find(|c| c.id == contact_id).cloned())
    }
}

// Failure can only strike before delivery; a delivered message always goes on to Read.
fn delivery_steps(delivery: &DeliverySettings, fails: bool) -> Vec<(u64, DeliveryStatus)> {
    if fails {
        vec![(delivery.sent_to_delivered_ms, DeliveryStatus::Failed)]
    } else {
        vec![
            (delivery.sent_to_delivered_ms, DeliveryStatus::Delivered),
            (delivery.delivered_to_read_ms, DeliveryStatus::Read),
        ]
    }
}

fn random_id(rng: &mut StdRng) -> Uuid {
    Builder::from_random_bytes(rng.gen()).into_uuid()
}

fn sample_contacts(rng: &mut StdRng) -> Vec<Contact> {
    let now = Utc::now();
    let people: [(&str, ContactStatus, ChronoDuration); 7] = [
        ("Alice Johnson", ContactStatus::Online, ChronoDuration::zero()),
        ("Bob Smith", ContactStatus::Away, ChronoDuration::minutes(15)),
        ("Carol Williams", ContactStatus::Busy, ChronoDuration::minutes(5)),
        ("David Brown", ContactStatus::Offline, ChronoDuration::hours(2)),
        ("Emma Davis", ContactStatus::Online, ChronoDuration::zero()),
        ("Frank Miller", ContactStatus::Offline, ChronoDuration::days(1)),
        ("Grace Wilson", ContactStatus::Online, ChronoDuration::zero()),
    ];

    people
        .into_iter()
        .map(|(name, status, seen_ago)| {
            let mut contact = Contact::new(name, status);
            contact.id = random_id(rng);
            contact.last_seen = Some(now - seen_ago);
            contact.email = Some(format!("{}@example.com", name.to_lowercase().replace(' ', ".")));
            contact
        })
        .collect()
}

fn populate_conversations(store: &mut Store, rng: &mut StdRng) {
    let now = Utc::now();
    let me = store.current_user.clone();

    for contact in store.contacts.clone() {
        let mut conversation = Conversation::new(vec![me.clone(), contact.clone()]);
        conversation.id = random_id(rng);
        if contact.status == ContactStatus::Online {
            conversation.unread_count = rng.gen_range(0..4);
        }

        let base = now - ChronoDuration::hours(rng.gen_range(1..48));
        let count = rng.gen_range(3..SAMPLE_THREAD.len());
        let messages = SAMPLE_THREAD[..count]
            .iter()
            .enumerate()
            .map(|(i, (content, mine))| {
                let sender = if *mine { &me } else { &contact };
                let offset = ChronoDuration::minutes(i as i64 * rng.gen_range(5..30));
                let mut message = Message::text(conversation.id, sender.id, *content, base + offset);
                message.id = random_id(rng);
                message.receiver_id = Some(if *mine { contact.id } else { me.id });
                message.is_read = true;
                message.delivery_status = if *mine {
                    DeliveryStatus::Read
                } else {
                    DeliveryStatus::Delivered
                };
                message
            })
            .collect();

        store.messages.insert(conversation.id, messages);
        store.conversations.push(conversation);
    }

    let hikers: Vec<Contact> = store
        .contacts
        .iter()
        .filter(|c| matches!(c.name.as_str(), "Alice Johnson" | "Emma Davis" | "Grace Wilson"))
        .cloned()
        .collect();
    let mut group = Conversation::new(std::iter::once(me.clone()).chain(hikers.clone()).collect());
    group.id = random_id(rng);
    group.group_name = Some("Weekend Hikers".to_string());
    group.unread_count = 1;

    let base = now - ChronoDuration::hours(rng.gen_range(1..6));
    let messages = SAMPLE_GROUP_THREAD
        .iter()
        .zip(hikers.iter().cycle())
        .enumerate()
        .map(|(i, (content, sender))| {
            let mut message = Message::text(
                group.id,
                sender.id,
                *content,
                base + ChronoDuration::minutes(i as i64 * 7),
            );
            message.id = random_id(rng);
            message.is_read = i + 1 < SAMPLE_GROUP_THREAD.len();
            message.delivery_status = DeliveryStatus::Delivered;
            message
        })
        .collect();

    store.messages.insert(group.id, messages);
    store.conversations.push(group);
}
