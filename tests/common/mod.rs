// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Once;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{debug, LevelFilter};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration as TokioDuration};

use parley::config::DeliverySettings;
use parley::models::{Contact, ContactStatus, Conversation, DeliveryStatus, Message, MessageId};
use parley::service::ServiceEvent;

static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

pub struct People {
    pub me: Contact,
    pub alice: Contact,
    pub bob: Contact,
    pub carol: Contact,
}

pub fn people() -> People {
    let mut alice = Contact::new("Alice Johnson", ContactStatus::Online);
    alice.avatar_url = Some("https://example.com/alice.png".to_string());
    let mut bob = Contact::new("Bob Smith", ContactStatus::Offline);
    bob.last_seen = Some(Utc::now() - Duration::hours(3));

    People {
        me: Contact::new("John Doe", ContactStatus::Online),
        alice,
        bob,
        carol: Contact::new("Carol Williams", ContactStatus::Busy),
    }
}

/// A fixed instant plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn direct(me: &Contact, other: &Contact, stamps: &[i64]) -> Conversation {
    let mut conversation = Conversation::new(vec![me.clone(), other.clone()]);
    for (i, minutes) in stamps.iter().enumerate() {
        let sender = if i % 2 == 0 { other.id } else { me.id };
        conversation
            .messages
            .push(Message::text(conversation.id, sender, format!("message {}", i), at(*minutes)));
    }
    conversation
}

pub fn fast_delivery() -> DeliverySettings {
    DeliverySettings {
        sent_to_delivered_ms: 10,
        delivered_to_read_ms: 10,
        failure_rate: 0.0,
    }
}

/// Wait until the service reports `message_id` at `status`, collecting every update seen.
pub async fn wait_for_status(
    events: &mut mpsc::Receiver<ServiceEvent>,
    message_id: MessageId,
    status: DeliveryStatus,
) -> Result<Vec<Message>> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(TokioDuration::from_secs(5), events.recv())
            .await
            .map_err(|_| anyhow!("Timed out waiting for {:?}", status))?
            .ok_or_else(|| anyhow!("Event channel closed"))?;

        let ServiceEvent::DeliveryUpdated(message) = event;
        debug!("Update for {}: {:?}", message.id, message.delivery_status);
        if message.id != message_id {
            continue;
        }
        let reached = message.delivery_status == status;
        seen.push(message);
        if reached {
            return Ok(seen);
        }
    }
}
