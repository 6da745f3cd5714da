// Message service tests
// These tests drive the mock service the way the terminal client does:
// load, open, send, and follow delivery updates

mod common;
use common::{at, direct, fast_delivery, people, setup_logging, wait_for_status};

use anyhow::Result;
use log::info;

use parley::config::{DeliverySettings, Settings};
use parley::models::{DeliveryStatus, MessageDraft};
use parley::projection::{ConversationList, MessageFeed};
use parley::service::{MessageService, MockMessageService};

#[tokio::test]
async fn test_send_progresses_to_read() -> Result<()> {
    setup_logging();
    let p = people();
    let conversation = direct(&p.me, &p.alice, &[0, 1, 2]);
    let (service, mut events) = MockMessageService::with_data(
        p.me.clone(),
        vec![p.alice.clone()],
        vec![conversation.clone()],
        fast_delivery(),
    );

    let mut feed = MessageFeed::open(&service, conversation.clone()).await?;
    let sent = feed.send(&service, "  hello there  ").await.expect("message sent");
    info!("Sent message {}", sent.id);

    assert_eq!(sent.content, "hello there");
    assert_eq!(sent.delivery_status, DeliveryStatus::Sent);
    assert!(sent.sent_by_viewer);
    assert_eq!(feed.messages().len(), 4);
    assert_eq!(feed.messages().last().map(|m| m.id), Some(sent.id));

    let updates = wait_for_status(&mut events, sent.id, DeliveryStatus::Read).await?;
    let statuses: Vec<_> = updates.iter().map(|m| m.delivery_status).collect();
    assert_eq!(statuses, vec![DeliveryStatus::Delivered, DeliveryStatus::Read]);

    for update in &updates {
        assert!(feed.apply_delivery_update(update));
    }
    let row = feed.rows(at(0)).pop().unwrap();
    let tick = row.delivery.unwrap();
    assert_eq!(tick.glyph, "✓✓");
    assert!(tick.emphasized);

    let stored = service.messages(conversation.id).await?;
    assert_eq!(stored.len(), 4);
    assert_eq!(
        stored.iter().find(|m| m.id == sent.id).map(|m| m.delivery_status),
        Some(DeliveryStatus::Read)
    );
    Ok(())
}

#[tokio::test]
async fn test_failure_rate_marks_failed() -> Result<()> {
    setup_logging();
    let p = people();
    let conversation = direct(&p.me, &p.alice, &[]);
    let (service, mut events) = MockMessageService::with_data(
        p.me.clone(),
        vec![p.alice.clone()],
        vec![conversation.clone()],
        DeliverySettings {
            failure_rate: 1.0,
            ..fast_delivery()
        },
    );

    let sent = service
        .send_message(MessageDraft {
            conversation_id: conversation.id,
            sender_id: p.me.id,
            receiver_id: Some(p.alice.id),
            content: "are you there?".to_string(),
        })
        .await?;
    assert_eq!(sent.delivery_status, DeliveryStatus::Sent);

    let updates = wait_for_status(&mut events, sent.id, DeliveryStatus::Failed).await?;
    assert_eq!(updates.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_open_marks_conversation_read() -> Result<()> {
    setup_logging();
    let p = people();
    let mut conversation = direct(&p.me, &p.alice, &[0, 1]);
    conversation.unread_count = 3;
    let (service, _events) = MockMessageService::with_data(
        p.me.clone(),
        vec![p.alice.clone()],
        vec![conversation.clone()],
        fast_delivery(),
    );

    let feed = MessageFeed::open(&service, conversation.clone()).await?;
    assert_eq!(feed.conversation().unwrap().unread_count, 0);

    let stored = service.conversations().await?;
    assert_eq!(stored[0].unread_count, 0);
    assert!(stored[0].messages.iter().all(|m| m.is_read));

    // A second read receipt changes nothing
    service.mark_conversation_read(conversation.id).await?;
    let again = service.conversations().await?;
    assert_eq!(again[0].unread_count, 0);
    assert!(again[0].messages.iter().all(|m| m.is_read));
    Ok(())
}

#[tokio::test]
async fn test_lookup_operations() -> Result<()> {
    let p = people();
    let (service, _events) = MockMessageService::with_data(
        p.me.clone(),
        vec![p.alice.clone(), p.bob.clone()],
        Vec::new(),
        fast_delivery(),
    );

    assert_eq!(service.current_user().id, p.me.id);
    assert_eq!(service.contacts().await?.len(), 2);
    assert_eq!(service.contact(p.bob.id).await?.map(|c| c.name), Some("Bob Smith".to_string()));
    assert!(service.contact(p.carol.id).await?.is_none());
    assert!(service.messages(uuid::Uuid::new_v4()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_generated_data_projects_cleanly() -> Result<()> {
    setup_logging();
    let settings = Settings {
        seed: Some(2024),
        ..Settings::default()
    };
    let (service, _events) = MockMessageService::new(&settings);

    let mut list = ConversationList::load(&service).await?;
    let items = list.display_items(chrono::Utc::now());
    assert_eq!(items.len(), 8);
    assert!(items.iter().all(|item| !item.name.is_empty()));
    assert!(items.iter().any(|item| item.name == "Weekend Hikers" && item.initials == "WH"));

    let first = list.select_next().cloned().expect("a conversation");
    let feed = MessageFeed::open(&service, first).await?;
    let rows = feed.rows(chrono::Utc::now());
    assert!(!rows.is_empty());
    assert!(rows.windows(2).all(|w| {
        let a = feed.messages().iter().find(|m| m.id == w[0].id).unwrap();
        let b = feed.messages().iter().find(|m| m.id == w[1].id).unwrap();
        a.timestamp <= b.timestamp
    }));
    Ok(())
}
