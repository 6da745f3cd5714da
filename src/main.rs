use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;

mod ui;
mod utils;

use crate::ui::{ChatUI, UiAction};
use parley::config::{load_settings, Settings};
use parley::projection::{ConversationList, MessageFeed};
use parley::service::{MessageService, MockMessageService, ServiceEvent};

/// Command line arguments for parley
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "parley: a terminal chat client backed by an in-memory message service."
)]
struct Args {
    /// Settings file (defaults to <config dir>/parley/settings.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of the configured one
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Seed for the generated sample conversations
    #[arg(long)]
    seed: Option<u64>,
}

fn apply_overrides(mut settings: Settings, args: &Args) -> Settings {
    if let Some(path) = &args.log_file {
        settings.log_file = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        settings.log_level = level.clone();
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = apply_overrides(load_settings(args.config.as_deref())?, &args);

    let log_file_path = settings
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from("parley.log"));
    utils::setup_logging(Some(&log_file_path), utils::parse_level(&settings.log_level))?;
    info!("Logging to file: {}", log_file_path.display());

    let (service, mut events) = MockMessageService::new(&settings);
    let me = service.current_user();
    info!("Signed in as {}", me.name);

    let mut conversations = ConversationList::load(&service).await?;
    let feed = match conversations.select_next().cloned() {
        Some(first) => {
            let id = first.id;
            let feed = MessageFeed::open(&service, first).await?;
            conversations.mark_read_local(id);
            feed
        }
        None => MessageFeed::empty(me.id),
    };

    let mut terminal = ui::setup_terminal()?;
    let mut chat_ui = ChatUI::new(conversations, feed);

    let result = run_main_loop(&mut chat_ui, &mut terminal, &service, &mut events).await;

    ui::restore_terminal(terminal)?;
    if let Err(e) = &result {
        error!("Main loop ended with error: {}", e);
    }
    println!("Chat session ended.");
    result
}

async fn run_main_loop(
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    service: &MockMessageService,
    events: &mut mpsc::Receiver<ServiceEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| chat_ui.draw(f))?;

        match chat_ui.handle_input()? {
            Some(UiAction::Quit) => {
                info!("Quit requested");
                return Ok(());
            }
            Some(UiAction::OpenConversation(id)) => {
                let Some(conversation) = chat_ui.conversations.get(id).cloned() else {
                    warn!("Selected conversation {} vanished", id);
                    continue;
                };
                match MessageFeed::open(service, conversation).await {
                    Ok(feed) => {
                        chat_ui.set_feed(feed);
                        chat_ui.conversations.mark_read_local(id);
                    }
                    Err(e) => error!("Failed to open conversation {}: {}", id, e),
                }
            }
            Some(UiAction::Send(text)) => {
                if let Some(message) = chat_ui.feed.send(service, &text).await {
                    chat_ui.conversations.record_message(message);
                }
            }
            None => {}
        }

        // Delivery progress arrives as fresh message snapshots
        while let Ok(event) = events.try_recv() {
            match event {
                ServiceEvent::DeliveryUpdated(message) => {
                    chat_ui.feed.apply_delivery_update(&message);
                    chat_ui.conversations.apply_delivery_update(&message);
                }
            }
        }
    }
}
