use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use parley::models::ConversationId;
use parley::projection::{chat_header, BubbleSide, ConversationList, ConversationListItem, MessageFeed, MessageRow};

pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the main loop has to do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    OpenConversation(ConversationId),
    Send(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Focus {
    Conversations,
    Search,
    Composer,
}

pub struct ChatUI {
    pub conversations: ConversationList,
    pub feed: MessageFeed,
    input: Input,
    search: Input,
    focus: Focus,
}

impl ChatUI {
    pub fn new(conversations: ConversationList, feed: MessageFeed) -> Self {
        ChatUI {
            conversations,
            feed,
            input: Input::default(),
            search: Input::default(),
            focus: Focus::Composer,
        }
    }

    pub fn set_feed(&mut self, feed: MessageFeed) {
        self.feed = feed;
    }

    pub fn handle_input(&mut self) -> Result<Option<UiAction>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        match (self.focus, key.code) {
            (Focus::Search, KeyCode::Esc) => {
                self.search = Input::default();
                self.conversations.set_search_text("");
                self.focus = Focus::Conversations;
            }
            (Focus::Search, KeyCode::Enter) => {
                self.focus = Focus::Conversations;
            }
            (Focus::Search, _) => {
                self.search.handle_event(&Event::Key(key));
                self.conversations.set_search_text(self.search.value());
            }
            (_, KeyCode::Esc) => return Ok(Some(UiAction::Quit)),
            (_, KeyCode::Tab) => {
                self.focus = match self.focus {
                    Focus::Composer => Focus::Conversations,
                    _ => Focus::Composer,
                };
            }
            (Focus::Conversations, KeyCode::Char('/')) => {
                self.focus = Focus::Search;
            }
            (Focus::Conversations, KeyCode::Up) => {
                if let Some(id) = self.conversations.select_previous().map(|c| c.id) {
                    return Ok(Some(UiAction::OpenConversation(id)));
                }
            }
            (Focus::Conversations, KeyCode::Down) => {
                if let Some(id) = self.conversations.select_next().map(|c| c.id) {
                    return Ok(Some(UiAction::OpenConversation(id)));
                }
            }
            (Focus::Conversations, KeyCode::Enter) => {
                self.focus = Focus::Composer;
            }
            (Focus::Composer, KeyCode::Enter) => {
                let text = self.input.value().to_string();
                if text.trim().is_empty() || self.feed.conversation().is_none() {
                    debug!("Nothing to send");
                    return Ok(None);
                }
                self.input = Input::default();
                return Ok(Some(UiAction::Send(text)));
            }
            (Focus::Composer, _) => {
                self.input.handle_event(&Event::Key(key));
            }
            _ => {}
        }
        Ok(None)
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>) {
        let size = frame.size();
        let now = Utc::now();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Conversations
                Constraint::Percentage(70), // Chat
            ])
            .split(size);

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(chunks[0]);

        let chat = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Messages
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Help
            ])
            .split(chunks[1]);

        let search = Paragraph::new(self.search.value()).block(
            Block::default()
                .title("Search (/)")
                .borders(Borders::ALL)
                .border_style(focus_style(self.focus == Focus::Search)),
        );
        frame.render_widget(search, sidebar[0]);

        draw_conversations(frame, &self.conversations.display_items(now), sidebar[1], self.focus);

        let header = match self.feed.conversation() {
            Some(conversation) => {
                let header = chat_header(conversation, self.feed.viewer(), now);
                Line::from(vec![
                    Span::styled(format!("[{}] ", header.initials), Style::default().fg(Color::Cyan)),
                    Span::styled(header.name, Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw("  "),
                    Span::styled(header.status_text, status_style(header.status_class)),
                ])
            }
            None => Line::from("Select a conversation"),
        };
        frame.render_widget(
            Paragraph::new(header).block(Block::default().borders(Borders::ALL)),
            chat[0],
        );

        draw_messages(frame, &self.feed.rows(now), chat[1]);

        let composer = Paragraph::new(self.input.value()).block(
            Block::default()
                .title("Message")
                .borders(Borders::ALL)
                .border_style(focus_style(self.focus == Focus::Composer)),
        );
        frame.render_widget(composer, chat[2]);

        let help = Paragraph::new(Line::from(Span::styled(
            "ESC quit | TAB switch pane | ↑/↓ pick chat | / search | ENTER send",
            Style::default().fg(Color::Gray),
        )));
        frame.render_widget(help, chat[3]);

        match self.focus {
            Focus::Composer => frame.set_cursor(chat[2].x + self.input.cursor() as u16 + 1, chat[2].y + 1),
            Focus::Search => frame.set_cursor(sidebar[0].x + self.search.cursor() as u16 + 1, sidebar[0].y + 1),
            Focus::Conversations => {}
        }
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn status_style(status_class: &str) -> Style {
    match status_class {
        "online" => Style::default().fg(Color::Green),
        "away" => Style::default().fg(Color::Yellow),
        "busy" => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Gray),
    }
}

fn draw_conversations<B: Backend>(f: &mut Frame<B>, items: &[ConversationListItem], area: Rect, focus: Focus) {
    let list_items: Vec<ListItem> = items
        .iter()
        .map(|item| {
            let name_style = if item.has_unread {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let mut title = vec![
                Span::styled("● ", status_style(item.status_class)),
                Span::styled(format!("[{}] ", item.no_avatar()), Style::default().fg(Color::Cyan)),
                Span::styled(item.name.clone(), name_style),
                Span::styled(format!("  {}", item.last_message_time), Style::default().fg(Color::Gray)),
            ];
            if item.has_unread {
                title.push(Span::styled(
                    format!(" ({})", item.unread_count),
                    Style::default().fg(Color::Magenta),
                ));
            }
            let preview = Line::from(Span::styled(
                format!("    {}", item.last_message_preview),
                Style::default().fg(Color::Gray),
            ));
            ListItem::new(vec![Line::from(title), preview])
        })
        .collect();

    let mut state = ListState::default();
    state.select(items.iter().position(|item| item.is_selected));

    let list = List::new(list_items)
        .block(
            Block::default()
                .title("Chats")
                .borders(Borders::ALL)
                .border_style(focus_style(matches!(focus, Focus::Conversations | Focus::Search))),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, rows: &[MessageRow], area: Rect) {
    let wrap_width = area.width.saturating_sub(2).max(8) as usize;
    let bubble_width = (wrap_width * 3 / 4).max(4);

    let items: Vec<ListItem> = rows
        .iter()
        .flat_map(|row| {
            let mut lines: Vec<Line> = Vec::new();
            let pad = |text: &str| -> String {
                let used = text.chars().count();
                format!("{}{}", " ".repeat(wrap_width.saturating_sub(used)), text)
            };

            match row.side {
                BubbleSide::Received => {
                    lines.push(Line::from(vec![
                        Span::styled(format!("[{}] ", row.no_avatar()), Style::default().fg(Color::Cyan)),
                        Span::styled(row.sender_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    ]));
                    for line in wrap(&row.content, bubble_width) {
                        lines.push(Line::from(format!("  {}", line)));
                    }
                    lines.push(Line::from(Span::styled(
                        format!("  {}", row.time_label),
                        Style::default().fg(Color::Gray),
                    )));
                }
                BubbleSide::Sent => {
                    for line in wrap(&row.content, bubble_width) {
                        lines.push(Line::from(Span::styled(pad(&line), Style::default().fg(Color::Blue))));
                    }
                    let (glyph, tick_style) = match row.delivery {
                        Some(d) if d.class == "failed" => (d.glyph, Style::default().fg(Color::Red)),
                        Some(d) if d.emphasized => (d.glyph, Style::default().fg(Color::Cyan)),
                        Some(d) => (d.glyph, Style::default().fg(Color::Gray)),
                        None => ("", Style::default()),
                    };
                    let stamp = format!("{} {}", row.time_label, glyph);
                    lines.push(Line::from(Span::styled(pad(&stamp), tick_style)));
                }
            }
            lines.push(Line::from(""));
            lines.into_iter().map(ListItem::new).collect::<Vec<_>>()
        })
        .collect();

    // Keep the newest message in view
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(items.len() - 1));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut state);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
