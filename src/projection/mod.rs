// Display projections: pure derivations of UI-ready fields from the entity
// model, always computed from the viewer's point of view.

pub mod conversation;
pub mod feed;

pub use conversation::{chat_header, ChatHeader, ConversationList, ConversationListItem};
pub use feed::{BubbleSide, MessageFeed, MessageRow};
