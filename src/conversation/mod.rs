//! Conversation state
//!
//! - `selection`: typed accumulation of the user's choices
//! - `history`: append-only transcript
//! - `engine`: the state machine tying both to the dialog graph

mod engine;
mod history;
mod selection;

pub use engine::{
    ActionFamily, ActionTicket, Conversation, ConversationError, NodeView, OptionView, Phase,
    Transition,
};
pub use history::{History, HistoryContent, HistoryEntry, Speaker};
pub use selection::{Dimension, DimensionValue, NumericField, Selection, ANY_LABEL};
