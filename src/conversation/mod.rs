//! Capture conversations: sessions, inbound events, replies and the state
//! machine that ties them together.

mod event;
mod keyboard;
mod machine;
mod messages;
mod property_loop;
mod session;
mod store;


pub use event::{ChatId, Command, Incoming, VoiceRef};
pub use keyboard::{category_keyboard, options_keyboard, Keyboard, Reply, SKIP_LABEL};
pub use machine::{CaptureFlow, Outbox};
pub use property_loop::{accept_choice, advance_and_present, Choice, Step};
pub use session::{
    Category, ConversationState, CurrentField, PropertySlot, PropertyValue, Session, SessionError,
};
pub use store::{SessionStore, DEFAULT_SESSION_TTL_SECS};

#[cfg(test)]
pub(crate) use machine::fake::RecordingOutbox;
