pub mod internal;

pub use internal::{Conversation, Message, MessageKind, MessageMetadata, Role};
