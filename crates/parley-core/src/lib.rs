pub mod clipboard;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod message;
pub mod segment;

// Re-export main types for convenience
pub use clipboard::{ClipboardError, ClipboardWriter, SystemClipboard};
pub use completion::{CompletionClient, CompletionError, CompletionService, CompletionSettings, WireMessage};
pub use config::{Config, Settings};
pub use conversation::{Conversation, ConversationEvent, ConversationOptions, RequestState};
pub use message::{Message, MessageId, MessageLog, Role};
pub use segment::{language_accent, parse, Accent, Language, Segment};
