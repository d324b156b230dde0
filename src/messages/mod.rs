pub mod event_log;
pub mod storage;
pub mod types;

pub use event_log::{EventLog, EventLogEntry, EventSource};
pub use storage::{EmailDraft, MemoryStore};
pub use types::{
    ConversationItem, FormattedContent, FormattedTool, ItemDelta, ItemStatus, ItemType, Role,
};
