pub mod types;

pub use types::{now_stamp, GarbageKind, HistoryEntry, UNKNOWN_ICON};
