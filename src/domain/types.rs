use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;

/// Glyph shown for anything the service could not classify.
pub const UNKNOWN_ICON: &str = "❓";

/// The four waste categories the service classifies into, keyed by the
/// Chinese labels used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarbageKind {
    Recyclable,
    Hazardous,
    Kitchen,
    Other,
}

impl GarbageKind {
    pub const ALL: [GarbageKind; 4] = [
        GarbageKind::Recyclable,
        GarbageKind::Hazardous,
        GarbageKind::Kitchen,
        GarbageKind::Other,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "可回收垃圾" => Some(GarbageKind::Recyclable),
            "有害垃圾" => Some(GarbageKind::Hazardous),
            "厨余垃圾" => Some(GarbageKind::Kitchen),
            "其他垃圾" => Some(GarbageKind::Other),
            _ => None,
        }
    }

    /// Unrecognized labels deliberately fall back to Other; the service
    /// has always rendered unknown categories with the Other visuals.
    pub fn from_label_or_other(label: &str) -> Self {
        Self::from_label(label).unwrap_or(GarbageKind::Other)
    }

    /// English aliases accepted on the command line next to the wire labels.
    pub fn from_alias(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "recyclable" => Some(GarbageKind::Recyclable),
            "hazardous" => Some(GarbageKind::Hazardous),
            "kitchen" => Some(GarbageKind::Kitchen),
            "other" => Some(GarbageKind::Other),
            trimmed => Self::from_label(trimmed),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GarbageKind::Recyclable => "可回收垃圾",
            GarbageKind::Hazardous => "有害垃圾",
            GarbageKind::Kitchen => "厨余垃圾",
            GarbageKind::Other => "其他垃圾",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            GarbageKind::Recyclable => "♻️",
            GarbageKind::Hazardous => "☠️",
            GarbageKind::Kitchen => "🍎",
            GarbageKind::Other => "🗑️",
        }
    }

    /// ANSI color used for badges and chart bars.
    pub fn color(&self) -> &'static str {
        match self {
            GarbageKind::Recyclable => "\x1b[32m",
            GarbageKind::Hazardous => "\x1b[31m",
            GarbageKind::Kitchen => "\x1b[33m",
            GarbageKind::Other => "\x1b[90m",
        }
    }
}

/// One completed classification attempt as kept in the local log.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub item_name: String,
    pub garbage_type: String,
    pub success: bool,
    pub timestamp: String,
    pub icon: String,
}

/// Current time rendered the way the service stamps its responses.
pub fn now_stamp(tz: &Tz) -> String {
    Utc::now()
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_parse() {
        assert_eq!(
            GarbageKind::from_label("可回收垃圾"),
            Some(GarbageKind::Recyclable)
        );
        assert_eq!(GarbageKind::from_label("有害垃圾"), Some(GarbageKind::Hazardous));
        assert_eq!(GarbageKind::from_label("厨余垃圾"), Some(GarbageKind::Kitchen));
        assert_eq!(GarbageKind::from_label("其他垃圾"), Some(GarbageKind::Other));
    }

    #[test]
    fn unknown_labels_fall_back_to_other() {
        assert_eq!(GarbageKind::from_label_or_other("未知"), GarbageKind::Other);
        assert_eq!(GarbageKind::from_label_or_other(""), GarbageKind::Other);
        assert_eq!(
            GarbageKind::from_label_or_other("大型垃圾"),
            GarbageKind::Other
        );
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(GarbageKind::from_alias("Recyclable"), Some(GarbageKind::Recyclable));
        assert_eq!(GarbageKind::from_alias("KITCHEN"), Some(GarbageKind::Kitchen));
        assert_eq!(GarbageKind::from_alias("厨余垃圾"), Some(GarbageKind::Kitchen));
        assert_eq!(GarbageKind::from_alias("plastic"), None);
    }
}
