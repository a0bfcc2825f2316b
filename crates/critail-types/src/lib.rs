//! Shared types for critail
//!
//! This crate contains data structures used across multiple critail crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Stream Types
// ============================================================================

/// Output stream a container log line was written to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    #[default]
    Stdout,
    Stderr,
}

impl StreamType {
    /// Name as it appears in a CRI log line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    /// Parse the raw stream field of a log line
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        match raw {
            b"stdout" => Some(Self::Stdout),
            b"stderr" => Some(Self::Stderr),
            _ => None,
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a CRI log line carries a whole message or a fragment of one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogTag {
    /// `P`: the runtime split a long message, more fragments follow
    Partial,
    /// `F`, or any tag this version does not know about
    #[default]
    Full,
}

impl LogTag {
    /// Parse the first tag of a CRI log line
    pub fn from_bytes(raw: &[u8]) -> Self {
        match raw {
            b"P" => Self::Partial,
            _ => Self::Full,
        }
    }

    /// Whether more fragments of this message follow
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial)
    }
}

// ============================================================================
// Index Types
// ============================================================================

/// Position of one complete log line inside the file it was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexItem {
    /// Byte offset from the start of the file
    pub offset: u64,

    /// Line length in bytes, including the trailing newline
    pub length: u64,
}

impl IndexItem {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte of the line
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// A parsed CRI log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriLogMessage {
    /// Time the runtime received the line
    pub timestamp: DateTime<Utc>,

    /// Stream the container wrote to
    pub stream: StreamType,

    /// Partial or full message
    pub tag: LogTag,

    /// Message payload; partial lines have their newline trimmed
    pub content: Vec<u8>,
}

impl CriLogMessage {
    /// Content as text, replacing invalid UTF-8
    pub fn content_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_from_bytes() {
        assert_eq!(StreamType::from_bytes(b"stdout"), Some(StreamType::Stdout));
        assert_eq!(StreamType::from_bytes(b"stderr"), Some(StreamType::Stderr));
        assert_eq!(StreamType::from_bytes(b"STDOUT"), None);
        assert_eq!(StreamType::from_bytes(b""), None);
    }

    #[test]
    fn test_log_tag_forward_compatible() {
        assert!(LogTag::from_bytes(b"P").is_partial());
        assert_eq!(LogTag::from_bytes(b"F"), LogTag::Full);
        assert_eq!(LogTag::from_bytes(b"X"), LogTag::Full);
    }

    #[test]
    fn test_index_item_end() {
        assert_eq!(IndexItem::new(16, 8).end(), 24);
    }
}
