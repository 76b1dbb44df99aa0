use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Who wrote a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// The human driving the console.
    Operator,
    /// The backend assistant, including synthetic connection-error replies.
    Assistant,
}

impl Author {
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::Operator => "operator",
            Author::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Identifier of a chat session.
///
/// Assigned from a monotonically increasing counter and never reused within a
/// process. Ordering follows allocation order. The wire form is the decimal
/// number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(SessionId)
    }
}

/// Identifier of a message, unique within its session's transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in milliseconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    /// Wall-clock time of day, as shown next to messages.
    pub fn clock_label(&self) -> String {
        self.to_datetime().format("%H:%M:%S").to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
