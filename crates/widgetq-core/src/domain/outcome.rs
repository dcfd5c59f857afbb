//! Outcome model: what happened to one delivery.
//!
//! 各 delivery は次のように遷移します:
//! `Fetched → Validated|Rejected → (Stored → Acknowledged) | (StoreFailed → Unacknowledged)`
//!
//! 終端状態は `Rejected` / `Acknowledged` / `Unacknowledged` の 3 つです。

use std::fmt;

/// The storage-level effect a request had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Created,
    Updated,
    Deleted,
    /// Unknown kind: no storage call, acknowledged as a no-op.
    Ignored,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a routed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Failed decoding or validation. `parked` is true when the body went to
    /// the dead-letter sink and the source item was acknowledged.
    Rejected { reason: String, parked: bool },

    /// Stored (or ignored) and acknowledged at the source.
    Acknowledged { operation: Operation },

    /// Left at the source for redelivery.
    Unacknowledged { reason: String },
}

impl RouteOutcome {
    /// Whether the source item was removed.
    pub fn is_acknowledged(&self) -> bool {
        matches!(
            self,
            Self::Acknowledged { .. } | Self::Rejected { parked: true, .. }
        )
    }
}
