//! Identifier types for replay sessions
//!
//! `SessionId` uses UUID v7 so engine instances sort by creation time in
//! logs. `Epoch` is the generation counter that tags every emitted message
//! so consumers can reject output from a superseded session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new SessionId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generation counter.
///
/// Bumped on every INIT, STOP and SEEK. A message tagged with an epoch
/// older than the consumer's current one is a zombie and must be discarded.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    pub const ZERO: Epoch = Epoch(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The following generation.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether a message tagged `tag` is stale relative to this epoch.
    pub fn is_stale(&self, tag: Epoch) -> bool {
        tag < *self
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_creation() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2, "SessionIds should be unique");
    }

    #[test]
    fn test_session_id_serialization() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_epoch_monotonic() {
        let e0 = Epoch::ZERO;
        let e1 = e0.next();
        let e2 = e1.next();
        assert!(e0 < e1 && e1 < e2);
        assert_eq!(e2.value(), 2);
    }

    #[test]
    fn test_epoch_stale_detection() {
        let current = Epoch::new(5);
        assert!(current.is_stale(Epoch::new(4)));
        assert!(!current.is_stale(Epoch::new(5)));
        assert!(!current.is_stale(Epoch::new(6)));
    }

    #[test]
    fn test_epoch_serializes_as_number() {
        let json = serde_json::to_string(&Epoch::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
