//! # Transaction Identity Newtypes
//!
//! Newtype wrappers over `uuid::Uuid` for the identifiers that name a
//! configuration transaction and, optionally, the request that produced it.
//! Keeping these distinct from bare `Uuid` prevents accidental identifier
//! confusion between the transaction's own id and a caller-supplied
//! correlation id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a configuration transaction.
///
/// Generated once at construction and stable for the transaction's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Generate a new random transaction identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Caller-supplied correlation identifier, carried through from an API
/// request into the transaction's origin metadata and log records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Wrap a caller-supplied correlation id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Access the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
