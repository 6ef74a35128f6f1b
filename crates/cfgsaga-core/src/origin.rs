//! # Transaction Origin — Provenance Metadata
//!
//! Every transaction records where it came from: a file on disk, an API
//! request, or a test harness. The origin is immutable once the transaction
//! is constructed and flows into every log record the transaction emits.

use serde::{Deserialize, Serialize};

use crate::ids::CorrelationId;

/// The kind of source that produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// Loaded from a configuration file on disk.
    File,
    /// Submitted via the API (gRPC).
    Api,
    /// Constructed by a test harness.
    Test,
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Api => "api",
            Self::Test => "test",
        };
        f.write_str(s)
    }
}

/// Provenance of a transaction: the kind of source, a free-form detail
/// string (absolute file path, RPC service name, or test name), and an
/// optional caller-supplied correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// The kind of source.
    pub kind: OriginKind,
    /// Absolute file path, RPC service name, or test name.
    pub source_detail: String,
    /// Caller-supplied correlation id, if any (typically present for `Api`).
    pub correlation_id: Option<CorrelationId>,
}

impl Origin {
    /// Origin for a transaction loaded from a file on disk.
    pub fn file(absolute_path: impl Into<String>) -> Self {
        Self {
            kind: OriginKind::File,
            source_detail: absolute_path.into(),
            correlation_id: None,
        }
    }

    /// Origin for a transaction submitted via the gRPC API.
    pub fn api(request_id: impl Into<CorrelationId>) -> Self {
        Self {
            kind: OriginKind::Api,
            source_detail: "gRPC API".to_string(),
            correlation_id: Some(request_id.into()),
        }
    }

    /// Origin for a transaction constructed by a test harness.
    pub fn test(test_name: impl Into<String>) -> Self {
        Self {
            kind: OriginKind::Test,
            source_detail: test_name.into(),
            correlation_id: None,
        }
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        CorrelationId::new(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        CorrelationId::new(value)
    }
}
