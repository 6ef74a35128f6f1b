//! # Source Adapters
//!
//! Thin constructors that attach the right [`cfgsaga_core::Origin`] before
//! delegating to [`Transaction::construct`]. Parsing the domain
//! configuration itself — from a file, an RPC payload, or a test fixture —
//! is the caller's job; these adapters only need the already-parsed value.

use std::sync::Arc;

use cfgsaga_core::{CorrelationId, Origin};

use crate::config::DomainConfig;
use crate::error::{SourceError, TransactionError};
use crate::transaction::Transaction;

/// Default capacity of a transaction's in-memory log ring.
pub const DEFAULT_LOG_RING_CAPACITY: usize = 1024;

/// Construct a transaction sourced from a configuration file on disk.
/// `path` must already exist; non-existence is reported as `NotFound`
/// before any construction is attempted.
pub fn from_file(
    path: impl AsRef<std::path::Path>,
    config: Option<Arc<dyn DomainConfig>>,
    log_ring_capacity: usize,
) -> Result<Transaction, SourceError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SourceError::NotFound(path.display().to_string()));
    }
    let config = config.ok_or(SourceError::NilConfig)?;
    let absolute = std::fs::canonicalize(path).map_err(|_| SourceError::NotFound(path.display().to_string()))?;
    let origin = Origin::file(absolute.display().to_string());
    Transaction::construct(origin, Some(config), log_ring_capacity)
        .map_err(|e| match e {
            TransactionError::NilConfig => SourceError::NilConfig,
            other => SourceError::Construction(other),
        })
}

/// Construct a transaction sourced from an API (gRPC) request.
pub fn from_api(
    request_id: impl Into<CorrelationId>,
    config: Option<Arc<dyn DomainConfig>>,
    log_ring_capacity: usize,
) -> Result<Transaction, SourceError> {
    let config = config.ok_or(SourceError::NilConfig)?;
    let origin = Origin::api(request_id);
    Transaction::construct(origin, Some(config), log_ring_capacity).map_err(|e| match e {
        TransactionError::NilConfig => SourceError::NilConfig,
        other => SourceError::Construction(other),
    })
}

/// Construct a transaction sourced from a test harness.
pub fn from_test(
    test_name: impl Into<String>,
    config: Option<Arc<dyn DomainConfig>>,
    log_ring_capacity: usize,
) -> Result<Transaction, SourceError> {
    let config = config.ok_or(SourceError::NilConfig)?;
    let origin = Origin::test(test_name);
    Transaction::construct(origin, Some(config), log_ring_capacity).map_err(|e| match e {
        TransactionError::NilConfig => SourceError::NilConfig,
        other => SourceError::Construction(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppSpec, AppVariant, DomainConfig as _, EndpointSpec};

    #[derive(Debug)]
    struct EmptyConfig;

    impl DomainConfig for EmptyConfig {
        fn validate(&self) -> Vec<String> {
            vec![]
        }
        fn apps(&self) -> &[AppSpec] {
            &[]
        }
        fn endpoints(&self) -> &[EndpointSpec] {
            &[]
        }
    }

    #[test]
    fn test_from_file_missing_path_is_not_found() {
        let err = from_file("/nonexistent/path/config.json", Some(Arc::new(EmptyConfig)), 16).unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn test_from_file_nil_config() {
        let dir = std::env::temp_dir();
        let err = from_file(dir, None, 16).unwrap_err();
        assert!(matches!(err, SourceError::NilConfig));
    }

    #[test]
    fn test_from_api_sets_origin() {
        let tx = from_api("req-1", Some(Arc::new(EmptyConfig)), 16).unwrap();
        assert_eq!(tx.origin().source_detail, "gRPC API");
        assert_eq!(tx.origin().correlation_id.as_ref().unwrap().as_str(), "req-1");
    }

    #[test]
    fn test_from_test_sets_origin() {
        let tx = from_test("my_case", Some(Arc::new(EmptyConfig)), 16).unwrap();
        assert_eq!(tx.origin().source_detail, "my_case");
    }
}
