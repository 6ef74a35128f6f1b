//! # Transaction — the Central Entity
//!
//! Carries the domain configuration, a unique identifier, origin metadata,
//! the saga lifecycle FSM, an aggregated structured-log history, the
//! derived runtime artifacts (apps, middleware) built once at construction,
//! and the participant collection the orchestrator drives.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cfgsaga_core::{LogCollector, LogRecord, Origin, Timestamp, TransactionId, TxLogger};
use cfgsaga_fsm::{Fsm, SagaState};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Level;

use crate::config::{build_app, build_middleware, DomainConfig, MiddlewareSpec, MiddlewareType, RuntimeApp, RuntimeMiddleware};
use crate::error::TransactionError;
use crate::participant::ParticipantCollection;

/// The configuration transaction.
pub struct Transaction {
    id: TransactionId,
    origin: Origin,
    created_at: Timestamp,
    config: Arc<dyn DomainConfig>,
    fsm: Fsm<SagaState>,
    is_valid: AtomicBool,
    validation_errors: Mutex<Vec<String>>,
    participants: ParticipantCollection,
    apps: BTreeMap<String, Box<dyn RuntimeApp>>,
    #[allow(clippy::type_complexity)]
    middleware: BTreeMap<(String, String), Box<dyn RuntimeMiddleware>>,
    logger: TxLogger,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("state", &self.fsm.state())
            .finish()
    }
}

impl Transaction {
    /// Construct a transaction from a parsed domain configuration. Builds
    /// every derived artifact (apps, middleware pool) before returning; if
    /// any step fails, no transaction is produced.
    pub fn construct(
        origin: Origin,
        config: Option<Arc<dyn DomainConfig>>,
        log_ring_capacity: usize,
    ) -> Result<Self, TransactionError> {
        let config = config.ok_or(TransactionError::NilConfig)?;

        let merged_middlewares = merge_middlewares(config.endpoints());
        check_duplicate_middleware_ids(&merged_middlewares)?;
        check_resource_conflicts(&merged_middlewares)?;

        let mut middleware: BTreeMap<(String, String), Box<dyn RuntimeMiddleware>> = BTreeMap::new();
        for spec in &merged_middlewares {
            let type_name = middleware_type_name(&spec.middleware_type).to_string();
            let key = (type_name, spec.id.clone());
            if middleware.contains_key(&key) {
                continue;
            }
            let built = build_middleware(spec)?;
            middleware.insert(key, built);
        }

        let mut apps: BTreeMap<String, Box<dyn RuntimeApp>> = BTreeMap::new();
        for spec in config.apps() {
            if apps.contains_key(&spec.id) {
                return Err(TransactionError::DuplicateAppId(spec.id.clone()));
            }
            let built = build_app(spec)?;
            apps.insert(spec.id.clone(), built);
        }

        let id = TransactionId::new();
        let collector = Arc::new(LogCollector::new(log_ring_capacity));
        let logger = TxLogger::new(id, origin.clone(), collector);

        Ok(Self {
            id,
            origin,
            created_at: Timestamp::now(),
            config,
            fsm: Fsm::new(SagaState::Created),
            is_valid: AtomicBool::new(false),
            validation_errors: Mutex::new(vec![]),
            participants: ParticipantCollection::new(),
            apps,
            middleware,
            logger,
        })
    }

    /// This transaction's unique identifier.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Provenance of this transaction.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// When this transaction was constructed.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SagaState {
        self.fsm.state()
    }

    /// Whether the domain configuration has passed validation.
    pub fn is_valid(&self) -> bool {
        self.is_valid.load(Ordering::SeqCst)
    }

    /// The participant collection this transaction's orchestrator drives.
    pub fn participants(&self) -> &ParticipantCollection {
        &self.participants
    }

    /// The transaction's structured logger.
    pub fn logger(&self) -> &TxLogger {
        &self.logger
    }

    /// Every log record captured so far, oldest first.
    pub fn log_records(&self) -> Vec<LogRecord> {
        self.logger.collector().records()
    }

    /// The runtime app built for `id`, if any.
    pub fn app(&self, id: &str) -> Option<&dyn RuntimeApp> {
        self.apps.get(id).map(|b| b.as_ref())
    }

    /// The runtime middleware built for `(type_name, id)`, if any.
    pub fn middleware(&self, type_name: &str, id: &str) -> Option<&dyn RuntimeMiddleware> {
        self.middleware
            .get(&(type_name.to_string(), id.to_string()))
            .map(|b| b.as_ref())
    }

    fn log_transition(&self, message: &str) {
        self.logger.log(Level::INFO, message.to_string(), vec![]);
    }

    /// `created -> validating`.
    pub fn begin_validation(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Validating)?;
        self.log_transition("begin_validation");
        Ok(())
    }

    /// Drives `created -> validating -> {validated | invalid}` by invoking
    /// the domain config's own `validate()`. The single entry point the
    /// saga path uses; piecewise operations below exist for tests and
    /// staged flows.
    pub fn run_validation(&self) -> Result<(), TransactionError> {
        self.begin_validation()?;
        let errors = self.config.validate();
        if errors.is_empty() {
            self.mark_validated()
        } else {
            let _ = self.mark_invalid(errors.clone());
            Err(TransactionError::ValidationFailed(errors))
        }
    }

    /// `validating -> validated`; requires `is_valid` to already be
    /// eligible, else drives to `invalid`.
    pub fn mark_validated(&self) -> Result<(), TransactionError> {
        if !self.validation_errors.lock().expect("validation errors mutex poisoned").is_empty() {
            self.fsm.transition(SagaState::Invalid)?;
            self.log_transition("mark_validated: pending errors, driving to invalid");
            return Ok(());
        }
        self.fsm.transition(SagaState::Validated)?;
        self.is_valid.store(true, Ordering::SeqCst);
        self.log_transition("mark_validated");
        Ok(())
    }

    /// `validating -> invalid`, appending `err` to the accumulated
    /// validation errors.
    pub fn mark_invalid(&self, err: Vec<String>) -> Result<(), TransactionError> {
        self.validation_errors
            .lock()
            .expect("validation errors mutex poisoned")
            .extend(err);
        self.fsm.transition(SagaState::Invalid)?;
        self.log_transition("mark_invalid");
        Ok(())
    }

    /// `validated -> executing`; rejects with `NotValidated` if the
    /// transaction is not currently `validated`.
    pub fn begin_execution(&self) -> Result<(), TransactionError> {
        if self.fsm.state() != SagaState::Validated {
            return Err(TransactionError::NotValidated);
        }
        self.fsm.transition(SagaState::Executing)?;
        self.log_transition("begin_execution");
        Ok(())
    }

    /// `executing -> succeeded`.
    pub fn mark_succeeded(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Succeeded)?;
        self.log_transition("mark_succeeded");
        Ok(())
    }

    /// `succeeded -> reloading`.
    pub fn begin_reload(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Reloading)?;
        self.log_transition("begin_reload");
        Ok(())
    }

    /// `reloading -> completed`.
    pub fn mark_completed(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Completed)?;
        self.log_transition("mark_completed");
        Ok(())
    }

    /// Drives the transaction toward `failed`. If `cancel` has already
    /// fired, returns the cancellation error without transitioning. If the
    /// transaction is already in a terminal state, logs and returns `Ok`
    /// rather than erroring, to tolerate shutdown races.
    pub fn mark_failed(&self, cancel: &CancellationToken, err: impl Into<String>) -> Result<(), TransactionError> {
        if cancel.is_cancelled() {
            return Err(TransactionError::Cancelled);
        }
        if self.fsm.state().is_terminal_state() {
            self.log_transition("mark_failed: already terminal, no-op");
            return Ok(());
        }
        let err = err.into();
        self.fsm.transition(SagaState::Failed)?;
        self.logger.error(format!("mark_failed: {err}"), vec![]);
        Ok(())
    }

    /// `failed -> compensating`.
    pub fn begin_compensation(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Compensating)?;
        self.log_transition("begin_compensation");
        Ok(())
    }

    /// `compensating -> compensated`.
    pub fn mark_compensated(&self) -> Result<(), TransactionError> {
        self.fsm.transition(SagaState::Compensated)?;
        self.log_transition("mark_compensated");
        Ok(())
    }

    /// Any non-terminal state -> `error`; unrecoverable, never retried.
    pub fn mark_error(&self, err: impl Into<String>) -> Result<(), TransactionError> {
        let err = err.into();
        self.fsm.transition(SagaState::Error)?;
        self.logger.error(format!("mark_error: {err}"), vec![]);
        Ok(())
    }

    /// Blocks until the transaction reaches a terminal state, or returns
    /// immediately if already terminal. Cancellation yields the
    /// cancellation error.
    pub async fn wait_for_completion(&self, cancel: CancellationToken) -> Result<SagaState, TransactionError> {
        self.fsm
            .wait_for_completion(cancel)
            .await
            .map_err(|_| TransactionError::Cancelled)
    }

    /// Render the external diagnostic record for this transaction.
    pub fn to_diagnostic_record(&self) -> TransactionRecord {
        TransactionRecord {
            id: self.id.to_string(),
            origin_kind: self.origin.kind.to_string(),
            source_detail: self.origin.source_detail.clone(),
            request_id: self.origin.correlation_id.as_ref().map(|c| c.as_str().to_string()),
            created_at: self.created_at.to_iso8601(),
            state: self.fsm.state().to_string(),
            is_valid: self.is_valid(),
            log_records: self
                .log_records()
                .into_iter()
                .map(DiagnosticLogRecord::from)
                .collect(),
            embedded_config: format!("{:?}", self.config),
        }
    }
}

trait TerminalCheck {
    fn is_terminal_state(self) -> bool;
}

impl TerminalCheck for SagaState {
    fn is_terminal_state(self) -> bool {
        cfgsaga_fsm::FsmState::is_terminal(self)
    }
}

fn middleware_type_name(t: &MiddlewareType) -> &'static str {
    match t {
        MiddlewareType::ConsoleLogger { .. } => "console_logger",
        MiddlewareType::FileLogger { .. } => "file_logger",
        MiddlewareType::Other(_) => "other",
    }
}

fn merge_middlewares(endpoints: &[crate::config::EndpointSpec]) -> Vec<MiddlewareSpec> {
    endpoints
        .iter()
        .flat_map(|e| e.routes.iter())
        .flat_map(|r| r.middlewares.iter().cloned())
        .collect()
}

fn check_duplicate_middleware_ids(specs: &[MiddlewareSpec]) -> Result<(), TransactionError> {
    let mut seen: BTreeMap<String, MiddlewareType> = BTreeMap::new();
    let mut conflicts = vec![];
    for spec in specs {
        match seen.get(&spec.id) {
            Some(existing) if existing != &spec.middleware_type => {
                conflicts.push(format!(
                    "middleware id {} declared with conflicting types",
                    spec.id
                ));
            }
            None => {
                seen.insert(spec.id.clone(), spec.middleware_type.clone());
            }
            _ => {}
        }
    }
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(TransactionError::ResourceConflict(conflicts))
    }
}

fn check_resource_conflicts(specs: &[MiddlewareSpec]) -> Result<(), TransactionError> {
    let mut seen_paths: BTreeMap<String, String> = BTreeMap::new();
    let mut conflicts = vec![];
    for spec in specs {
        if let MiddlewareType::FileLogger { output_path } = &spec.middleware_type {
            let expanded = cfgsaga_core::interpolate::expand(output_path);
            if let Some(owner) = seen_paths.get(&expanded) {
                conflicts.push(format!(
                    "file logger path {expanded} claimed by both {owner} and {}",
                    spec.id
                ));
            } else {
                seen_paths.insert(expanded, spec.id.clone());
            }
        }
        if let MiddlewareType::ConsoleLogger { output_path } = &spec.middleware_type {
            let _ = cfgsaga_core::interpolate::expand(output_path);
        }
    }
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(TransactionError::ResourceConflict(conflicts))
    }
}

/// External diagnostic record for one log entry, with the level bucketed
/// to the four external severities.
#[derive(Debug, Serialize)]
pub struct DiagnosticLogRecord {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub attributes: Vec<(String, cfgsaga_core::AttrValue)>,
}

impl From<LogRecord> for DiagnosticLogRecord {
    fn from(r: LogRecord) -> Self {
        Self {
            timestamp: r.timestamp.to_iso8601(),
            level: cfgsaga_core::logging::external_level_bucket(r.level).to_string(),
            message: r.message,
            attributes: r.attributes,
        }
    }
}

/// The external diagnostic serialization contract for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub origin_kind: String,
    pub source_detail: String,
    pub request_id: Option<String>,
    pub created_at: String,
    pub state: String,
    pub is_valid: bool,
    pub log_records: Vec<DiagnosticLogRecord>,
    /// The domain configuration's `Debug` rendering. `DomainConfig` is an
    /// external contract type with no `Serialize` bound of its own, so the
    /// diagnostic record carries its debug form rather than a structured
    /// re-encoding.
    pub embedded_config: String,
}

impl TransactionRecord {
    /// Render this record as the JSON document external observers (the
    /// diagnostics endpoint, a replayed log sink) actually consume.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppSpec, AppVariant, DomainConfig, EndpointSpec, RouteSpec};

    #[derive(Debug)]
    struct TestConfig {
        apps: Vec<AppSpec>,
        endpoints: Vec<EndpointSpec>,
        errors: Vec<String>,
    }

    impl DomainConfig for TestConfig {
        fn validate(&self) -> Vec<String> {
            self.errors.clone()
        }
        fn apps(&self) -> &[AppSpec] {
            &self.apps
        }
        fn endpoints(&self) -> &[EndpointSpec] {
            &self.endpoints
        }
    }

    fn empty_config() -> Arc<dyn DomainConfig> {
        Arc::new(TestConfig {
            apps: vec![AppSpec {
                id: "echo1".to_string(),
                variant: AppVariant::Echo,
            }],
            endpoints: vec![],
            errors: vec![],
        })
    }

    #[test]
    fn test_construct_rejects_nil_config() {
        let err = Transaction::construct(Origin::test("t"), None, 16).unwrap_err();
        assert!(matches!(err, TransactionError::NilConfig));
    }

    #[test]
    fn test_construct_rejects_duplicate_app_id() {
        let config: Arc<dyn DomainConfig> = Arc::new(TestConfig {
            apps: vec![
                AppSpec { id: "echo1".to_string(), variant: AppVariant::Echo },
                AppSpec { id: "echo1".to_string(), variant: AppVariant::Echo },
            ],
            endpoints: vec![],
            errors: vec![],
        });
        let err = Transaction::construct(Origin::test("t"), Some(config), 16).unwrap_err();
        assert!(matches!(err, TransactionError::DuplicateAppId(_)));
    }

    #[test]
    fn test_construct_rejects_composite_app() {
        let config: Arc<dyn DomainConfig> = Arc::new(TestConfig {
            apps: vec![AppSpec { id: "c1".to_string(), variant: AppVariant::Composite }],
            endpoints: vec![],
            errors: vec![],
        });
        let err = Transaction::construct(Origin::test("t"), Some(config), 16).unwrap_err();
        assert!(matches!(err, TransactionError::CompositeNotSupported(_)));
    }

    #[test]
    fn test_construct_rejects_script_without_evaluator() {
        let config: Arc<dyn DomainConfig> = Arc::new(TestConfig {
            apps: vec![AppSpec {
                id: "s1".to_string(),
                variant: AppVariant::Script { evaluator: None },
            }],
            endpoints: vec![],
            errors: vec![],
        });
        let err = Transaction::construct(Origin::test("t"), Some(config), 16).unwrap_err();
        assert!(matches!(err, TransactionError::EvaluatorNil(_)));
    }

    #[test]
    fn test_happy_path_construction_and_validation() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        assert_eq!(tx.state(), SagaState::Created);
        tx.run_validation().unwrap();
        assert_eq!(tx.state(), SagaState::Validated);
        assert!(tx.is_valid());
    }

    #[test]
    fn test_validation_failure_drives_invalid() {
        let config: Arc<dyn DomainConfig> = Arc::new(TestConfig {
            apps: vec![],
            endpoints: vec![],
            errors: vec!["bad field".to_string()],
        });
        let tx = Transaction::construct(Origin::test("t"), Some(config), 16).unwrap();
        let err = tx.run_validation().unwrap_err();
        assert!(matches!(err, TransactionError::ValidationFailed(_)));
        assert_eq!(tx.state(), SagaState::Invalid);
        assert!(!tx.is_valid());
    }

    #[test]
    fn test_begin_execution_rejects_unvalidated() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        let err = tx.begin_execution().unwrap_err();
        assert!(matches!(err, TransactionError::NotValidated));
    }

    #[test]
    fn test_mark_failed_already_terminal_is_noop() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        tx.run_validation().unwrap();
        tx.begin_execution().unwrap();
        tx.mark_error("boom").unwrap();
        assert_eq!(tx.state(), SagaState::Error);
        let cancel = CancellationToken::new();
        assert!(tx.mark_failed(&cancel, "again").is_ok());
        assert_eq!(tx.state(), SagaState::Error);
    }

    #[test]
    fn test_mark_failed_checks_cancellation_first() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        tx.run_validation().unwrap();
        tx.begin_execution().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = tx.mark_failed(&cancel, "boom").unwrap_err();
        assert!(matches!(err, TransactionError::Cancelled));
        assert_eq!(tx.state(), SagaState::Executing);
    }

    #[test]
    fn test_resource_conflict_on_duplicate_file_logger_path() {
        let config: Arc<dyn DomainConfig> = Arc::new(TestConfig {
            apps: vec![],
            endpoints: vec![EndpointSpec {
                routes: vec![RouteSpec {
                    middlewares: vec![
                        MiddlewareSpec {
                            id: "a".to_string(),
                            middleware_type: MiddlewareType::FileLogger { output_path: "/var/log/x.log".to_string() },
                        },
                        MiddlewareSpec {
                            id: "b".to_string(),
                            middleware_type: MiddlewareType::FileLogger { output_path: "/var/log/x.log".to_string() },
                        },
                    ],
                }],
            }],
            errors: vec![],
        });
        let err = Transaction::construct(Origin::test("t"), Some(config), 16).unwrap_err();
        assert!(matches!(err, TransactionError::ResourceConflict(_)));
    }

    #[test]
    fn test_diagnostic_record_round_trips_core_fields() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        let record = tx.to_diagnostic_record();
        assert_eq!(record.id, tx.id().to_string());
        assert_eq!(record.state, "created");
        assert!(!record.is_valid);
    }

    #[test]
    fn test_diagnostic_record_serializes_to_json() {
        let tx = Transaction::construct(Origin::test("t"), Some(empty_config()), 16).unwrap();
        let json = tx.to_diagnostic_record().to_json().unwrap();
        assert!(json.contains("\"state\":\"created\""));
    }
}
