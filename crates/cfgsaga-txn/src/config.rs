//! # Domain Configuration Contract
//!
//! The per-app configuration schemas (echo, script, MCP, composite), the
//! parser that produces them, and the RPC wire types are all external
//! collaborators — this crate only defines the *shape* a domain config
//! must expose so a `Transaction` can validate it and build runtime
//! artifacts from it. Concrete app/middleware schemas live outside this
//! workspace; what's here is contract only.

use std::fmt;
use std::sync::Arc;

/// A fully parsed, already-validated-by-its-own-rules domain configuration,
/// supplied by an external collaborator. Transaction construction runs its
/// own cross-cutting validation (duplicate ids, resource conflicts) on top
/// of whatever `validate()` checks internally.
pub trait DomainConfig: fmt::Debug + Send + Sync {
    /// Run the config's own field-level validation, returning one message
    /// per violation.
    fn validate(&self) -> Vec<String>;

    /// The apps declared across every route, deduplicated by id by the
    /// caller at construction time (not by this accessor).
    fn apps(&self) -> &[AppSpec];

    /// The endpoints declared by this configuration; each carries the
    /// routes (and their middleware references) reachable through it.
    fn endpoints(&self) -> &[EndpointSpec];
}

/// One app declaration: an identifier and the variant-specific payload
/// needed to build a runtime instance.
#[derive(Debug, Clone)]
pub struct AppSpec {
    /// Unique-within-config app identifier.
    pub id: String,
    /// The config variant and its payload.
    pub variant: AppVariant,
}

/// The app config variants named in scope. `Composite` is declared but
/// explicitly unsupported by the builder; `Unknown` covers anything the
/// external parser produced that this workspace doesn't recognize.
#[derive(Debug, Clone)]
pub enum AppVariant {
    /// Echoes requests back; no further payload required.
    Echo,
    /// Runs a pre-compiled script evaluator. `evaluator` is `None` when the
    /// external collaborator never compiled one.
    Script {
        evaluator: Option<Arc<dyn CompiledEvaluator>>,
    },
    /// Proxies to a pre-compiled MCP server instance.
    Mcp {
        server: Option<Arc<dyn CompiledMcpServer>>,
    },
    /// Composable app-of-apps; not implemented by any builder.
    Composite,
    /// A config variant this workspace does not recognize.
    Unknown(String),
}

/// A pre-compiled script evaluator, produced by an external collaborator
/// ahead of transaction construction.
pub trait CompiledEvaluator: fmt::Debug + Send + Sync {}

/// A pre-compiled MCP server instance, produced by an external
/// collaborator ahead of transaction construction.
pub trait CompiledMcpServer: fmt::Debug + Send + Sync {}

/// One endpoint's routes.
#[derive(Debug, Clone, Default)]
pub struct EndpointSpec {
    /// Routes reachable through this endpoint.
    pub routes: Vec<RouteSpec>,
}

/// One route's middleware references.
#[derive(Debug, Clone, Default)]
pub struct RouteSpec {
    /// Middlewares applied to requests matching this route, in the order
    /// they should be merged (duplicates across routes collapse to one
    /// instance at construction).
    pub middlewares: Vec<MiddlewareSpec>,
}

/// One middleware declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MiddlewareSpec {
    /// Middleware identifier, unique within its type.
    pub id: String,
    /// The middleware's variant and type-specific payload.
    pub middleware_type: MiddlewareType,
}

/// Middleware variants relevant to resource-conflict detection. Only the
/// logging middlewares claim an exclusive resource (their output path);
/// everything else passes through conflict detection untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MiddlewareType {
    /// Logs to the console; `output_path` is interpolated but not
    /// conflict-checked, since stdout/stderr are shared targets.
    ConsoleLogger { output_path: String },
    /// Logs to a file; two file loggers may not share an (expanded)
    /// output path.
    FileLogger { output_path: String },
    /// Any other middleware type this workspace doesn't constrain.
    Other(String),
}

/// A constructed runtime app instance, opaque to this crate beyond its id.
pub trait RuntimeApp: fmt::Debug + Send + Sync {
    /// The app id this instance was built from.
    fn id(&self) -> &str;
}

/// A constructed runtime middleware instance, opaque beyond its identity.
pub trait RuntimeMiddleware: fmt::Debug + Send + Sync {
    /// The middleware type name this instance was built from.
    fn middleware_type_name(&self) -> &str;
    /// The middleware id this instance was built from.
    fn id(&self) -> &str;
}

#[derive(Debug)]
struct BuiltApp {
    id: String,
    #[allow(dead_code)]
    variant_name: &'static str,
}

impl RuntimeApp for BuiltApp {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug)]
struct BuiltMiddleware {
    id: String,
    type_name: String,
}

impl RuntimeMiddleware for BuiltMiddleware {
    fn middleware_type_name(&self) -> &str {
        &self.type_name
    }
    fn id(&self) -> &str {
        &self.id
    }
}

/// Build a runtime app instance from its spec. Unknown variants and the
/// composite variant fail distinctly; script/MCP variants require a
/// pre-compiled artifact.
pub(crate) fn build_app(spec: &AppSpec) -> Result<Box<dyn RuntimeApp>, crate::error::TransactionError> {
    use crate::error::TransactionError;
    let variant_name = match &spec.variant {
        AppVariant::Echo => "echo",
        AppVariant::Script { evaluator } => {
            if evaluator.is_none() {
                return Err(TransactionError::EvaluatorNil(spec.id.clone()));
            }
            "script"
        }
        AppVariant::Mcp { server } => {
            if server.is_none() {
                return Err(TransactionError::CompiledEvaluatorNil(spec.id.clone()));
            }
            "mcp"
        }
        AppVariant::Composite => return Err(TransactionError::CompositeNotSupported(spec.id.clone())),
        AppVariant::Unknown(name) => return Err(TransactionError::UnknownAppType(name.clone())),
    };
    Ok(Box::new(BuiltApp {
        id: spec.id.clone(),
        variant_name,
    }))
}

/// Build a runtime middleware instance from its spec. Every named variant
/// here has a builder; there is no "unknown middleware" case at this layer
/// because `MiddlewareType::Other` already absorbs anything unrecognized
/// upstream — construction only fails for such entries.
pub(crate) fn build_middleware(
    spec: &MiddlewareSpec,
) -> Result<Box<dyn RuntimeMiddleware>, crate::error::TransactionError> {
    let type_name = match &spec.middleware_type {
        MiddlewareType::ConsoleLogger { .. } => "console_logger".to_string(),
        MiddlewareType::FileLogger { .. } => "file_logger".to_string(),
        MiddlewareType::Other(name) => {
            return Err(crate::error::TransactionError::UnknownAppType(name.clone()))
        }
    };
    Ok(Box::new(BuiltMiddleware {
        id: spec.id.clone(),
        type_name,
    }))
}
