use thiserror::Error;

/// Errors raised at the graph mutation boundary when a change would break containment.
///
/// The store rejects the operation and keeps its previous state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("Scope owner '{0}' does not exist")]
    ScopeNotFound(String),

    #[error("Node '{owner}' ({kind}) does not declare a '{slot}' slot")]
    UndeclaredSlot {
        owner: String,
        kind: String,
        slot: String,
    },

    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("Id '{0}' is already in use")]
    DuplicateId(String),

    #[error("Switch '{switch_id}' already has a case for value '{value}'")]
    DuplicateCase { switch_id: String, value: String },

    #[error("Placing node '{node_id}' under '{owner}' would create a containment cycle")]
    CyclicContainment { node_id: String, owner: String },

    #[error("Edge slot '{slot}' is not valid on a '{kind}' source node")]
    InvalidEdgeSlot { kind: String, slot: String },

    #[error("Case node must be attached to a switch case slot: {0}")]
    InvalidCaseScope(String),
}

/// Errors raised when a variable or assistant name cannot be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingConflict {
    #[error("A variable named '{0}' already exists")]
    Variable(String),

    #[error("An assistant named '{0}' already exists")]
    Assistant(String),

    #[error("'{0}' is not a valid script identifier")]
    InvalidIdentifier(String),

    #[error("'{0}' is reserved by the script runtime")]
    ReservedName(String),
}

/// Errors reported when a node's configuration is not complete enough to compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Node '{node_id}' ({kind}) has an invalid configuration: {message}")]
    InvalidConfig {
        node_id: String,
        kind: String,
        message: String,
    },

    #[error("Node '{node_id}' is missing the required field '{field}'")]
    MissingField { node_id: String, field: String },

    #[error("Conditional '{0}' has no comparisons")]
    NoComparisons(String),

    #[error(
        "Conditional '{node_id}' has {comparisons} comparisons but {connectors} logical connectors"
    )]
    ConnectorMismatch {
        node_id: String,
        comparisons: usize,
        connectors: usize,
    },

    #[error("Switch '{0}' has no cases")]
    NoCases(String),

    #[error("Template references unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Assistant '{0}' is not registered")]
    UnknownAssistant(String),
}

/// Non-fatal diagnostics produced while generating a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Node '{node_id}' has an unregistered kind '{kind}' and was skipped")]
    UnknownKind { node_id: String, kind: String },

    #[error("Node was skipped: {0}")]
    Rejected(#[from] ConfigurationError),
}

/// Every configuration problem found before compiling; blocks script generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Graph has {} configuration error(s): {}", .errors.len(), join_errors(.errors))]
pub struct ValidationReport {
    pub errors: Vec<ConfigurationError>,
}

fn join_errors(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from transactional store operations that touch several registries at once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Naming(#[from] NamingConflict),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Errors that can occur while loading a persisted graph document.
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    #[error("Failed to parse graph JSON: {0}")]
    JsonParseError(String),

    #[error("Failed to serialize graph JSON: {0}")]
    JsonWriteError(String),

    #[error("Invalid graph structure: {0}")]
    Structural(#[from] StructuralError),

    #[error("Invalid graph registry: {0}")]
    Naming(#[from] NamingConflict),
}

/// Errors that can occur while persisting or loading a compiled script artifact.
#[derive(Error, Debug, Clone)]
pub enum ArtifactError {
    #[error("Artifact was built for runtime ABI {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("{0}")]
    Generic(String),
}
