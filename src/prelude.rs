//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the botflow crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use botflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/automation.json")?;
//! let rehydrated = GraphStore::from_json(&json, Arc::new(NodeRegistry::default()))?;
//! let compiled = rehydrated.store.compiler().build().compile()?;
//! println!("{}", compiled.script);
//! # Ok(())
//! # }
//! ```

// Graph model and store
pub use crate::graph::{
    Assistant, Edge, EdgeSlot, Graph, GraphDocument, GraphStore, IdGenerator, Node, NodeId,
    NodePayload, Position, Rehydrated, Scope, Slot, Variable, kinds,
};

// Compilation
pub use crate::compiler::{
    Comparison, ComparisonOperator, CompiledScript, Compiler, LogicalOperator, NodeRegistry,
    Operand, StepCompiler,
};

// Steps and artifacts
pub use crate::artifact::ScriptArtifact;
pub use crate::steps::{ActionStep, HttpMethod, OutputBinding};

// Error types
pub use crate::error::{
    CompileError, ConfigurationError, GraphError, NamingConflict, StructuralError,
    ValidationReport,
};

pub use serde_json::json;
pub use std::sync::Arc;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
