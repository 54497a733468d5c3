use crate::error::{CompileError, ConfigurationError, ValidationReport};
use crate::graph::Graph;
use std::sync::Arc;

mod codegen;
pub mod condition;
pub mod kinds;
pub mod registry;
pub mod runtime;

use codegen::ScriptGenerator;

pub use condition::*;
pub use kinds::{
    ActionCompiler, CaseCompiler, CaseConfig, ConditionalCompiler, ConditionalConfig, GroupCompiler,
    SwitchCompiler, SwitchConfig,
};
pub use registry::*;

/// The result of a successful compile: the script and any nodes that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub script: String,
    pub diagnostics: Vec<CompileError>,
}

impl CompiledScript {
    /// The text between the fixed preamble and postamble.
    pub fn body(&self) -> &str {
        let end = self.script.len() - runtime::POSTAMBLE.len();
        &self.script[runtime::PREAMBLE.len()..end]
    }
}

pub struct Compiler {
    graph: Graph,
    registry: Arc<NodeRegistry>,
    step_comments: bool,
}

pub struct CompilerBuilder {
    graph: Graph,
    registry: Option<Arc<NodeRegistry>>,
    step_comments: bool,
}

impl CompilerBuilder {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            registry: None,
            step_comments: false,
        }
    }

    pub fn with_registry(mut self, registry: Arc<NodeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Prefixes each step's output with a `// <label>` line.
    pub fn with_step_comments(mut self, enabled: bool) -> Self {
        self.step_comments = enabled;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            graph: self.graph,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(NodeRegistry::default())),
            step_comments: self.step_comments,
        }
    }
}

impl Compiler {
    pub fn builder(graph: Graph) -> CompilerBuilder {
        CompilerBuilder::new(graph)
    }

    /// Collects every configuration problem in the graph, in node order.
    ///
    /// Nodes of unregistered kinds are not validated; they are reported by `compile`.
    pub fn validate(&self) -> Result<(), ValidationReport> {
        let containment = self.graph.containment();
        let errors: Vec<ConfigurationError> = self
            .graph
            .nodes()
            .iter()
            .filter_map(|node| {
                let compiler = self.registry.get(&node.kind)?;
                compiler.validate(node, &containment).err()
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationReport { errors })
        }
    }

    /// Validates, then generates the script for the graph snapshot.
    ///
    /// The output depends only on the snapshot, so compiling the same graph twice
    /// yields byte-identical text.
    pub fn compile(&self) -> Result<CompiledScript, ValidationReport> {
        tracing::debug!(
            "Compiling automation ({} nodes, {} edges)",
            self.graph.nodes().len(),
            self.graph.edges().len()
        );
        if let Err(report) = self.validate() {
            tracing::warn!("Compilation blocked: {}", report);
            return Err(report);
        }

        let containment = self.graph.containment();
        let generator = ScriptGenerator::new(&self.registry, &containment, self.step_comments);
        let (script, diagnostics) = generator.generate();

        tracing::info!(
            "Compiled automation into {} bytes ({} diagnostics)",
            script.len(),
            diagnostics.len()
        );
        Ok(CompiledScript {
            script,
            diagnostics,
        })
    }
}
