use crate::compiler::registry::{NodeRegistry, SlotBody};
use crate::compiler::runtime::{POSTAMBLE, PREAMBLE};
use crate::error::CompileError;
use crate::graph::{Containment, Node};

/// Walks the containment tree depth first and emits the script text.
pub(super) struct ScriptGenerator<'a, 'g> {
    registry: &'a NodeRegistry,
    containment: &'a Containment<'g>,
    step_comments: bool,
    diagnostics: Vec<CompileError>,
}

impl<'a, 'g> ScriptGenerator<'a, 'g> {
    pub(super) fn new(
        registry: &'a NodeRegistry,
        containment: &'a Containment<'g>,
        step_comments: bool,
    ) -> Self {
        Self {
            registry,
            containment,
            step_comments,
            diagnostics: Vec::new(),
        }
    }

    /// Produces `PREAMBLE + root body + POSTAMBLE` and the diagnostics collected on the way.
    pub(super) fn generate(mut self) -> (String, Vec<CompileError>) {
        let containment = self.containment;
        let body = self.compile_scope(containment.root());

        let mut script = String::with_capacity(PREAMBLE.len() + body.len() + POSTAMBLE.len());
        script.push_str(PREAMBLE);
        script.push_str(&body);
        script.push_str(POSTAMBLE);
        (script, self.diagnostics)
    }

    fn compile_scope(&mut self, children: &[&'g Node]) -> String {
        children
            .iter()
            .filter_map(|node| self.compile_node(node))
            .collect()
    }

    fn compile_node(&mut self, node: &Node) -> Option<String> {
        let registry = self.registry;
        let containment = self.containment;

        let Some(compiler) = registry.get(&node.kind) else {
            let problem = CompileError::UnknownKind {
                node_id: node.id.clone(),
                kind: node.kind.clone(),
            };
            tracing::warn!("{}", problem);
            self.diagnostics.push(problem);
            return None;
        };

        let bodies: Vec<SlotBody> = compiler
            .declared_slots(node, containment)
            .into_iter()
            .map(|slot| {
                let code = self.compile_scope(containment.slot_children(&node.id, &slot));
                SlotBody { slot, code }
            })
            .collect();

        match compiler.compile(node, &bodies) {
            Ok(code) if self.step_comments && !node.payload.label.is_empty() => Some(format!(
                "// {}\n{}",
                node.payload.label.replace(['\n', '\r'], " "),
                code
            )),
            Ok(code) => Some(code),
            Err(e) => {
                tracing::warn!("Skipping node '{}': {}", node.id, e);
                self.diagnostics.push(CompileError::Rejected(e));
                None
            }
        }
    }
}
