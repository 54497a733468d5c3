use crate::compiler::condition::{render_condition, Comparison, LogicalOperator, Operand};
use crate::compiler::registry::{
    body_of, parse_config, require_fields, Route, SlotBody, StepCompiler,
};
use crate::compiler::runtime::quote;
use crate::error::{ConfigurationError, StructuralError};
use crate::graph::{kinds, Containment, EdgeSlot, Node, NodePayload, Slot};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Configuration of a `conditional` node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalConfig {
    pub comparisons: Vec<Comparison>,
    #[serde(default)]
    pub connectors: Vec<LogicalOperator>,
}

/// Configuration of a `switch` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub variable: Operand,
}

/// Configuration of a `case` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseConfig {
    pub value: String,
}

/// Terminates a non-empty body with a newline so closing tokens start on their own line.
fn block(body: &str) -> String {
    if body.is_empty() || body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{}\n", body)
    }
}

/// Leaf steps: the node's code fragments are emitted verbatim, in order.
pub struct ActionCompiler;

impl StepCompiler for ActionCompiler {
    fn kind(&self) -> &str {
        kinds::ACTION
    }

    fn validate(&self, node: &Node, _containment: &Containment<'_>) -> Result<(), ConfigurationError> {
        if node.payload.code.is_empty() {
            return Err(ConfigurationError::MissingField {
                node_id: node.id.clone(),
                field: "code".to_string(),
            });
        }
        Ok(())
    }

    fn declared_slots(&self, _node: &Node, _containment: &Containment<'_>) -> Vec<Slot> {
        Vec::new()
    }

    fn compile(&self, node: &Node, _bodies: &[SlotBody]) -> Result<String, ConfigurationError> {
        Ok(node.payload.code.concat())
    }
}

/// Two-way branch over a list of comparisons joined by logical connectors.
pub struct ConditionalCompiler;

impl StepCompiler for ConditionalCompiler {
    fn kind(&self) -> &str {
        kinds::CONDITIONAL
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["comparisons"]
    }

    fn validate(&self, node: &Node, _containment: &Containment<'_>) -> Result<(), ConfigurationError> {
        require_fields(node, self.required_fields())?;
        let config: ConditionalConfig = parse_config(node)?;
        if config.comparisons.is_empty() {
            return Err(ConfigurationError::NoComparisons(node.id.clone()));
        }
        if config.connectors.len() != config.comparisons.len() - 1 {
            return Err(ConfigurationError::ConnectorMismatch {
                node_id: node.id.clone(),
                comparisons: config.comparisons.len(),
                connectors: config.connectors.len(),
            });
        }
        for (i, comparison) in config.comparisons.iter().enumerate() {
            if !comparison.operator.is_unary() && comparison.right.is_none() {
                return Err(ConfigurationError::MissingField {
                    node_id: node.id.clone(),
                    field: format!("comparisons[{}].right", i),
                });
            }
        }
        Ok(())
    }

    fn declared_slots(&self, _node: &Node, _containment: &Containment<'_>) -> Vec<Slot> {
        vec![Slot::If, Slot::Else]
    }

    fn route_edge(&self, slot: &EdgeSlot) -> Result<Route, StructuralError> {
        match slot {
            EdgeSlot::Primary => Ok(Route::Slot(Slot::If)),
            EdgeSlot::Secondary => Ok(Route::Slot(Slot::Else)),
            other => Err(StructuralError::InvalidEdgeSlot {
                kind: self.kind().to_string(),
                slot: other.to_string(),
            }),
        }
    }

    fn compile(&self, node: &Node, bodies: &[SlotBody]) -> Result<String, ConfigurationError> {
        let config: ConditionalConfig = parse_config(node)?;
        let condition = render_condition(&config.comparisons, &config.connectors);
        Ok(format!(
            "if ({}) {{\n{}}} else {{\n{}}}\n",
            condition,
            block(body_of(bodies, &Slot::If)),
            block(body_of(bodies, &Slot::Else)),
        ))
    }
}

/// Multi-way dispatch; one slot per attached case plus a mandatory default.
pub struct SwitchCompiler;

impl StepCompiler for SwitchCompiler {
    fn kind(&self) -> &str {
        kinds::SWITCH
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["variable"]
    }

    fn validate(&self, node: &Node, containment: &Containment<'_>) -> Result<(), ConfigurationError> {
        require_fields(node, self.required_fields())?;
        let _config: SwitchConfig = parse_config(node)?;
        if containment.case_slots(&node.id).is_empty() {
            return Err(ConfigurationError::NoCases(node.id.clone()));
        }
        Ok(())
    }

    fn declared_slots(&self, node: &Node, containment: &Containment<'_>) -> Vec<Slot> {
        let mut slots = containment.case_slots(&node.id);
        slots.push(Slot::Default);
        slots
    }

    fn accepts_opened_slot(&self, slot: &Slot) -> bool {
        matches!(slot, Slot::Case(_))
    }

    fn route_edge(&self, slot: &EdgeSlot) -> Result<Route, StructuralError> {
        match slot {
            EdgeSlot::Default => Ok(Route::Slot(Slot::Default)),
            EdgeSlot::Case(value) => Ok(Route::Slot(Slot::Case(value.clone()))),
            EdgeSlot::Secondary => Ok(Route::Root),
            EdgeSlot::Primary => Err(StructuralError::InvalidEdgeSlot {
                kind: self.kind().to_string(),
                slot: slot.to_string(),
            }),
        }
    }

    fn compile(&self, node: &Node, bodies: &[SlotBody]) -> Result<String, ConfigurationError> {
        let config: SwitchConfig = parse_config(node)?;
        let mut out = format!("switch ({}) {{\n", config.variable);
        for body in bodies {
            if let Slot::Case(value) = &body.slot {
                out.push_str(&format!("case {}:\n{}break;\n", quote(value), block(&body.code)));
            }
        }
        out.push_str(&format!(
            "default:\n{}break;\n}}\n",
            block(body_of(bodies, &Slot::Default))
        ));
        Ok(out)
    }
}

/// One case of a switch. Adding it declares its value as a slot on the switch;
/// the switch emits the terminating `break`.
pub struct CaseCompiler;

impl StepCompiler for CaseCompiler {
    fn kind(&self) -> &str {
        kinds::CASE
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["value"]
    }

    fn validate(&self, node: &Node, _containment: &Containment<'_>) -> Result<(), ConfigurationError> {
        require_fields(node, self.required_fields())?;
        parse_config::<CaseConfig>(node).map(|_| ())
    }

    fn declared_slots(&self, _node: &Node, _containment: &Containment<'_>) -> Vec<Slot> {
        vec![Slot::Body]
    }

    fn opened_slot(&self, payload: &NodePayload) -> Option<Slot> {
        let value = payload
            .config
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Some(Slot::Case(value.to_string()))
    }

    fn route_edge(&self, slot: &EdgeSlot) -> Result<Route, StructuralError> {
        body_route(self.kind(), slot)
    }

    fn compile(&self, _node: &Node, bodies: &[SlotBody]) -> Result<String, ConfigurationError> {
        Ok(body_of(bodies, &Slot::Body).to_string())
    }
}

/// A plain container whose body is emitted as-is.
pub struct GroupCompiler;

impl StepCompiler for GroupCompiler {
    fn kind(&self) -> &str {
        kinds::GROUP
    }

    fn declared_slots(&self, _node: &Node, _containment: &Containment<'_>) -> Vec<Slot> {
        vec![Slot::Body]
    }

    fn route_edge(&self, slot: &EdgeSlot) -> Result<Route, StructuralError> {
        body_route(self.kind(), slot)
    }

    fn compile(&self, _node: &Node, bodies: &[SlotBody]) -> Result<String, ConfigurationError> {
        Ok(body_of(bodies, &Slot::Body).to_string())
    }
}

fn body_route(kind: &str, slot: &EdgeSlot) -> Result<Route, StructuralError> {
    match slot {
        EdgeSlot::Primary => Ok(Route::Slot(Slot::Body)),
        EdgeSlot::Secondary => Ok(Route::Root),
        other => Err(StructuralError::InvalidEdgeSlot {
            kind: kind.to_string(),
            slot: other.to_string(),
        }),
    }
}

/// Defines the built-in kinds, their registration, and their creation by name.
macro_rules! define_builtin_kinds {
    ( $( ($struct_name:ident, $kind:path) ),* $(,)? ) => {
        pub(super) fn register_default_compilers(registry: &mut AHashMap<String, Box<dyn StepCompiler>>) {
            $( registry.insert($kind.to_string(), Box::new($struct_name)); )*
        }

        pub(super) fn create_compiler_by_name(name: &str) -> Option<Box<dyn StepCompiler>> {
            match name {
                $( n if n == $kind => Some(Box::new($struct_name)), )*
                _ => None,
            }
        }
    };
}

define_builtin_kinds! {
    (ActionCompiler, kinds::ACTION),
    (ConditionalCompiler, kinds::CONDITIONAL),
    (SwitchCompiler, kinds::SWITCH),
    (CaseCompiler, kinds::CASE),
    (GroupCompiler, kinds::GROUP),
}
