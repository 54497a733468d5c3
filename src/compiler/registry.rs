use crate::compiler::kinds::{create_compiler_by_name, register_default_compilers};
use crate::error::{ConfigurationError, StructuralError};
use crate::graph::{Containment, EdgeSlot, Node, NodePayload, Slot};
use ahash::AHashMap;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::fmt;

/// Where an edge leaving a source node places its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Into a slot declared by the source node.
    Slot(Slot),
    /// Next to the source, in the source's own scope.
    Sibling,
    /// Out to the top-level sequence.
    Root,
}

/// The compiled text of one declared slot, handed to the owner's compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBody {
    pub slot: Slot,
    pub code: String,
}

/// Looks up the compiled body of `slot`, or an empty string if nothing lives there.
pub fn body_of<'b>(bodies: &'b [SlotBody], slot: &Slot) -> &'b str {
    bodies
        .iter()
        .find(|b| &b.slot == slot)
        .map(|b| b.code.as_str())
        .unwrap_or("")
}

/// Defines everything the editor and the code generator need to know about one node kind.
pub trait StepCompiler: Send + Sync {
    fn kind(&self) -> &str;

    /// Config fields that must be present before the node can compile.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn validate(&self, node: &Node, _containment: &Containment<'_>) -> Result<(), ConfigurationError> {
        require_fields(node, self.required_fields())
    }

    /// The scopes this node declares, in emission order.
    fn declared_slots(&self, node: &Node, containment: &Containment<'_>) -> Vec<Slot>;

    /// A slot that adding this node declares on its owner, e.g. a switch case.
    fn opened_slot(&self, _payload: &NodePayload) -> Option<Slot> {
        None
    }

    /// Whether a child may open `slot` on a node of this kind.
    fn accepts_opened_slot(&self, _slot: &Slot) -> bool {
        false
    }

    /// Maps an outgoing edge handle to the target's new scope.
    fn route_edge(&self, slot: &EdgeSlot) -> Result<Route, StructuralError> {
        match slot {
            EdgeSlot::Primary => Ok(Route::Sibling),
            EdgeSlot::Secondary => Ok(Route::Root),
            other => Err(StructuralError::InvalidEdgeSlot {
                kind: self.kind().to_string(),
                slot: other.to_string(),
            }),
        }
    }

    /// Produces this node's script text from its payload and its compiled slot bodies.
    fn compile(&self, node: &Node, bodies: &[SlotBody]) -> Result<String, ConfigurationError>;
}

/// Checks that every listed config field is present and non-null.
pub fn require_fields(node: &Node, fields: &[&str]) -> Result<(), ConfigurationError> {
    for field in fields {
        let present = node
            .payload
            .config
            .get(field)
            .is_some_and(|value| !value.is_null());
        if !present {
            return Err(ConfigurationError::MissingField {
                node_id: node.id.clone(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Deserializes the node's config into the kind's typed configuration.
pub fn parse_config<T: DeserializeOwned>(node: &Node) -> Result<T, ConfigurationError> {
    serde_json::from_value(node.payload.config.clone()).map_err(|e| {
        ConfigurationError::InvalidConfig {
            node_id: node.id.clone(),
            kind: node.kind.clone(),
            message: e.to_string(),
        }
    })
}

/// Table from kind tag to the compiler responsible for that kind.
pub struct NodeRegistry {
    compilers: AHashMap<String, Box<dyn StepCompiler>>,
}

pub struct NodeRegistryBuilder {
    compilers: AHashMap<String, Box<dyn StepCompiler>>,
}

impl NodeRegistryBuilder {
    pub fn new() -> Self {
        let mut compilers: AHashMap<String, Box<dyn StepCompiler>> = AHashMap::new();
        register_default_compilers(&mut compilers);
        Self { compilers }
    }

    /// Lets nodes tagged `user_kind` compile as the built-in `builtin_kind`.
    pub fn with_kind_alias(mut self, user_kind: &str, builtin_kind: &str) -> Self {
        match create_compiler_by_name(builtin_kind) {
            Some(compiler) => {
                self.compilers.insert(user_kind.to_string(), compiler);
            }
            None => tracing::warn!(
                "Ignoring alias '{}': '{}' is not a built-in kind",
                user_kind,
                builtin_kind
            ),
        }
        self
    }

    pub fn with_step_compiler(mut self, compiler: Box<dyn StepCompiler>) -> Self {
        self.compilers.insert(compiler.kind().to_string(), compiler);
        self
    }

    pub fn build(self) -> NodeRegistry {
        NodeRegistry {
            compilers: self.compilers,
        }
    }
}

impl Default for NodeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    pub fn builder() -> NodeRegistryBuilder {
        NodeRegistryBuilder::new()
    }

    pub fn get(&self, kind: &str) -> Option<&dyn StepCompiler> {
        self.compilers.get(kind).map(|c| c.as_ref())
    }

    /// Re-derives the behavior bound to a node from its kind tag.
    pub fn binding(&self, node: &Node) -> Option<&dyn StepCompiler> {
        self.get(&node.kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.compilers.contains_key(kind)
    }

    /// Registered kind tags in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.compilers.keys().map(String::as_str).sorted().collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        NodeRegistryBuilder::new().build()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
