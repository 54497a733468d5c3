use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a node or edge.
pub type NodeId = String;

/// Built-in kind tags understood by the default node registry.
pub mod kinds {
    pub const ACTION: &str = "action";
    pub const CONDITIONAL: &str = "conditional";
    pub const SWITCH: &str = "switch";
    pub const CASE: &str = "case";
    pub const GROUP: &str = "group";
}

/// A named branch slot declared by a control node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The owner's implicit body, also used for direct sequencing.
    Body,
    If,
    Else,
    Default,
    Case(String),
}

impl Slot {
    /// The suffix appended to the owner id in the persisted `parentId` form.
    fn suffix(&self) -> Option<String> {
        match self {
            Slot::Body => None,
            Slot::If => Some("if".to_string()),
            Slot::Else => Some("else".to_string()),
            Slot::Default => Some("default".to_string()),
            Slot::Case(value) => Some(format!("case-{}", value)),
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "if" => Some(Slot::If),
            "else" => Some(Slot::Else),
            "default" => Some(Slot::Default),
            other => other
                .strip_prefix("case-")
                .map(|value| Slot::Case(value.to_string())),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Body => write!(f, "body"),
            Slot::If => write!(f, "if"),
            Slot::Else => write!(f, "else"),
            Slot::Default => write!(f, "default"),
            Slot::Case(value) => write!(f, "case '{}'", value),
        }
    }
}

/// The containment relation of a node: which slot of which owner it lives in.
///
/// Independent of layout: only the scope decides where a node's code is nested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub owner: NodeId,
    pub slot: Slot,
}

impl Scope {
    pub fn new(owner: impl Into<NodeId>, slot: Slot) -> Self {
        Self {
            owner: owner.into(),
            slot,
        }
    }

    pub fn body(owner: impl Into<NodeId>) -> Self {
        Self::new(owner, Slot::Body)
    }

    pub fn if_branch(owner: impl Into<NodeId>) -> Self {
        Self::new(owner, Slot::If)
    }

    pub fn else_branch(owner: impl Into<NodeId>) -> Self {
        Self::new(owner, Slot::Else)
    }

    pub fn default_branch(owner: impl Into<NodeId>) -> Self {
        Self::new(owner, Slot::Default)
    }

    pub fn case(owner: impl Into<NodeId>, value: impl Into<String>) -> Self {
        Self::new(owner, Slot::Case(value.into()))
    }

    /// Renders the scope in its persisted `parentId` form, e.g. `node_1a2b-else`.
    pub fn parent_id(&self) -> String {
        match self.slot.suffix() {
            Some(suffix) => format!("{}-{}", self.owner, suffix),
            None => self.owner.clone(),
        }
    }

    /// Resolves a persisted `parentId` against the set of known node ids.
    ///
    /// Ids may themselves contain `-`, so the longest known owner prefix wins.
    pub fn parse(parent_id: &str, is_known: impl Fn(&str) -> bool) -> Option<Self> {
        if is_known(parent_id) {
            return Some(Self::body(parent_id));
        }
        parent_id
            .match_indices('-')
            .rev()
            .find_map(|(idx, _)| {
                let owner = &parent_id[..idx];
                if !is_known(owner) {
                    return None;
                }
                Slot::from_suffix(&parent_id[idx + 1..]).map(|slot| Self::new(owner, slot))
            })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parent_id())
    }
}

/// Opaque layout hint. Never read by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The kind-specific data carried by a node.
///
/// Only plain values can live here, so a payload always survives persistence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePayload {
    pub label: String,
    pub code: Vec<String>,
    pub config: serde_json::Value,
}

impl NodePayload {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, fragment: impl Into<String>) -> Self {
        self.code.push(fragment.into());
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// A single step of the automation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: String,
    pub scope: Option<Scope>,
    /// Creation-order index used to sequence siblings.
    pub sequence: u64,
    pub position: Position,
    pub payload: NodePayload,
}

impl Node {
    pub fn parent_id(&self) -> Option<String> {
        self.scope.as_ref().map(Scope::parent_id)
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.scope.as_ref().is_some_and(|s| s.owner == owner)
    }
}

/// The output handle an edge leaves its source node from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeSlot {
    /// `a`: the primary flow.
    Primary,
    /// `b`: the secondary or independent flow.
    Secondary,
    Default,
    Case(String),
}

impl From<String> for EdgeSlot {
    fn from(value: String) -> Self {
        match value.as_str() {
            "a" => EdgeSlot::Primary,
            "b" => EdgeSlot::Secondary,
            "default" => EdgeSlot::Default,
            _ => EdgeSlot::Case(value),
        }
    }
}

impl From<EdgeSlot> for String {
    fn from(slot: EdgeSlot) -> Self {
        match slot {
            EdgeSlot::Primary => "a".to_string(),
            EdgeSlot::Secondary => "b".to_string(),
            EdgeSlot::Default => "default".to_string(),
            EdgeSlot::Case(value) => value,
        }
    }
}

impl fmt::Display for EdgeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from(self.clone()))
    }
}

/// A visual connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: NodeId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub source_slot: EdgeSlot,
}

impl Edge {
    pub fn touches(&self, id: &str) -> bool {
        self.source_node_id == id || self.target_node_id == id
    }
}
