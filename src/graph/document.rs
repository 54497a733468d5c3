use crate::compiler::NodeRegistry;
use crate::error::{CompileError, DocumentError, StructuralError};
use crate::graph::model::{Edge, Node, NodeId, NodePayload, Position, Scope};
use crate::graph::registry::{Assistant, AssistantRegistry, Variable, VariableRegistry};
use crate::graph::store::{Graph, GraphStore};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The persisted form of a node. Scope is flattened into the `parentId` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sequence: u64,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub payload: NodePayload,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind.clone(),
            parent_id: node.parent_id(),
            sequence: node.sequence,
            position: node.position,
            payload: node.payload.clone(),
        }
    }
}

/// The only persisted unit: four plain-data arrays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub assistants: Vec<Assistant>,
}

impl GraphDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::JsonParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::JsonWriteError(e.to_string()))
    }
}

impl From<&Graph> for GraphDocument {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes().iter().map(NodeRecord::from).collect(),
            edges: graph.edges().to_vec(),
            variables: graph.variables().entries().to_vec(),
            assistants: graph.assistants().entries().to_vec(),
        }
    }
}

/// A store rebuilt from a document, plus the nodes no registered kind could bind.
#[derive(Debug)]
pub struct Rehydrated {
    pub store: GraphStore,
    pub unbound: Vec<CompileError>,
}

impl GraphStore {
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument::from(self.graph())
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        self.to_document().to_json()
    }

    pub fn from_json(json: &str, registry: Arc<NodeRegistry>) -> Result<Rehydrated, DocumentError> {
        Self::rehydrate(GraphDocument::from_json(json)?, registry)
    }

    /// Rebuilds a store from persisted data, re-deriving every node's behavior from
    /// the registry and re-checking all structural invariants.
    pub fn rehydrate(document: GraphDocument, registry: Arc<NodeRegistry>) -> Result<Rehydrated, DocumentError> {
        let mut known: AHashSet<&str> = AHashSet::new();
        for id in document
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .chain(document.edges.iter().map(|e| e.id.as_str()))
        {
            if !known.insert(id) {
                return Err(StructuralError::DuplicateId(id.to_string()).into());
            }
        }
        let node_ids: AHashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();

        let nodes = document
            .nodes
            .iter()
            .map(|record| {
                let scope = match &record.parent_id {
                    Some(parent_id) => Some(
                        Scope::parse(parent_id, |id| node_ids.contains(id))
                            .ok_or_else(|| StructuralError::ScopeNotFound(parent_id.clone()))?,
                    ),
                    None => None,
                };
                Ok(Node {
                    id: record.id.clone(),
                    kind: record.kind.clone(),
                    scope,
                    sequence: record.sequence,
                    position: record.position,
                    payload: record.payload.clone(),
                })
            })
            .collect::<Result<Vec<Node>, StructuralError>>()?;

        check_acyclic(&nodes)?;

        for edge in &document.edges {
            for end in [&edge.source_node_id, &edge.target_node_id] {
                if !node_ids.contains(end.as_str()) {
                    return Err(StructuralError::NodeNotFound(end.clone()).into());
                }
            }
        }
        for variable in &document.variables {
            if !node_ids.contains(variable.producing_node_id.as_str()) {
                return Err(StructuralError::NodeNotFound(variable.producing_node_id.clone()).into());
            }
        }

        let variables = VariableRegistry::from_entries(document.variables.clone())?;
        let assistants = AssistantRegistry::from_entries(document.assistants.clone())?;

        let unbound: Vec<CompileError> = nodes
            .iter()
            .filter(|n| registry.binding(n).is_none())
            .map(|n| CompileError::UnknownKind {
                node_id: n.id.clone(),
                kind: n.kind.clone(),
            })
            .collect();
        for problem in &unbound {
            tracing::warn!("{}", problem);
        }

        let graph = Graph::from_parts(nodes, document.edges.clone(), variables, assistants);
        let store = GraphStore::from_graph(graph, registry);
        for node in store.graph().nodes() {
            // Children of an unbound owner are kept as-is; the owner is skipped at compile time.
            let owner_unbound = node
                .scope
                .as_ref()
                .and_then(|s| store.graph().node(&s.owner))
                .is_some_and(|owner| store.registry().binding(owner).is_none());
            if owner_unbound {
                continue;
            }
            store.check_placement(
                store.graph().nodes(),
                Some(&node.id),
                &node.kind,
                &node.payload,
                node.scope.as_ref(),
            )?;
        }

        tracing::debug!(
            "Rehydrated {} nodes, {} edges, {} variables, {} assistants",
            store.graph().nodes().len(),
            store.graph().edges().len(),
            store.graph().variables().len(),
            store.graph().assistants().len()
        );
        Ok(Rehydrated { store, unbound })
    }
}

/// Follows every node's owner chain and rejects chains that loop.
fn check_acyclic(nodes: &[Node]) -> Result<(), StructuralError> {
    let owners: AHashMap<&str, Option<&str>> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.scope.as_ref().map(|s| s.owner.as_str())))
        .collect();

    for node in nodes {
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut current = Some(node.id.as_str());
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(StructuralError::CyclicContainment {
                    node_id: node.id.clone(),
                    owner: id.to_string(),
                });
            }
            current = owners.get(id).copied().flatten();
        }
    }
    Ok(())
}
