use crate::compiler::{CompilerBuilder, NodeRegistry, Route};
use crate::error::{GraphError, NamingConflict, StructuralError};
use crate::graph::containment::Containment;
use crate::graph::ids::IdGenerator;
use crate::graph::model::{Edge, EdgeSlot, Node, NodeId, NodePayload, Position, Scope, Slot};
use crate::graph::registry::{Assistant, AssistantRegistry, Variable, VariableRegistry};
use crate::steps::ActionStep;
use ahash::AHashSet;
use std::sync::Arc;

/// An immutable view of the automation graph.
///
/// Cloning is cheap; a snapshot never changes after it was taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Arc<Vec<Node>>,
    edges: Arc<Vec<Edge>>,
    variables: Arc<VariableRegistry>,
    assistants: Arc<AssistantRegistry>,
}

impl Graph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn assistants(&self) -> &AssistantRegistry {
        &self.assistants
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn containment(&self) -> Containment<'_> {
        Containment::new(self.nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        variables: VariableRegistry,
        assistants: AssistantRegistry,
    ) -> Self {
        Self {
            nodes: Arc::new(nodes),
            edges: Arc::new(edges),
            variables: Arc::new(variables),
            assistants: Arc::new(assistants),
        }
    }

    fn is_taken(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id) || self.edges.iter().any(|e| e.id == id)
    }
}

/// Owns the authoritative graph and applies one structural mutation at a time.
///
/// Every mutation either fully succeeds, swapping in new collections, or fails and
/// leaves the current graph untouched.
#[derive(Debug)]
pub struct GraphStore {
    graph: Graph,
    registry: Arc<NodeRegistry>,
    ids: IdGenerator,
    next_sequence: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(NodeRegistry::default()))
    }

    pub fn with_registry(registry: Arc<NodeRegistry>) -> Self {
        Self {
            graph: Graph::default(),
            registry,
            ids: IdGenerator::new(),
            next_sequence: 0,
        }
    }

    /// Replaces the id generator, e.g. with a seeded one.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub(crate) fn from_graph(graph: Graph, registry: Arc<NodeRegistry>) -> Self {
        let next_sequence = graph
            .nodes()
            .iter()
            .map(|n| n.sequence + 1)
            .max()
            .unwrap_or(0);
        Self {
            graph,
            registry,
            ids: IdGenerator::new(),
            next_sequence,
        }
    }

    pub fn snapshot(&self) -> Graph {
        self.graph.clone()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// A compiler over the current snapshot, sharing this store's registry.
    pub fn compiler(&self) -> CompilerBuilder {
        CompilerBuilder::new(self.snapshot()).with_registry(self.registry.clone())
    }

    pub fn add_node(
        &mut self,
        kind: &str,
        payload: NodePayload,
        scope: Option<Scope>,
    ) -> Result<NodeId, StructuralError> {
        self.check_placement(self.graph.nodes(), None, kind, &payload, scope.as_ref())?;

        let node = Node {
            id: self.next_id("node"),
            kind: kind.to_string(),
            scope,
            sequence: self.take_sequence(),
            position: Position::default(),
            payload,
        };
        let id = node.id.clone();
        tracing::debug!(
            "Adding {} node '{}' in scope {:?}",
            kind,
            id,
            node.parent_id()
        );

        let mut nodes = self.graph.nodes().to_vec();
        nodes.push(node);
        self.graph.nodes = Arc::new(nodes);
        Ok(id)
    }

    /// Adds an action built from a typed step and registers the variable it produces.
    ///
    /// Either both happen or neither does.
    pub fn add_step(&mut self, step: &ActionStep, scope: Option<Scope>) -> Result<NodeId, GraphError> {
        let payload = step.to_payload(self.graph.variables(), self.graph.assistants())?;
        if let Some(output) = step.output() {
            let pending = Variable {
                name: output.name.clone(),
                display_name: output.display_name.clone(),
                producing_node_id: NodeId::new(),
            };
            // Reject before the node exists so a conflict leaves no trace.
            self.graph.variables().with(pending)?;
        }

        let id = self.add_node(crate::graph::kinds::ACTION, payload, scope)?;
        if let Some(output) = step.output() {
            let variables = self.graph.variables().with(Variable {
                name: output.name.clone(),
                display_name: output.display_name.clone(),
                producing_node_id: id.clone(),
            })?;
            self.graph.variables = Arc::new(variables);
        }
        Ok(id)
    }

    /// Removes a node with everything contained in it, every edge touching a removed
    /// node, and every variable those nodes produced.
    pub fn remove_node(&mut self, id: &str) -> Result<(), StructuralError> {
        if self.graph.node(id).is_none() {
            return Err(StructuralError::NodeNotFound(id.to_string()));
        }

        let removed: AHashSet<NodeId> = {
            let containment = self.graph.containment();
            std::iter::once(id.to_string())
                .chain(containment.descendants(id).into_iter().map(|n| n.id.clone()))
                .collect()
        };
        tracing::debug!("Removing node '{}' and {} descendants", id, removed.len() - 1);

        let nodes: Vec<Node> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| !removed.contains(n.id.as_str()))
            .cloned()
            .collect();
        let edges: Vec<Edge> = self
            .graph
            .edges()
            .iter()
            .filter(|e| !removed.iter().any(|r| e.touches(r)))
            .cloned()
            .collect();
        let variables = self
            .graph
            .variables()
            .retained(|v| !removed.contains(v.producing_node_id.as_str()));

        self.graph.nodes = Arc::new(nodes);
        self.graph.edges = Arc::new(edges);
        self.graph.variables = Arc::new(variables);
        Ok(())
    }

    /// Draws an edge and places the target where the edge leads.
    ///
    /// A node has a single scope, so any other edge into the target is dropped.
    pub fn connect(&mut self, source: &str, target: &str, slot: EdgeSlot) -> Result<NodeId, StructuralError> {
        let edge = Edge {
            id: self.next_id("edge"),
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            source_slot: slot,
        };
        let id = edge.id.clone();
        self.apply_edge(None, edge)?;
        Ok(id)
    }

    /// Moves an existing edge and recomputes its target's scope in the same step.
    /// A previous target the edge no longer reaches falls back to the top level.
    pub fn reconnect(
        &mut self,
        edge_id: &str,
        new_source: &str,
        new_target: &str,
        new_slot: EdgeSlot,
    ) -> Result<(), StructuralError> {
        if self.graph.edge(edge_id).is_none() {
            return Err(StructuralError::EdgeNotFound(edge_id.to_string()));
        }
        let edge = Edge {
            id: edge_id.to_string(),
            source_node_id: new_source.to_string(),
            target_node_id: new_target.to_string(),
            source_slot: new_slot,
        };
        self.apply_edge(Some(edge_id), edge)
    }

    /// Deletes an edge; its target falls back to the top-level sequence.
    pub fn disconnect(&mut self, edge_id: &str) -> Result<(), StructuralError> {
        let edge = self
            .graph
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| StructuralError::EdgeNotFound(edge_id.to_string()))?;
        let target = self
            .graph
            .node(&edge.target_node_id)
            .ok_or_else(|| StructuralError::NodeNotFound(edge.target_node_id.clone()))?;
        self.check_placement(
            self.graph.nodes(),
            Some(&target.id),
            &target.kind,
            &target.payload,
            None,
        )?;

        let sequence = self.take_sequence();
        let nodes = self.with_scope(&edge.target_node_id, None, sequence);
        let edges: Vec<Edge> = self
            .graph
            .edges()
            .iter()
            .filter(|e| e.id != edge_id)
            .cloned()
            .collect();
        self.graph.nodes = Arc::new(nodes);
        self.graph.edges = Arc::new(edges);
        Ok(())
    }

    /// Updates a node's layout hint. Never changes scope or sequence.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), StructuralError> {
        if self.graph.node(id).is_none() {
            return Err(StructuralError::NodeNotFound(id.to_string()));
        }
        let nodes: Vec<Node> = self
            .graph
            .nodes()
            .iter()
            .map(|n| {
                let mut n = n.clone();
                if n.id == id {
                    n.position = position;
                }
                n
            })
            .collect();
        self.graph.nodes = Arc::new(nodes);
        Ok(())
    }

    pub fn register_variable(
        &mut self,
        name: &str,
        display_name: &str,
        producing_node_id: &str,
    ) -> Result<(), GraphError> {
        if self.graph.node(producing_node_id).is_none() {
            return Err(StructuralError::NodeNotFound(producing_node_id.to_string()).into());
        }
        let variables = self.graph.variables().with(Variable {
            name: name.to_string(),
            display_name: display_name.to_string(),
            producing_node_id: producing_node_id.to_string(),
        })?;
        tracing::debug!("Registered variable '{}' from '{}'", name, producing_node_id);
        self.graph.variables = Arc::new(variables);
        Ok(())
    }

    pub fn register_assistant(
        &mut self,
        name: &str,
        model: &str,
        personality: &str,
    ) -> Result<(), NamingConflict> {
        let assistants = self.graph.assistants().with(Assistant {
            name: name.to_string(),
            model: model.to_string(),
            personality: personality.to_string(),
        })?;
        tracing::debug!("Registered assistant '{}' ({})", name, model);
        self.graph.assistants = Arc::new(assistants);
        Ok(())
    }

    /// Validates and commits an edge insertion (`replacing == None`) or move.
    fn apply_edge(&mut self, replacing: Option<&str>, edge: Edge) -> Result<(), StructuralError> {
        let source = self
            .graph
            .node(&edge.source_node_id)
            .ok_or_else(|| StructuralError::NodeNotFound(edge.source_node_id.clone()))?;
        let target = self
            .graph
            .node(&edge.target_node_id)
            .ok_or_else(|| StructuralError::NodeNotFound(edge.target_node_id.clone()))?;

        let source_compiler = self.registry.get(&source.kind).ok_or_else(|| {
            StructuralError::InvalidEdgeSlot {
                kind: source.kind.clone(),
                slot: edge.source_slot.to_string(),
            }
        })?;
        // A moved edge leaves its old target without an incoming edge.
        let orphan = match replacing.and_then(|id| self.graph.edge(id)) {
            Some(old) if old.target_node_id != edge.target_node_id => {
                let node = self
                    .graph
                    .node(&old.target_node_id)
                    .ok_or_else(|| StructuralError::NodeNotFound(old.target_node_id.clone()))?;
                self.check_placement(
                    self.graph.nodes(),
                    Some(&node.id),
                    &node.kind,
                    &node.payload,
                    None,
                )?;
                Some(node.id.clone())
            }
            _ => None,
        };

        let scope = match source_compiler.route_edge(&edge.source_slot)? {
            Route::Slot(slot) => Some(Scope::new(source.id.clone(), slot)),
            Route::Sibling if orphan.as_deref() == Some(source.id.as_str()) => None,
            Route::Sibling => source.scope.clone(),
            Route::Root => None,
        };

        self.check_acyclic(&target.id, scope.as_ref())?;
        self.check_placement(
            self.graph.nodes(),
            Some(&target.id),
            &target.kind,
            &target.payload,
            scope.as_ref(),
        )?;

        tracing::debug!(
            "Edge '{}' now routes '{}' into {:?}",
            edge.id,
            target.id,
            scope.as_ref().map(Scope::parent_id)
        );

        let target_id = target.id.clone();
        let sequence = self.take_sequence();
        let mut nodes = self.with_scope(&target_id, scope, sequence);
        if let Some(orphan) = orphan {
            let sequence = self.take_sequence();
            for node in nodes.iter_mut().filter(|n| n.id == orphan) {
                node.scope = None;
                node.sequence = sequence;
            }
        }
        let mut edges: Vec<Edge> = self
            .graph
            .edges()
            .iter()
            .filter(|e| Some(e.id.as_str()) != replacing && e.target_node_id != target_id)
            .cloned()
            .collect();
        edges.push(edge);

        self.graph.nodes = Arc::new(nodes);
        self.graph.edges = Arc::new(edges);
        Ok(())
    }

    /// Checks that `scope` is a slot its owner declares, or that a slot-opening node
    /// (a switch case) opens a fresh slot on an owner that accepts it.
    pub(crate) fn check_placement(
        &self,
        nodes: &[Node],
        moving: Option<&str>,
        kind: &str,
        payload: &NodePayload,
        scope: Option<&Scope>,
    ) -> Result<(), StructuralError> {
        let opened = self.registry.get(kind).and_then(|c| c.opened_slot(payload));

        let Some(scope) = scope else {
            return match opened {
                Some(slot) => Err(StructuralError::InvalidCaseScope(format!(
                    "{} cannot be placed at the top level",
                    slot
                ))),
                None => Ok(()),
            };
        };

        let owner = nodes
            .iter()
            .find(|n| n.id == scope.owner && Some(n.id.as_str()) != moving)
            .ok_or_else(|| StructuralError::ScopeNotFound(scope.owner.clone()))?;
        let undeclared = || StructuralError::UndeclaredSlot {
            owner: owner.id.clone(),
            kind: owner.kind.clone(),
            slot: scope.slot.to_string(),
        };
        let owner_compiler = self.registry.get(&owner.kind).ok_or_else(undeclared)?;

        let containment = Containment::new(nodes.iter().filter(|n| Some(n.id.as_str()) != moving));
        let declared = owner_compiler.declared_slots(owner, &containment);

        match opened {
            Some(slot) => {
                if scope.slot != slot {
                    return Err(StructuralError::InvalidCaseScope(format!(
                        "{} was placed in the {} slot of '{}'",
                        slot, scope.slot, owner.id
                    )));
                }
                if !owner_compiler.accepts_opened_slot(&slot) {
                    return Err(undeclared());
                }
                if declared.contains(&slot) {
                    let value = match slot {
                        Slot::Case(value) => value,
                        other => other.to_string(),
                    };
                    return Err(StructuralError::DuplicateCase {
                        switch_id: owner.id.clone(),
                        value,
                    });
                }
            }
            None => {
                if matches!(scope.slot, Slot::Case(_)) {
                    return Err(StructuralError::InvalidCaseScope(format!(
                        "only case nodes may occupy the {} slot of '{}'",
                        scope.slot, owner.id
                    )));
                }
                if !declared.contains(&scope.slot) {
                    return Err(undeclared());
                }
            }
        }
        Ok(())
    }

    /// Rejects a move that would put `node_id` inside its own subtree.
    fn check_acyclic(&self, node_id: &str, scope: Option<&Scope>) -> Result<(), StructuralError> {
        let mut current = scope.map(|s| s.owner.as_str());
        let mut steps = 0;
        while let Some(owner) = current {
            if owner == node_id || steps > self.graph.nodes().len() {
                return Err(StructuralError::CyclicContainment {
                    node_id: node_id.to_string(),
                    owner: scope.map(|s| s.owner.clone()).unwrap_or_default(),
                });
            }
            current = self
                .graph
                .node(owner)
                .and_then(|n| n.scope.as_ref())
                .map(|s| s.owner.as_str());
            steps += 1;
        }
        Ok(())
    }

    fn with_scope(&self, id: &str, scope: Option<Scope>, sequence: u64) -> Vec<Node> {
        self.graph
            .nodes()
            .iter()
            .map(|n| {
                let mut n = n.clone();
                if n.id == id {
                    n.scope = scope.clone();
                    n.sequence = sequence;
                }
                n
            })
            .collect()
    }

    fn next_id(&mut self, prefix: &str) -> NodeId {
        let graph = &self.graph;
        self.ids.next_id(prefix, |candidate| graph.is_taken(candidate))
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
