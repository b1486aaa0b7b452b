// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Capacitated supply graph with petgraph backing for algorithms

use crate::error::ValidationError;
use crate::types::{Edge, EdgeKind, Node, Role};
use anyhow::{Context, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// Directed graph of manufacturers and recipients.
///
/// Mutation is only possible through the checked `add_*` methods, so every
/// instance upholds: unique ids, no self-loops, shipments run
/// manufacturer -> recipient, transports join two recipients, and all
/// capacities and populations are non-negative.
#[derive(Debug, Clone, Default)]
pub struct SupplyGraph {
    /// The underlying directed graph
    graph: DiGraph<Node, Edge>,
    /// Map from node ID to node index
    node_indices: HashMap<String, NodeIndex>,
}

/// Plain view of the graph used for JSON export
#[derive(Serialize)]
struct GraphSnapshot<'a> {
    nodes: Vec<&'a Node>,
    edges: Vec<&'a Edge>,
}

impl SupplyGraph {
    /// Create a new empty supply graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node after validating its attributes
    pub fn add_node(&mut self, node: Node) -> Result<NodeIndex, ValidationError> {
        if self.node_indices.contains_key(&node.id) {
            return Err(ValidationError::DuplicateNode { id: node.id });
        }
        validate_node(&node)?;

        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(id, idx);
        Ok(idx)
    }

    /// Add an edge, enforcing role and capacity invariants.
    ///
    /// Adding an edge that already exists between the same endpoints with
    /// the same kind is a no-op.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), ValidationError> {
        if edge.source == edge.target {
            return Err(ValidationError::SelfLoop { id: edge.source });
        }
        let from_idx = self.require(&edge.source)?;
        let to_idx = self.require(&edge.target)?;

        let from_role = self.graph[from_idx].role;
        let to_role = self.graph[to_idx].role;
        match edge.kind {
            EdgeKind::Shipment => {
                if from_role != Role::Manufacturer || to_role != Role::Recipient {
                    return Err(ValidationError::InvalidShipment {
                        from: edge.source,
                        to: edge.target,
                    });
                }
                if !edge.capacity.is_some_and(is_non_negative) {
                    return Err(ValidationError::InvalidCapacity {
                        from: edge.source,
                        to: edge.target,
                        value: edge.capacity,
                    });
                }
            }
            EdgeKind::Transport => {
                if from_role != Role::Recipient || to_role != Role::Recipient {
                    return Err(ValidationError::InvalidTransport {
                        from: edge.source,
                        to: edge.target,
                    });
                }
                if edge.capacity.is_some_and(|c| !is_non_negative(c)) {
                    return Err(ValidationError::InvalidCapacity {
                        from: edge.source,
                        to: edge.target,
                        value: edge.capacity,
                    });
                }
            }
        }

        let exists = self
            .graph
            .edges_connecting(from_idx, to_idx)
            .any(|e| e.weight().kind == edge.kind);
        if !exists {
            self.graph.add_edge(from_idx, to_idx, edge);
        }
        Ok(())
    }

    /// Add a manufacturer -> recipient shipment edge
    pub fn add_shipment(
        &mut self,
        manufacturer: &str,
        recipient: &str,
        capacity: f64,
        priority: f64,
    ) -> Result<(), ValidationError> {
        self.add_edge(Edge::shipment(manufacturer, recipient, capacity, priority))
    }

    /// Link two recipients with transport edges in both directions
    pub fn add_transport(&mut self, a: &str, b: &str, weight: f64) -> Result<(), ValidationError> {
        self.add_edge(Edge::transport(a, b, weight))?;
        self.add_edge(Edge::transport(b, a, weight))
    }

    fn require(&self, id: &str) -> Result<NodeIndex, ValidationError> {
        self.node_indices
            .get(id)
            .copied()
            .ok_or_else(|| ValidationError::UnknownNode { id: id.to_string() })
    }

    /// Get a node by ID
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_indices.get(id).map(|&idx| &self.graph[idx])
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Recipient nodes in insertion order
    pub fn recipients(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_recipient())
    }

    /// Manufacturer nodes in insertion order
    pub fn manufacturers(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_manufacturer())
    }

    /// Shipment edges in insertion order
    pub fn shipments(&self) -> impl Iterator<Item = &Edge> {
        self.edges().filter(|e| e.kind == EdgeKind::Shipment)
    }

    /// Edges leaving a node
    #[must_use]
    pub fn edges_from(&self, id: &str) -> Vec<&Edge> {
        self.edges_directed(id, Direction::Outgoing)
    }

    /// Edges arriving at a node
    #[must_use]
    pub fn edges_to(&self, id: &str) -> Vec<&Edge> {
        self.edges_directed(id, Direction::Incoming)
    }

    fn edges_directed(&self, id: &str, dir: Direction) -> Vec<&Edge> {
        match self.node_indices.get(id) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, dir)
                .map(|e| e.weight())
                .collect(),
            None => vec![],
        }
    }

    /// Borrow the petgraph backing store for algorithms
    #[must_use]
    pub fn inner(&self) -> &DiGraph<Node, Edge> {
        &self.graph
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph supply {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [style=filled];\n\n");

        for node in self.nodes() {
            let label = node.name.as_deref().unwrap_or(&node.id);
            let (shape, fill) = match node.role {
                Role::Manufacturer => ("box", "lightblue"),
                Role::Recipient => ("ellipse", "lightyellow"),
            };
            dot.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{:.1}%\", shape={}, fillcolor={}];\n",
                node.id, label, node.vaccination_rate, shape, fill
            ));
        }

        dot.push('\n');

        for edge in self.edges() {
            match edge.kind {
                EdgeKind::Shipment => dot.push_str(&format!(
                    "  \"{}\" -> \"{}\" [label=\"{:.0}\"];\n",
                    edge.source,
                    edge.target,
                    edge.capacity_or_zero()
                )),
                EdgeKind::Transport => dot.push_str(&format!(
                    "  \"{}\" -> \"{}\" [style=dashed, color=grey, label=\"{:.2}\"];\n",
                    edge.source, edge.target, edge.weight
                )),
            }
        }

        dot.push_str("}\n");
        dot
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        };
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize graph to JSON")
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn validate_node(node: &Node) -> Result<(), ValidationError> {
    let invalid = |field, value| ValidationError::InvalidAttribute {
        id: node.id.clone(),
        field,
        value,
    };

    if !(node.vaccination_rate.is_finite() && (0.0..=100.0).contains(&node.vaccination_rate)) {
        return Err(invalid("vaccination_rate", node.vaccination_rate));
    }

    match node.role {
        Role::Recipient => match node.population {
            None => Err(ValidationError::MissingPopulation { id: node.id.clone() }),
            Some(p) if !is_non_negative(p) => Err(invalid("population", p)),
            Some(_) => Ok(()),
        },
        Role::Manufacturer => match node.manufacturing_capacity {
            None => Err(ValidationError::MissingCapacity { id: node.id.clone() }),
            Some(c) if !is_non_negative(c) => Err(invalid("manufacturing_capacity", c)),
            Some(_) => Ok(()),
        },
    }
}
