// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph builder - turns prepared records into a supply graph
//!
//! One construction strategy for every caller:
//!
//! - each record becomes a node, a manufacturer if its id is in the
//!   manufacturer set and a recipient otherwise
//! - every manufacturer gets a shipment edge to every recipient with
//!   `capacity = manufacturing_capacity * (population / 1e6) * (100 - rate) / 100`
//! - every recipient pair whose relation weight exceeds the threshold gets a
//!   transport link (both directions)

use crate::error::ValidationError;
use crate::graph::SupplyGraph;
use crate::types::{Node, NodeRecord, Role};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Population unit used by the shipment capacity formula
pub const POPULATION_SCALE: f64 = 1e6;

/// Pairwise relation strength keyed by `(id_a, id_b)`
pub type RelationWeights = HashMap<(String, String), f64>;

/// What to do with a record that fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Log the record, leave it out, and keep going
    #[default]
    Skip,
    /// Abort construction on the first invalid record
    Fail,
}

/// Result of a lenient build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The constructed graph
    pub graph: SupplyGraph,
    /// Records that were left out, in input order
    pub rejected: Vec<ValidationError>,
}

/// Capacity of a shipment edge from a manufacturer to a recipient
#[must_use]
pub fn shipment_capacity(manufacturer: &Node, recipient: &Node) -> f64 {
    let capacity = manufacturer.manufacturing_capacity.unwrap_or(0.0);
    let population = recipient.population.unwrap_or(0.0);
    capacity * (population / POPULATION_SCALE) * (100.0 - recipient.vaccination_rate) / 100.0
}

/// Informational shipping priority for a recipient
#[must_use]
pub fn shipment_priority(recipient: &Node) -> f64 {
    (100.0 - recipient.vaccination_rate) * recipient.population.unwrap_or(0.0) / POPULATION_SCALE
}

/// Build a graph, failing on the first invalid record
pub fn build(
    nodes: &[NodeRecord],
    relation_weights: &RelationWeights,
    manufacturers: &HashSet<String>,
    supply_threshold: f64,
) -> Result<SupplyGraph, ValidationError> {
    let outcome = build_with_policy(
        nodes,
        relation_weights,
        manufacturers,
        supply_threshold,
        InvalidRecordPolicy::Fail,
    )?;
    Ok(outcome.graph)
}

/// Build a graph, skipping invalid records with a warning
#[must_use]
pub fn build_lenient(
    nodes: &[NodeRecord],
    relation_weights: &RelationWeights,
    manufacturers: &HashSet<String>,
    supply_threshold: f64,
) -> BuildOutcome {
    let mut rejected = Vec::new();
    let graph = assemble(
        nodes,
        relation_weights,
        manufacturers,
        supply_threshold,
        &mut |err| {
            warn!("Skipping {}: {}", err.node_id(), err);
            rejected.push(err);
            Ok(())
        },
    )
    .unwrap_or_default();
    BuildOutcome { graph, rejected }
}

/// Build a graph with an explicit invalid-record policy
pub fn build_with_policy(
    nodes: &[NodeRecord],
    relation_weights: &RelationWeights,
    manufacturers: &HashSet<String>,
    supply_threshold: f64,
    policy: InvalidRecordPolicy,
) -> Result<BuildOutcome, ValidationError> {
    match policy {
        InvalidRecordPolicy::Skip => Ok(build_lenient(
            nodes,
            relation_weights,
            manufacturers,
            supply_threshold,
        )),
        InvalidRecordPolicy::Fail => {
            let graph = assemble(
                nodes,
                relation_weights,
                manufacturers,
                supply_threshold,
                &mut |err| Err(err),
            )?;
            Ok(BuildOutcome {
                graph,
                rejected: Vec::new(),
            })
        }
    }
}

/// Shared construction; `on_invalid` decides whether an error aborts
fn assemble(
    nodes: &[NodeRecord],
    relation_weights: &RelationWeights,
    manufacturers: &HashSet<String>,
    supply_threshold: f64,
    on_invalid: &mut dyn FnMut(ValidationError) -> Result<(), ValidationError>,
) -> Result<SupplyGraph, ValidationError> {
    let mut graph = SupplyGraph::new();

    for record in nodes {
        let role = if manufacturers.contains(&record.id) {
            Role::Manufacturer
        } else {
            Role::Recipient
        };
        if let Err(err) = graph.add_node(node_from_record(record, role)) {
            on_invalid(err)?;
        }
    }

    for id in manufacturers {
        if !nodes.iter().any(|r| &r.id == id) {
            warn!("Manufacturer {} has no node record", id);
        }
    }

    let manufacturer_nodes: Vec<Node> = graph.manufacturers().cloned().collect();
    let recipient_nodes: Vec<Node> = graph.recipients().cloned().collect();

    for manufacturer in &manufacturer_nodes {
        for recipient in &recipient_nodes {
            let capacity = shipment_capacity(manufacturer, recipient);
            let priority = shipment_priority(recipient);
            if let Err(err) = graph.add_shipment(&manufacturer.id, &recipient.id, capacity, priority) {
                on_invalid(err)?;
            }
        }
    }

    // Sorted so repeated runs add edges in the same order
    let mut pairs: Vec<(&(String, String), &f64)> = relation_weights.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    for ((a, b), &weight) in pairs {
        if a == b || weight.is_nan() || weight <= supply_threshold {
            continue;
        }
        let both_recipients = [a, b]
            .iter()
            .all(|id| graph.node(id).is_some_and(Node::is_recipient));
        if !both_recipients {
            debug!("Ignoring relation {} - {}: not a recipient pair in the graph", a, b);
            continue;
        }
        if let Err(err) = graph.add_transport(a, b, weight) {
            on_invalid(err)?;
        }
    }

    info!(
        "Network created with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn node_from_record(record: &NodeRecord, role: Role) -> Node {
    Node {
        id: record.id.clone(),
        name: record.name.clone(),
        role,
        population: match role {
            Role::Recipient => record.population,
            Role::Manufacturer => None,
        },
        vaccination_rate: record.vaccination_rate.unwrap_or(0.0),
        manufacturing_capacity: match role {
            Role::Manufacturer => record.manufacturing_capacity,
            Role::Recipient => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    fn records() -> Vec<NodeRecord> {
        vec![
            NodeRecord::manufacturer("IN", 100.0),
            NodeRecord::recipient("KE", 2e6, 20.0),
            NodeRecord::recipient("ET", 1e6, 0.0),
        ]
    }

    fn manufacturers() -> HashSet<String> {
        ["IN".to_string()].into_iter().collect()
    }

    #[test]
    fn test_roles_assigned_from_manufacturer_set() {
        let graph = build(&records(), &RelationWeights::new(), &manufacturers(), 0.0).unwrap();

        assert!(graph.node("IN").unwrap().is_manufacturer());
        assert!(graph.node("KE").unwrap().is_recipient());
        assert_eq!(graph.node("IN").unwrap().population, None);
    }

    #[test]
    fn test_shipment_capacity_formula() {
        let graph = build(&records(), &RelationWeights::new(), &manufacturers(), 0.0).unwrap();

        let ke = graph.edges_to("KE");
        assert_eq!(ke.len(), 1);
        // 100 * 2 * 0.8
        assert!((ke[0].capacity.unwrap() - 160.0).abs() < 1e-9);

        let et = graph.edges_to("ET");
        assert!((et[0].capacity.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_transport_edges_respect_threshold() {
        let mut weights = RelationWeights::new();
        weights.insert(("KE".into(), "ET".into()), 0.9);
        weights.insert(("ET".into(), "KE".into()), 0.9);
        weights.insert(("KE".into(), "KE".into()), 5.0);

        let graph = build(&records(), &weights, &manufacturers(), 0.5).unwrap();
        let transports = graph
            .edges()
            .filter(|e| e.kind == EdgeKind::Transport)
            .count();
        assert_eq!(transports, 2);

        let graph = build(&records(), &weights, &manufacturers(), 0.95).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_relations_touching_manufacturers_are_ignored() {
        let mut weights = RelationWeights::new();
        weights.insert(("IN".into(), "KE".into()), 10.0);
        weights.insert(("KE".into(), "XX".into()), 10.0);

        let graph = build(&records(), &weights, &manufacturers(), 0.0).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_strict_build_fails_on_missing_population() {
        let mut nodes = records();
        nodes.push(NodeRecord {
            id: "NG".into(),
            ..NodeRecord::default()
        });

        let err = build(&nodes, &RelationWeights::new(), &manufacturers(), 0.0).unwrap_err();
        assert_eq!(err, ValidationError::MissingPopulation { id: "NG".into() });
    }

    #[test]
    fn test_strict_build_fails_on_missing_capacity() {
        let mut nodes = records();
        nodes[0].manufacturing_capacity = None;

        let err = build(&nodes, &RelationWeights::new(), &manufacturers(), 0.0).unwrap_err();
        assert_eq!(err, ValidationError::MissingCapacity { id: "IN".into() });
    }

    #[test]
    fn test_lenient_build_skips_invalid_records() {
        let mut nodes = records();
        nodes.push(NodeRecord {
            id: "NG".into(),
            ..NodeRecord::default()
        });

        let outcome = build_lenient(&nodes, &RelationWeights::new(), &manufacturers(), 0.0);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.graph.node_count(), 3);
        assert!(outcome.graph.node("NG").is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut weights = RelationWeights::new();
        weights.insert(("KE".into(), "ET".into()), 0.9);

        let a = build(&records(), &weights, &manufacturers(), 0.0).unwrap();
        let b = build(&records(), &weights, &manufacturers(), 0.0).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_missing_rate_defaults_to_zero() {
        let nodes = vec![
            NodeRecord::manufacturer("IN", 1.0),
            NodeRecord {
                id: "KE".into(),
                population: Some(1e6),
                ..NodeRecord::default()
            },
        ];
        let graph = build(&nodes, &RelationWeights::new(), &manufacturers(), 0.0).unwrap();
        assert_eq!(graph.node("KE").unwrap().vaccination_rate, 0.0);
    }
}
