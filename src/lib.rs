// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Vaxflow library - equity-weighted vaccine supply allocation
//!
//! This crate builds a capacitated distribution network over manufacturers
//! and recipients, analyses its structure (centrality, bottlenecks), solves a
//! linear program that spreads a fixed supply budget across the network, and
//! measures how the allocation changes coverage inequality.
//!
//! The pipeline is a single static snapshot per invocation:
//!
//! ```text
//! Dataset -> builder::build -> SupplyGraph -+-> analysis::analyze
//!                                           +-> optimize::optimize -> equity::evaluate
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod analysis;
pub mod builder;
pub mod config;
pub mod dataset;
pub mod equity;
pub mod error;
pub mod graph;
pub mod optimize;
pub mod report;

/// Core data types shared by every pipeline stage
pub mod types {
    use serde::{Deserialize, Serialize};

    // =========================================================================
    // Roles and edge kinds
    // =========================================================================

    /// Role of an entity in the distribution network
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum Role {
        /// Produces supply; never receives an allocation
        Manufacturer,
        /// Receives supply; never ships it
        Recipient,
    }

    impl Role {
        /// Short label used in reports and DOT output
        #[must_use]
        pub fn label(&self) -> &'static str {
            match self {
                Self::Manufacturer => "manufacturer",
                Self::Recipient => "recipient",
            }
        }
    }

    /// Kind of relation carried by an edge
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum EdgeKind {
        /// Recipient to recipient mobility/proximity link
        Transport,
        /// Manufacturer to recipient supply link
        Shipment,
    }

    // =========================================================================
    // Node
    // =========================================================================

    /// A manufacturer or recipient in the network.
    ///
    /// Defaults live here and nowhere else: a missing vaccination rate is 0,
    /// a missing population leaves the recipient unusable for optimization
    /// and equity evaluation.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Node {
        /// Stable entity code
        pub id: String,
        /// Display name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        /// Manufacturer or recipient
        pub role: Role,
        /// Population (recipients only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub population: Option<f64>,
        /// Current coverage percentage in [0, 100]
        #[serde(default)]
        pub vaccination_rate: f64,
        /// Total producible supply (manufacturers only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub manufacturing_capacity: Option<f64>,
    }

    impl Node {
        /// Create a recipient node
        #[must_use]
        pub fn recipient(id: impl Into<String>, population: f64, vaccination_rate: f64) -> Self {
            Self {
                id: id.into(),
                name: None,
                role: Role::Recipient,
                population: Some(population),
                vaccination_rate,
                manufacturing_capacity: None,
            }
        }

        /// Create a manufacturer node
        #[must_use]
        pub fn manufacturer(id: impl Into<String>, manufacturing_capacity: f64) -> Self {
            Self {
                id: id.into(),
                name: None,
                role: Role::Manufacturer,
                population: None,
                vaccination_rate: 0.0,
                manufacturing_capacity: Some(manufacturing_capacity),
            }
        }

        /// Attach a display name
        #[must_use]
        pub fn with_name(mut self, name: impl Into<String>) -> Self {
            self.name = Some(name.into());
            self
        }

        /// Whether this node is a recipient
        #[must_use]
        pub fn is_recipient(&self) -> bool {
            self.role == Role::Recipient
        }

        /// Whether this node is a manufacturer
        #[must_use]
        pub fn is_manufacturer(&self) -> bool {
            self.role == Role::Manufacturer
        }

        /// `max(0, 1 - vaccination_rate / 100)`
        #[must_use]
        pub fn coverage_gap(&self) -> f64 {
            (1.0 - self.vaccination_rate / 100.0).max(0.0)
        }

        /// Objective multiplier `(100 - vaccination_rate) / 100`
        #[must_use]
        pub fn equity_weight(&self) -> f64 {
            (100.0 - self.vaccination_rate) / 100.0
        }

        /// Population if it is strictly positive
        #[must_use]
        pub fn usable_population(&self) -> Option<f64> {
            self.population.filter(|p| *p > 0.0)
        }

        /// Unvaccinated head count `population * (100 - rate) / 100`
        #[must_use]
        pub fn need(&self) -> Option<f64> {
            self.population
                .map(|p| p * (100.0 - self.vaccination_rate) / 100.0)
        }

        /// Reason this recipient cannot take part in optimization or
        /// equity evaluation, if any
        #[must_use]
        pub fn exclusion_reason(&self) -> Option<&'static str> {
            match self.population {
                None => Some("population missing"),
                Some(p) if p <= 0.0 => Some("population is not positive"),
                Some(_) => None,
            }
        }
    }

    // =========================================================================
    // Edge
    // =========================================================================

    /// Directed relation between two nodes
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Edge {
        /// Source node id
        pub source: String,
        /// Target node id
        pub target: String,
        /// Transport or shipment
        pub kind: EdgeKind,
        /// Upper bound on flow; always present on shipments
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub capacity: Option<f64>,
        /// Mobility strength (transport) or shipping priority (shipment)
        #[serde(default)]
        pub weight: f64,
    }

    impl Edge {
        /// Create a shipment edge
        #[must_use]
        pub fn shipment(
            source: impl Into<String>,
            target: impl Into<String>,
            capacity: f64,
            priority: f64,
        ) -> Self {
            Self {
                source: source.into(),
                target: target.into(),
                kind: EdgeKind::Shipment,
                capacity: Some(capacity),
                weight: priority,
            }
        }

        /// Create a transport edge
        #[must_use]
        pub fn transport(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
            Self {
                source: source.into(),
                target: target.into(),
                kind: EdgeKind::Transport,
                capacity: None,
                weight,
            }
        }

        /// Capacity, counting a missing one as zero
        #[must_use]
        pub fn capacity_or_zero(&self) -> f64 {
            self.capacity.unwrap_or(0.0)
        }
    }

    // =========================================================================
    // Input records
    // =========================================================================

    /// Prepared entity record handed to the graph builder
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct NodeRecord {
        /// Entity code
        pub id: String,
        /// Display name
        #[serde(default)]
        pub name: Option<String>,
        /// Population (required for recipients)
        #[serde(default)]
        pub population: Option<f64>,
        /// Current coverage percentage (defaults to 0)
        #[serde(default)]
        pub vaccination_rate: Option<f64>,
        /// Producible supply (required for manufacturers)
        #[serde(default)]
        pub manufacturing_capacity: Option<f64>,
    }

    impl NodeRecord {
        /// Record for a recipient
        #[must_use]
        pub fn recipient(id: impl Into<String>, population: f64, vaccination_rate: f64) -> Self {
            Self {
                id: id.into(),
                population: Some(population),
                vaccination_rate: Some(vaccination_rate),
                ..Self::default()
            }
        }

        /// Record for a manufacturer
        #[must_use]
        pub fn manufacturer(id: impl Into<String>, manufacturing_capacity: f64) -> Self {
            Self {
                id: id.into(),
                manufacturing_capacity: Some(manufacturing_capacity),
                ..Self::default()
            }
        }
    }

    // =========================================================================
    // Exclusions
    // =========================================================================

    /// A node left out of an aggregate computation, with the reason
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Exclusion {
        /// Node id
        pub id: String,
        /// Why it was skipped
        pub reason: String,
    }

    impl Exclusion {
        /// Create an exclusion entry
        #[must_use]
        pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
            Self {
                id: id.into(),
                reason: reason.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn test_equity_weight_and_gap() {
        let node = Node::recipient("KE", 1000.0, 25.0);
        assert!((node.equity_weight() - 0.75).abs() < 1e-12);
        assert!((node.coverage_gap() - 0.75).abs() < 1e-12);
        assert_eq!(node.need(), Some(750.0));
    }

    #[test]
    fn test_coverage_gap_never_negative() {
        let mut node = Node::recipient("GB", 10.0, 0.0);
        node.vaccination_rate = 100.0;
        assert_eq!(node.coverage_gap(), 0.0);
    }

    #[test]
    fn test_exclusion_reason() {
        assert!(Node::recipient("A", 10.0, 0.0).exclusion_reason().is_none());
        assert!(Node::recipient("B", 0.0, 0.0).exclusion_reason().is_some());

        let mut missing = Node::recipient("C", 1.0, 0.0);
        missing.population = None;
        assert_eq!(missing.exclusion_reason(), Some("population missing"));
    }

    #[test]
    fn test_role_serializes_upper_case() {
        let json = serde_json::to_string(&Role::Manufacturer).unwrap();
        assert_eq!(json, "\"MANUFACTURER\"");
    }
}
