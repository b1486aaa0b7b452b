// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validation errors raised while constructing the supply graph

use thiserror::Error;

/// A node or edge that violates the graph schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Recipient record without a population
    #[error("recipient {id} is missing a population")]
    MissingPopulation {
        /// Node id
        id: String,
    },

    /// Manufacturer record without a manufacturing capacity
    #[error("manufacturer {id} is missing a manufacturing capacity")]
    MissingCapacity {
        /// Node id
        id: String,
    },

    /// Numeric attribute out of range or not finite
    #[error("node {id} has invalid {field}: {value}")]
    InvalidAttribute {
        /// Node id
        id: String,
        /// Attribute name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// Two records share an id
    #[error("duplicate node id: {id}")]
    DuplicateNode {
        /// Node id
        id: String,
    },

    /// Edge endpoint not present in the graph
    #[error("unknown node: {id}")]
    UnknownNode {
        /// Node id
        id: String,
    },

    /// Edge from a node to itself
    #[error("self-loop on {id} is not allowed")]
    SelfLoop {
        /// Node id
        id: String,
    },

    /// Shipment not running manufacturer -> recipient
    #[error("shipment {from} -> {to} must run from a manufacturer to a recipient")]
    InvalidShipment {
        /// Source id
        from: String,
        /// Target id
        to: String,
    },

    /// Transport not joining two recipients
    #[error("transport {from} -> {to} must connect two recipients")]
    InvalidTransport {
        /// Source id
        from: String,
        /// Target id
        to: String,
    },

    /// Negative, NaN, or missing edge capacity where one is required
    #[error("edge {from} -> {to} has invalid capacity {value:?}")]
    InvalidCapacity {
        /// Source id
        from: String,
        /// Target id
        to: String,
        /// Offending value
        value: Option<f64>,
    },
}

impl ValidationError {
    /// Id of the node the error is attributed to
    #[must_use]
    pub fn node_id(&self) -> &str {
        match self {
            Self::MissingPopulation { id }
            | Self::MissingCapacity { id }
            | Self::InvalidAttribute { id, .. }
            | Self::DuplicateNode { id }
            | Self::UnknownNode { id }
            | Self::SelfLoop { id } => id,
            Self::InvalidShipment { from, .. }
            | Self::InvalidTransport { from, .. }
            | Self::InvalidCapacity { from, .. } => from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_node() {
        let err = ValidationError::MissingPopulation { id: "KE".into() };
        assert_eq!(err.to_string(), "recipient KE is missing a population");
        assert_eq!(err.node_id(), "KE");

        let err = ValidationError::InvalidShipment {
            from: "A".into(),
            to: "B".into(),
        };
        assert!(err.to_string().contains("A -> B"));
        assert_eq!(err.node_id(), "A");
    }
}
