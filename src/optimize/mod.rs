// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Allocation optimizer - equity-weighted linear program over shipments
//!
//! One decision variable `x[m, r] >= 0` per shipment edge. The program
//! maximizes `sum_r w(r) * (sum_m x[m, r]) / population(r) * 100` with
//! `w(r) = (100 - rate(r)) / 100`, subject to:
//!
//! 1. `sum x <= available_supply`
//! 2. `sum_r x[m, r] <= manufacturing_capacity(m)` for every manufacturer
//! 3. `x[m, r] <= capacity(m, r)` for every shipment
//! 4. optionally `sum_m x[m, r] <= uptake_cap * population(r)`

pub mod simplex;

pub use simplex::{LinearProgram, Solution, SolveStatus};

use crate::graph::SupplyGraph;
use crate::types::{Edge, Exclusion};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Default share of a recipient's population it can absorb in one round
pub const DEFAULT_UPTAKE_CAP: f64 = 0.1;

/// Default pivot budget for the solver
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Solver knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Per-recipient practical bound as a fraction of population; `None` disables it
    pub uptake_cap: Option<f64>,
    /// Pivot budget; running out is reported as infeasible
    pub max_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            uptake_cap: Some(DEFAULT_UPTAKE_CAP),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Quantity sent along one shipment edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Shipping manufacturer
    pub manufacturer: String,
    /// Receiving recipient
    pub recipient: String,
    /// Doses shipped
    pub quantity: f64,
}

/// Output of [`optimize`]. Numeric fields are only meaningful when
/// `status` is optimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Solver verdict
    pub status: SolveStatus,
    /// Solver explanation
    pub message: String,
    /// Objective at the optimum
    pub objective_value: Option<f64>,
    /// Sum of every flow
    pub total_allocated: f64,
    /// Doses per recipient
    pub allocation: BTreeMap<String, f64>,
    /// Doses per shipment edge
    pub flows: Vec<Flow>,
    /// Recipients left out of the program
    pub excluded: Vec<Exclusion>,
}

impl AllocationOutcome {
    fn without_solution(status: SolveStatus, message: String, excluded: Vec<Exclusion>) -> Self {
        Self {
            status,
            message,
            objective_value: None,
            total_allocated: 0.0,
            allocation: BTreeMap::new(),
            flows: Vec::new(),
            excluded,
        }
    }

    /// Whether the solver reached an optimum
    #[must_use]
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Doses allocated to a recipient, 0 if none
    #[must_use]
    pub fn allocated_to(&self, id: &str) -> f64 {
        self.allocation.get(id).copied().unwrap_or(0.0)
    }
}

/// Optimize with the default solver settings
#[must_use]
pub fn optimize(graph: &SupplyGraph, available_supply: f64) -> AllocationOutcome {
    optimize_with(graph, available_supply, &OptimizerConfig::default())
}

/// Formulate and solve the allocation program
#[must_use]
pub fn optimize_with(
    graph: &SupplyGraph,
    available_supply: f64,
    config: &OptimizerConfig,
) -> AllocationOutcome {
    let mut excluded = Vec::new();
    let mut populations: HashMap<&str, f64> = HashMap::new();
    for recipient in graph.recipients() {
        match recipient.exclusion_reason() {
            Some(reason) => {
                warn!("Excluding {} from optimization: {}", recipient.id, reason);
                excluded.push(Exclusion::new(&recipient.id, reason));
            }
            None => {
                if let Some(population) = recipient.usable_population() {
                    populations.insert(&recipient.id, population);
                }
            }
        }
    }

    if available_supply.is_nan() {
        return AllocationOutcome::without_solution(
            SolveStatus::Infeasible,
            "Available supply is not a number".into(),
            excluded,
        );
    }

    if available_supply < 0.0 {
        warn!("No allocation produced: available supply {} is negative", available_supply);
        return AllocationOutcome::without_solution(
            SolveStatus::Infeasible,
            format!("Available supply {available_supply} is negative"),
            excluded,
        );
    }

    let variables: Vec<&Edge> = graph
        .shipments()
        .filter(|e| populations.contains_key(e.target.as_str()))
        .collect();

    let objective: Vec<f64> = variables
        .iter()
        .map(|edge| {
            let population = populations[edge.target.as_str()];
            let weight = graph.node(&edge.target).map_or(0.0, |n| n.equity_weight());
            weight / population * 100.0
        })
        .collect();

    // Keep reduced costs well above the pivot tolerance for large populations
    let scale = objective.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let scaled = if scale > 0.0 {
        objective.iter().map(|c| c / scale).collect()
    } else {
        objective.clone()
    };

    let mut lp = LinearProgram::maximize(scaled);

    // +inf leaves the budget unconstrained
    if available_supply.is_finite() {
        lp.add_le((0..variables.len()).map(|j| (j, 1.0)).collect(), available_supply);
    }

    for manufacturer in graph.manufacturers() {
        let terms = terms_where(&variables, |e| e.source == manufacturer.id);
        if !terms.is_empty() {
            lp.add_le(terms, manufacturer.manufacturing_capacity.unwrap_or(0.0));
        }
    }

    for (j, edge) in variables.iter().enumerate() {
        lp.add_le(vec![(j, 1.0)], edge.capacity_or_zero());
    }

    if let Some(cap) = config.uptake_cap.filter(|c| c.is_finite() && *c >= 0.0) {
        for recipient in graph.recipients() {
            let Some(&population) = populations.get(recipient.id.as_str()) else {
                continue;
            };
            let terms = terms_where(&variables, |e| e.target == recipient.id);
            if !terms.is_empty() {
                lp.add_le(terms, cap * population);
            }
        }
    }

    debug!(
        "Allocation program: {} variables, {} constraints",
        lp.num_vars(),
        lp.num_constraints()
    );

    let solution = lp.solve(config.max_iterations);
    info!(
        "Solver finished with status {} after {} pivots",
        solution.status, solution.iterations
    );

    if solution.status != SolveStatus::Optimal {
        warn!("No allocation produced: {}", solution.message);
        return AllocationOutcome::without_solution(solution.status, solution.message, excluded);
    }

    let flows: Vec<Flow> = variables
        .iter()
        .zip(&solution.values)
        .map(|(edge, &quantity)| Flow {
            manufacturer: edge.source.clone(),
            recipient: edge.target.clone(),
            quantity,
        })
        .collect();

    let mut allocation: BTreeMap<String, f64> = populations
        .keys()
        .map(|id| ((*id).to_string(), 0.0))
        .collect();
    for flow in &flows {
        *allocation.entry(flow.recipient.clone()).or_insert(0.0) += flow.quantity;
    }

    let total_allocated: f64 = flows.iter().map(|f| f.quantity).sum();
    let objective_value: f64 = objective
        .iter()
        .zip(&solution.values)
        .map(|(c, x)| c * x)
        .sum();

    info!("Allocated {:.0} doses across {} recipients", total_allocated, allocation.len());

    AllocationOutcome {
        status: solution.status,
        message: solution.message,
        objective_value: Some(objective_value),
        total_allocated,
        allocation,
        flows,
        excluded,
    }
}

fn terms_where(variables: &[&Edge], pred: impl Fn(&Edge) -> bool) -> Vec<(usize, f64)> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, e)| pred(e))
        .map(|(j, _)| (j, 1.0))
        .collect()
}

/// A constraint an allocation breaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Which constraint, e.g. `manufacturer M capacity`
    pub constraint: String,
    /// Allowed upper bound
    pub limit: f64,
    /// Observed value
    pub actual: f64,
}

/// Re-check an optimal allocation against the graph without trusting the
/// solver. `tolerance` is relative to each limit.
#[must_use]
pub fn verify_allocation(
    graph: &SupplyGraph,
    outcome: &AllocationOutcome,
    available_supply: f64,
    tolerance: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut check = |constraint: String, limit: f64, actual: f64| {
        if actual > limit + tolerance * (1.0 + limit.abs()) {
            violations.push(Violation {
                constraint,
                limit,
                actual,
            });
        }
    };

    let mut shipped: HashMap<&str, f64> = HashMap::new();
    for flow in &outcome.flows {
        check(
            format!("flow {} -> {} non-negative", flow.manufacturer, flow.recipient),
            0.0,
            -flow.quantity,
        );
        let capacity = graph
            .edges_from(&flow.manufacturer)
            .into_iter()
            .find(|e| e.target == flow.recipient)
            .map_or(0.0, Edge::capacity_or_zero);
        check(
            format!("edge {} -> {} capacity", flow.manufacturer, flow.recipient),
            capacity,
            flow.quantity,
        );
        *shipped.entry(flow.manufacturer.as_str()).or_insert(0.0) += flow.quantity;
    }

    for manufacturer in graph.manufacturers() {
        let total = shipped.get(manufacturer.id.as_str()).copied().unwrap_or(0.0);
        check(
            format!("manufacturer {} capacity", manufacturer.id),
            manufacturer.manufacturing_capacity.unwrap_or(0.0),
            total,
        );
    }

    let flow_total: f64 = outcome.flows.iter().map(|f| f.quantity).sum();
    check("global supply budget".into(), available_supply, flow_total);

    let allocation_total: f64 = outcome.allocation.values().sum();
    check(
        "allocation matches flows".into(),
        0.0,
        (allocation_total - outcome.total_allocated).abs(),
    );

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn two_recipients() -> SupplyGraph {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 1000.0)).unwrap();
        graph.add_node(Node::recipient("A", 100.0, 0.0)).unwrap();
        graph.add_node(Node::recipient("B", 900.0, 50.0)).unwrap();
        graph.add_shipment("M", "A", 1000.0, 0.0).unwrap();
        graph.add_shipment("M", "B", 1000.0, 0.0).unwrap();
        graph
    }

    #[test]
    fn test_uptake_cap_then_remaining_supply() {
        let graph = two_recipients();
        let outcome = optimize(&graph, 500.0);

        assert!(outcome.is_optimal());
        assert!((outcome.allocated_to("A") - 10.0).abs() < 1e-6);
        assert!((outcome.allocated_to("B") - 90.0).abs() < 1e-6);
        assert!((outcome.total_allocated - 100.0).abs() < 1e-6);
        assert!(verify_allocation(&graph, &outcome, 500.0, 1e-6).is_empty());
    }

    #[test]
    fn test_without_uptake_cap_prefers_low_coverage() {
        let graph = two_recipients();
        let config = OptimizerConfig {
            uptake_cap: None,
            ..OptimizerConfig::default()
        };
        let outcome = optimize_with(&graph, 500.0, &config);

        assert!(outcome.is_optimal());
        assert!((outcome.allocated_to("A") - 500.0).abs() < 1e-6);
        assert!(outcome.allocated_to("B").abs() < 1e-6);
        // 1.0 / 100 * 100 per dose
        assert!((outcome.objective_value.unwrap() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_manufacturer_capacity_binds() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 50.0)).unwrap();
        graph.add_node(Node::recipient("A", 1000.0, 0.0)).unwrap();
        graph.add_shipment("M", "A", 1000.0, 0.0).unwrap();

        let outcome = optimize(&graph, 1e9);
        assert!((outcome.total_allocated - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_edge_capacity_binds() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 1000.0)).unwrap();
        graph.add_node(Node::recipient("A", 1000.0, 0.0)).unwrap();
        graph.add_shipment("M", "A", 7.0, 0.0).unwrap();

        let outcome = optimize(&graph, 1e9);
        assert!((outcome.allocated_to("A") - 7.0).abs() < 1e-6);
        assert_eq!(outcome.flows.len(), 1);
    }

    #[test]
    fn test_negative_supply_is_infeasible() {
        let outcome = optimize(&two_recipients(), -1.0);

        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.allocation.is_empty());
        assert!(outcome.objective_value.is_none());
        assert_eq!(outcome.total_allocated, 0.0);
    }

    #[test]
    fn test_negative_supply_is_infeasible_at_large_scale() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 1e9)).unwrap();
        graph.add_node(Node::recipient("A", 1e9, 0.0)).unwrap();
        graph.add_shipment("M", "A", 1e9, 0.0).unwrap();

        for supply in [-1.0, -50.0, -1e-3] {
            let outcome = optimize(&graph, supply);
            assert_eq!(outcome.status, SolveStatus::Infeasible, "supply {supply}");
            assert!(outcome.allocation.is_empty());
            assert!(outcome.flows.is_empty());
        }
    }

    #[test]
    fn test_negative_infinite_supply_is_infeasible() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 1e9)).unwrap();
        graph.add_node(Node::recipient("A", 1e9, 0.0)).unwrap();
        graph.add_shipment("M", "A", 1e9, 0.0).unwrap();

        let outcome = optimize(&graph, f64::NEG_INFINITY);
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.allocation.is_empty());
        assert_eq!(outcome.total_allocated, 0.0);

        let unlimited = optimize(&graph, f64::INFINITY);
        assert!(unlimited.is_optimal());
        assert!((unlimited.total_allocated - 1e8).abs() < 1.0);
    }

    #[test]
    fn test_zero_population_recipient_is_excluded() {
        let mut graph = two_recipients();
        graph.add_node(Node::recipient("Z", 0.0, 0.0)).unwrap();
        graph.add_shipment("M", "Z", 100.0, 0.0).unwrap();

        let outcome = optimize(&graph, 500.0);
        assert!(outcome.is_optimal());
        assert_eq!(outcome.excluded, vec![Exclusion::new("Z", "population is not positive")]);
        assert!(!outcome.allocation.contains_key("Z"));
    }

    #[test]
    fn test_no_shipments_is_trivially_optimal() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::recipient("A", 10.0, 0.0)).unwrap();

        let outcome = optimize(&graph, 100.0);
        assert!(outcome.is_optimal());
        assert_eq!(outcome.total_allocated, 0.0);
        assert_eq!(outcome.allocated_to("A"), 0.0);
    }

    #[test]
    fn test_large_populations_still_allocate() {
        let mut graph = SupplyGraph::new();
        graph.add_node(Node::manufacturer("M", 5e8)).unwrap();
        graph.add_node(Node::recipient("IN", 1.4e9, 60.0)).unwrap();
        graph.add_node(Node::recipient("NG", 2.1e8, 10.0)).unwrap();
        graph.add_shipment("M", "IN", 5e8, 0.0).unwrap();
        graph.add_shipment("M", "NG", 5e8, 0.0).unwrap();

        let outcome = optimize(&graph, 1e8);
        assert!(outcome.is_optimal());
        assert!((outcome.total_allocated - 1e8).abs() < 1.0);
        // NG has the larger per-dose weight; it fills to its 10% cap first
        assert!((outcome.allocated_to("NG") - 2.1e7).abs() < 1.0);
        assert!(verify_allocation(&graph, &outcome, 1e8, 1e-6).is_empty());
    }

    #[test]
    fn test_verify_flags_overshoot() {
        let graph = two_recipients();
        let mut outcome = optimize(&graph, 500.0);
        outcome.flows[0].quantity = 5000.0;

        let violations = verify_allocation(&graph, &outcome, 500.0, 1e-6);
        assert!(violations.iter().any(|v| v.constraint.contains("capacity")));
        assert!(violations.iter().any(|v| v.constraint == "global supply budget"));
    }
}
