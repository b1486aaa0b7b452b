// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Network analysis - centrality measures and bottleneck detection
//!
//! Every function here only reads the graph, so calling them repeatedly on
//! the same [`SupplyGraph`] yields identical results.

use crate::graph::SupplyGraph;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

/// A recipient is a bottleneck when its inbound capacity covers less than
/// this fraction of its need.
pub const BOTTLENECK_RATIO: f64 = 0.5;

/// A recipient whose inbound capacity cannot cover its need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    /// Recipient id
    pub id: String,
    /// Unvaccinated head count
    pub need: f64,
    /// Sum of capacity over all edges targeting the recipient
    pub incoming_capacity: f64,
    /// `incoming_capacity / need`; lower is worse
    pub severity: f64,
}

impl Bottleneck {
    /// Share of need the inbound capacity can meet, in percent
    #[must_use]
    pub fn coverage_pct(&self) -> f64 {
        self.severity * 100.0
    }
}

/// Structural metrics of a supply graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// `(in + out degree) / (|V| - 1)` per node
    pub degree_centrality: BTreeMap<String, f64>,
    /// Normalized shortest-path betweenness per node
    pub betweenness_centrality: BTreeMap<String, f64>,
    /// Bottlenecks, worst first
    pub bottlenecks: Vec<Bottleneck>,
    /// Ids of manufacturer nodes
    pub manufacturers: Vec<String>,
}

/// Run every analysis over the graph
#[must_use]
pub fn analyze(graph: &SupplyGraph) -> NetworkMetrics {
    info!(
        "Analyzing network with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let metrics = NetworkMetrics {
        degree_centrality: degree_centrality(graph),
        betweenness_centrality: betweenness_centrality(graph),
        bottlenecks: detect_bottlenecks(graph),
        manufacturers: graph.manufacturers().map(|n| n.id.clone()).collect(),
    };

    info!("Found {} bottlenecks", metrics.bottlenecks.len());
    metrics
}

/// Degree centrality of every node; 0 for isolated nodes and single-node graphs
#[must_use]
pub fn degree_centrality(graph: &SupplyGraph) -> BTreeMap<String, f64> {
    let inner = graph.inner();
    let n = inner.node_count();
    let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };

    inner
        .node_indices()
        .map(|idx| {
            let degree = inner.edges_directed(idx, Direction::Incoming).count()
                + inner.edges_directed(idx, Direction::Outgoing).count();
            (inner[idx].id.clone(), degree as f64 * scale)
        })
        .collect()
}

/// Betweenness centrality via Brandes' accumulation over unweighted
/// shortest paths, normalized by `(|V| - 1)(|V| - 2)`
#[must_use]
pub fn betweenness_centrality(graph: &SupplyGraph) -> BTreeMap<String, f64> {
    let inner = graph.inner();
    let n = inner.node_count();
    let mut centrality = vec![0.0_f64; n];

    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = VecDeque::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![-1_i64; n];
    let mut delta = vec![0.0_f64; n];

    for s in 0..n {
        stack.clear();
        queue.clear();
        for p in &mut preds {
            p.clear();
        }
        sigma.fill(0.0);
        dist.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for w in inner.neighbors_directed(NodeIndex::new(v), Direction::Outgoing) {
                let w = w.index();
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        1.0
    };
    debug!("Betweenness computed over {} sources", n);

    inner
        .node_indices()
        .map(|idx| (inner[idx].id.clone(), centrality[idx.index()] * scale))
        .collect()
}

/// Recipients whose inbound capacity covers less than half their need,
/// sorted by ascending severity and then descending need
#[must_use]
pub fn detect_bottlenecks(graph: &SupplyGraph) -> Vec<Bottleneck> {
    let mut bottlenecks: Vec<Bottleneck> = graph
        .recipients()
        .filter_map(|node| {
            let need = node.need()?;
            if need <= 0.0 {
                return None;
            }
            let incoming_capacity: f64 = graph
                .edges_to(&node.id)
                .iter()
                .map(|e| e.capacity_or_zero())
                .sum();
            let severity = incoming_capacity / need;
            (severity < BOTTLENECK_RATIO).then(|| Bottleneck {
                id: node.id.clone(),
                need,
                incoming_capacity,
                severity,
            })
        })
        .collect();

    bottlenecks.sort_by(|a, b| {
        a.severity
            .total_cmp(&b.severity)
            .then_with(|| b.need.total_cmp(&a.need))
    });
    bottlenecks
}

/// The `k` highest-scoring entries of a centrality map, ties broken by id
#[must_use]
pub fn top_ranked(scores: &BTreeMap<String, f64>, k: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = scores.iter().map(|(id, s)| (id.clone(), *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}
