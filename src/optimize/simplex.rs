// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dense two-phase simplex for `maximize c.x  s.t.  A x <= b, x >= 0`
//!
//! Rows with a negative right-hand side get an artificial variable and are
//! resolved in phase one. Pivoting follows Bland's rule, so the method
//! terminates on degenerate problems.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pivot and reduced-cost tolerance
const EPS: f64 = 1e-9;

/// Entries smaller than this are snapped to zero after a pivot
const SNAP: f64 = 1e-12;

/// Terminal state of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// A primal optimum was found
    Optimal,
    /// No point satisfies the constraints (also reported when the pivot
    /// budget runs out)
    Infeasible,
    /// The objective grows without bound
    Unbounded,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Optimal => "OPTIMAL",
            Self::Infeasible => "INFEASIBLE",
            Self::Unbounded => "UNBOUNDED",
        };
        f.write_str(s)
    }
}

/// Result of [`LinearProgram::solve`]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Terminal state
    pub status: SolveStatus,
    /// Human-readable explanation of the status
    pub message: String,
    /// `c.x` at the optimum; 0 unless `status` is optimal
    pub objective: f64,
    /// Primal values; empty unless `status` is optimal
    pub values: Vec<f64>,
    /// Pivots performed across both phases
    pub iterations: usize,
}

impl Solution {
    fn terminal(status: SolveStatus, message: impl Into<String>, iterations: usize) -> Self {
        Self {
            status,
            message: message.into(),
            objective: 0.0,
            values: Vec::new(),
            iterations,
        }
    }
}

/// A `<=` constraint in sparse form
#[derive(Debug, Clone, PartialEq)]
struct Constraint {
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

/// Linear program in canonical maximization form
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    /// Start a program maximizing `objective . x`
    #[must_use]
    pub fn maximize(objective: Vec<f64>) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    /// Add `sum(coef * x[var]) <= rhs`; terms on out-of-range variables are ignored
    pub fn add_le(&mut self, terms: Vec<(usize, f64)>, rhs: f64) {
        let n = self.objective.len();
        let terms = terms.into_iter().filter(|(var, _)| *var < n).collect();
        self.constraints.push(Constraint { terms, rhs });
    }

    /// Number of decision variables
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    /// Number of constraints
    #[must_use]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Solve, giving up after `max_iterations` pivots
    #[must_use]
    pub fn solve(&self, max_iterations: usize) -> Solution {
        if let Some(bad) = self
            .objective
            .iter()
            .chain(self.constraints.iter().flat_map(|c| c.terms.iter().map(|(_, a)| a)))
            .chain(self.constraints.iter().map(|c| &c.rhs))
            .find(|v| v.is_nan())
        {
            return Solution::terminal(
                SolveStatus::Infeasible,
                format!("Problem contains a non-numeric coefficient ({bad})"),
                0,
            );
        }

        if self.constraints.iter().any(|c| c.rhs.is_infinite() && c.rhs < 0.0) {
            return Solution::terminal(
                SolveStatus::Infeasible,
                "A constraint has an upper bound of negative infinity",
                0,
            );
        }

        let mut tableau = Tableau::new(self);
        let mut budget = Budget::new(max_iterations);

        if tableau.artificials > 0 {
            tableau.start_phase_one();
            let limit = tableau.cols();
            match tableau.run(limit, &mut budget) {
                Step::Optimal => {}
                Step::Unbounded => {
                    // Phase one is bounded above by zero, so this is numerical trouble
                    return Solution::terminal(
                        SolveStatus::Infeasible,
                        "Phase one failed to converge",
                        budget.used,
                    );
                }
                Step::OutOfBudget => return budget.exhausted(),
            }
            let tolerance = EPS * (1.0 + tableau.artificial_rhs);
            if tableau.objective_value() < -tolerance {
                debug!(
                    "Phase one residual {:.3e} exceeds tolerance",
                    -tableau.objective_value()
                );
                return Solution::terminal(
                    SolveStatus::Infeasible,
                    "The problem is infeasible",
                    budget.used,
                );
            }
            tableau.drive_out_artificials();
        }

        tableau.start_phase_two(&self.objective);
        let limit = tableau.structural_cols();
        match tableau.run(limit, &mut budget) {
            Step::Optimal => {}
            Step::Unbounded => {
                return Solution::terminal(
                    SolveStatus::Unbounded,
                    "The problem is unbounded",
                    budget.used,
                )
            }
            Step::OutOfBudget => return budget.exhausted(),
        }

        let values = tableau.primal(self.objective.len());
        let objective: f64 = values
            .iter()
            .zip(&self.objective)
            .map(|(x, c)| x * c)
            .sum();
        debug!("Simplex finished after {} pivots", budget.used);

        Solution {
            status: SolveStatus::Optimal,
            message: "Optimization terminated successfully".into(),
            objective,
            values,
            iterations: budget.used,
        }
    }
}

/// Remaining pivot allowance
struct Budget {
    limit: usize,
    used: usize,
}

impl Budget {
    fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    fn exhausted(&self) -> Solution {
        Solution::terminal(
            SolveStatus::Infeasible,
            format!("Iteration limit of {} pivots reached", self.limit),
            self.used,
        )
    }
}

enum Step {
    Optimal,
    Unbounded,
    OutOfBudget,
}

/// Column layout: `[structural | slack | artificial | rhs]`
struct Tableau {
    rows: Vec<Vec<f64>>,
    /// Reduced costs of `z - c.x = 0`; last entry holds `z`
    obj: Vec<f64>,
    basis: Vec<usize>,
    structural: usize,
    artificials: usize,
    /// Sum of `|b|` over rows that start with an artificial variable
    artificial_rhs: f64,
}

impl Tableau {
    fn new(lp: &LinearProgram) -> Self {
        let n = lp.objective.len();
        let m = lp.constraints.len();
        let artificials = lp.constraints.iter().filter(|c| c.rhs < 0.0).count();
        let width = n + m + artificials + 1;

        let mut rows = Vec::with_capacity(m);
        let mut basis = Vec::with_capacity(m);
        let mut next_artificial = n + m;
        let mut artificial_rhs = 0.0;

        for (i, constraint) in lp.constraints.iter().enumerate() {
            let mut row = vec![0.0; width];
            for &(var, coef) in &constraint.terms {
                row[var] += coef;
            }
            row[n + i] = 1.0;
            row[width - 1] = constraint.rhs;

            if constraint.rhs < 0.0 {
                artificial_rhs += -constraint.rhs;
                for v in &mut row {
                    *v = -*v;
                }
                row[next_artificial] = 1.0;
                basis.push(next_artificial);
                next_artificial += 1;
            } else {
                basis.push(n + i);
            }
            rows.push(row);
        }

        Self {
            rows,
            obj: vec![0.0; width],
            basis,
            structural: n + m,
            artificials,
            artificial_rhs,
        }
    }

    /// Columns other than the rhs
    fn cols(&self) -> usize {
        self.obj.len() - 1
    }

    /// Structural plus slack columns
    fn structural_cols(&self) -> usize {
        self.structural
    }

    fn rhs(&self) -> usize {
        self.obj.len() - 1
    }

    fn objective_value(&self) -> f64 {
        self.obj[self.rhs()]
    }

    /// Maximize `-sum(artificials)`
    fn start_phase_one(&mut self) {
        self.obj.fill(0.0);
        for col in self.structural..self.cols() {
            self.obj[col] = 1.0;
        }
        self.canonicalize();
    }

    fn start_phase_two(&mut self, objective: &[f64]) {
        self.obj.fill(0.0);
        for (col, c) in objective.iter().enumerate() {
            self.obj[col] = -c;
        }
        self.canonicalize();
    }

    /// Zero the reduced cost of every basic column
    fn canonicalize(&mut self) {
        for (i, &col) in self.basis.iter().enumerate() {
            let factor = self.obj[col];
            if factor != 0.0 {
                for (o, r) in self.obj.iter_mut().zip(&self.rows[i]) {
                    *o -= factor * r;
                }
            }
        }
    }

    /// Pivot artificial columns out of the basis where a structural
    /// column can replace them; rows with none are redundant and stay at zero
    fn drive_out_artificials(&mut self) {
        for i in 0..self.rows.len() {
            if self.basis[i] < self.structural {
                continue;
            }
            if let Some(col) = (0..self.structural).find(|&j| self.rows[i][j].abs() > EPS) {
                self.pivot(i, col);
            }
        }
    }

    /// Iterate until optimal over columns `0..limit`
    fn run(&mut self, limit: usize, budget: &mut Budget) -> Step {
        loop {
            // Bland: lowest-index improving column
            let Some(entering) = (0..limit).find(|&j| self.obj[j] < -EPS) else {
                return Step::Optimal;
            };

            let rhs = self.rhs();
            let mut leaving: Option<(usize, f64)> = None;
            for (i, row) in self.rows.iter().enumerate() {
                let a = row[entering];
                if a <= EPS {
                    continue;
                }
                let ratio = row[rhs] / a;
                leaving = match leaving {
                    Some((best, best_ratio))
                        if ratio > best_ratio + EPS
                            || ((ratio - best_ratio).abs() <= EPS
                                && self.basis[i] >= self.basis[best]) =>
                    {
                        Some((best, best_ratio))
                    }
                    _ => Some((i, ratio)),
                };
            }

            let Some((row, _)) = leaving else {
                return Step::Unbounded;
            };
            if budget.used >= budget.limit {
                return Step::OutOfBudget;
            }
            budget.used += 1;
            self.pivot(row, entering);
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let pivot = self.rows[row][col];
        for v in &mut self.rows[row] {
            *v /= pivot;
        }
        let pivot_row = self.rows[row].clone();

        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            eliminate(other, &pivot_row, col);
        }
        eliminate(&mut self.obj, &pivot_row, col);
        self.basis[row] = col;
    }

    fn primal(&self, n: usize) -> Vec<f64> {
        let rhs = self.rhs();
        let mut values = vec![0.0; n];
        for (i, &col) in self.basis.iter().enumerate() {
            if col < n {
                values[col] = self.rows[i][rhs].max(0.0);
            }
        }
        values
    }
}

fn eliminate(target: &mut [f64], pivot_row: &[f64], col: usize) {
    let factor = target[col];
    if factor == 0.0 {
        return;
    }
    for (t, p) in target.iter_mut().zip(pivot_row) {
        *t -= factor * p;
        if t.abs() < SNAP {
            *t = 0.0;
        }
    }
}
