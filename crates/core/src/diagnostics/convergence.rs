use std::time::{Duration, Instant};

/// Monitors convergence of an iterative fit.
///
/// Each sweep records one change value. The fit has converged once the last
/// change falls below `tol`; it has run out once `max_iter` sweeps are
/// recorded or the optional time budget has elapsed.
#[derive(Debug)]
pub struct ConvergenceMonitor {
    tol: f64,
    max_iter: usize,
    deadline: Option<Instant>,
    changes: Vec<f64>,
}

impl ConvergenceMonitor {
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self {
            tol,
            max_iter,
            deadline: None,
            changes: Vec::new(),
        }
    }

    /// Stop once `budget` has elapsed from now.
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.deadline = budget.map(|b| Instant::now() + b);
        self
    }

    /// Record the change of a new sweep.
    pub fn record(&mut self, change: f64) {
        self.changes.push(change);
    }

    /// Check if convergence criterion is met.
    pub fn is_converged(&self) -> bool {
        self.changes.last().is_some_and(|&c| c < self.tol)
    }

    /// Check if maximum iterations reached.
    pub fn max_reached(&self) -> bool {
        self.changes.len() >= self.max_iter
    }

    pub fn budget_exhausted(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Change recorded for the last sweep (NaN before the first).
    pub fn last_change(&self) -> f64 {
        self.changes.last().copied().unwrap_or(f64::NAN)
    }

    /// Number of iterations recorded.
    pub fn n_iterations(&self) -> usize {
        self.changes.len()
    }
}
