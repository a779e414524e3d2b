//! Lagrangian relaxation of the continuous ratio problem.
//!
//! Timing constraints are relaxed with one multiplier `μ` per edge and
//! channel limits with one multiplier `λ` per active troncon. For fixed
//! multipliers the relaxed subproblem has a closed form,
//! `value = clamp(√(λ / Σ tdm_coef·μ), 1, max_choice)`, and the multipliers
//! are revised between iterations by [`update`](self::update).
//!
//! The solver keeps the best primal solution seen, writes one
//! `primal dual` line per iteration to an optional curve file, and stops
//! early once 70 iterations pass without a unit of improvement.

mod data;
mod init;
mod update;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tdm_db::XdrVarId;
use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode};
use tdm_timing::TimingGraph;
use tracing::{debug, info};

use crate::context::TdmContext;
use crate::error::SolveError;

pub use data::{LagData, MULTIPLIER_EPSILON};

/// Iterations without a unit of improvement before stopping.
pub const EARLY_BREAK_WINDOW: usize = 70;

/// Result of a Lagrangian run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagOutcome {
    /// Iterations executed.
    pub iterations: usize,
    /// Iteration whose solution was kept.
    pub best_iter: Option<usize>,
    /// Critical delay of the kept solution.
    pub primal: f64,
    /// Best dual bound evaluated at the end.
    pub dual: f64,
    /// `(primal - dual) / dual`.
    pub gap: f64,
}

/// The Lagrangian solver over a [`TdmContext`].
pub struct LagSolver<'a> {
    ctx: &'a mut TdmContext,
    data: LagData,
    iterations: usize,
}

impl<'a> LagSolver<'a> {
    /// Prepares zeroed multipliers for the context's optimized variables.
    pub fn new(ctx: &'a mut TdmContext) -> Self {
        let data = LagData::new(&ctx.db, &ctx.graph);
        let iterations = ctx.config.flow.lag_iter;
        Self {
            ctx,
            data,
            iterations,
        }
    }

    /// Overrides the iteration budget.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// The multipliers as of the last iteration.
    pub fn data(&self) -> &LagData {
        &self.data
    }

    /// Runs the solver on the context's worker pool, leaving the best
    /// solution in the database with arrival times updated.
    pub fn solve(&mut self, curve: Option<&Path>) -> Result<LagOutcome, SolveError> {
        info!(
            vars = self.data.troncon_vars.iter().map(Vec::len).sum::<usize>(),
            troncons = self.data.troncons.len(),
            iterations = self.iterations,
            "begin Lagrangian solving"
        );
        let mut curve = match curve {
            Some(path) => {
                let file = File::create(path).map_err(|e| SolveError::io(path, e))?;
                let mut w = BufWriter::new(file);
                writeln!(w, "{}", self.iterations).map_err(|e| SolveError::io(path, e))?;
                Some((path, w))
            }
            None => None,
        };

        let compute_dual = self.ctx.config.flow.compute_dual;
        let mut best_iter = None;
        let mut best_cost = f64::MAX;
        let mut best_vals = vec![0.0; self.iterations];
        let mut executed = 0;

        for i in 0..self.iterations {
            if i == 0 {
                self.init_multipliers();
            } else {
                self.update_multipliers(i);
            }
            self.solve_lrs();
            executed = i + 1;

            let primal = self.ctx.arrival_time();
            let dual = if compute_dual { self.dual() } else { 0.0 };
            if let Some((path, w)) = curve.as_mut() {
                writeln!(w, "{primal} {dual}").map_err(|e| SolveError::io(*path, e))?;
            }
            debug!(iter = i, primal, dual, "Lagrangian iteration");

            if i >= EARLY_BREAK_WINDOW && best_vals[i - EARLY_BREAK_WINDOW] - best_cost < 1.0 {
                info!(
                    iter = i,
                    window = EARLY_BREAK_WINDOW,
                    previous = best_vals[i - EARLY_BREAK_WINDOW],
                    best = best_cost,
                    "early break"
                );
                break;
            }
            if primal < best_cost {
                best_iter = Some(i);
                self.ctx.db.save_solution();
                best_cost = primal;
            }
            best_vals[i] = best_cost;
        }

        if let Some((path, mut w)) = curve {
            w.flush().map_err(|e| SolveError::io(path, e))?;
        }

        let mut dual = self.dual();
        if self.ctx.db.recover_solution() {
            self.ctx.update_arrival();
        }
        let primal = self.ctx.arrival_time();
        dual = dual.max(self.dual());
        let gap = (primal - dual) / dual;
        info!(
            best_iter = ?best_iter,
            primal,
            dual,
            gap,
            "recovered best Lagrangian solution"
        );
        Ok(LagOutcome {
            iterations: executed,
            best_iter,
            primal,
            dual,
            gap,
        })
    }

    fn init_multipliers(&mut self) {
        let TdmContext { db, graph, sink, .. } = &mut *self.ctx;
        init::init_mu(&mut self.data, db, graph);
        init::init_lambda(&mut self.data, graph, db);
        if !self.data.is_legal(graph) {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::new(Category::Solver, 1),
                    "initial multipliers do not conserve flow",
                )
                .with_note(format!("tolerance {MULTIPLIER_EPSILON}")),
            );
        }
        info!(
            zero_mu = self.data.mu.iter().filter(|&&m| m == 0.0).count(),
            mu = self.data.mu.len(),
            zero_lambda = self.data.lambda.iter().filter(|&&l| l == 0.0).count(),
            lambda = self.data.lambda.len(),
            "initialized Lagrange multipliers"
        );
    }

    fn update_multipliers(&mut self, iter: usize) {
        let ratio = update::step_ratio(iter);
        let TdmContext { db, graph, sink, .. } = &mut *self.ctx;
        update::update_mu(&mut self.data, graph, ratio, sink);
        update::update_lambda(&mut self.data, graph, db);
    }

    /// Sets every optimized variable to its closed-form value, then
    /// refreshes arrival times.
    fn solve_lrs(&mut self) {
        let data = &self.data;
        let TdmContext { db, graph, .. } = &mut *self.ctx;
        let jobs: Vec<(XdrVarId, f64)> = data
            .troncon_vars
            .iter()
            .zip(&data.lambda)
            .flat_map(|(vars, &lambda)| vars.iter().map(move |&v| (v, lambda)))
            .collect();
        let timing: &TimingGraph = graph;
        let values: Vec<(XdrVarId, f64, f64)> = jobs
            .par_iter()
            .map(|&(v, lambda)| {
                let sum = data.weighted_mu(v, timing);
                let value = if sum != 0.0 {
                    (lambda / sum).sqrt().clamp(1.0, data.max_choice)
                } else {
                    data.max_choice
                };
                (v, value, sum)
            })
            .collect();

        let zero_mu = values.iter().filter(|(_, _, sum)| *sum == 0.0).count();
        let at_lower = values.iter().filter(|(_, v, _)| *v == 1.0).count();
        let at_upper = values
            .iter()
            .filter(|(_, v, sum)| *v == data.max_choice && *sum != 0.0)
            .count();
        debug!(
            at_lower,
            at_upper,
            zero_mu,
            total = values.len(),
            "relaxed subproblem"
        );

        for (v, value, _) in values {
            db.set_value(v, value);
        }
        graph.update_arrival(db);
    }

    fn dual(&self) -> f64 {
        self.data.dual(&self.ctx.db, &self.ctx.graph)
    }
}

/// Runs the Lagrangian solver with the configured iteration budget.
pub fn solve_lagrangian(
    ctx: &mut TdmContext,
    curve: Option<&Path>,
) -> Result<LagOutcome, SolveError> {
    ctx.install(|ctx| LagSolver::new(ctx).solve(curve))
}
