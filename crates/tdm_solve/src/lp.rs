//! Export of the ratio problem for an external LP/ILP solver.
//!
//! [`LpModel`] is a self-contained JSON description: the choice set, one
//! variable per optimized ratio, one timing constraint per graph edge and
//! one capacity constraint per active troncon. A solver implementing
//! [`ExternalSolver`] returns one value per model variable, which
//! [`import_solution`] writes back.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tdm_db::{TdmDb, TronconId, XdrVarId};
use tdm_timing::TimingGraph;
use tracing::info;

use crate::context::TdmContext;
use crate::error::SolveError;

/// Linearized slack ratio `k + b·value` of a variable's worst edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlackRatio {
    /// Constant term.
    pub k: f64,
    /// Coefficient of the ratio.
    pub b: f64,
}

/// An optimized ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpVariable {
    /// The resource-model variable.
    pub var: XdrVarId,
    /// Its troncon.
    pub troncon: TronconId,
    /// Direction on the troncon.
    pub forward: bool,
    /// Current ratio, usable as a warm start.
    pub value: f64,
    /// Slack ratio at the current timing, if the variable has edges.
    pub slack_ratio: Option<SlackRatio>,
}

/// `arrival(fanout) >= arrival(driver) + const_delay + tdm_coef · ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConstraint {
    /// Driver node index.
    pub driver: u32,
    /// Fanout node index.
    pub fanout: u32,
    /// Ratio-independent delay.
    pub const_delay: f64,
    /// Index into [`LpModel::variables`] for optimized edges.
    pub variable: Option<usize>,
    /// Fixed ratio of inter-device edges whose variable is not optimized.
    pub pinned_ratio: Option<f64>,
}

/// `Σ 1/ratio <= limit` over the listed variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityConstraint {
    /// The troncon.
    pub troncon: TronconId,
    /// Slot limit.
    pub limit: usize,
    /// Indices into [`LpModel::variables`].
    pub variables: Vec<usize>,
}

/// The ratio problem in solver-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpModel {
    /// Legal discrete ratios.
    pub choices: Vec<u32>,
    /// Delay per unit ratio.
    pub tdm_coef: f64,
    /// Virtual source node.
    pub source: u32,
    /// Virtual sink node; its arrival time is the objective.
    pub sink: u32,
    /// Critical delay at export time.
    pub sink_at: f64,
    /// Optimized ratios.
    pub variables: Vec<LpVariable>,
    /// One entry per timing edge.
    pub timing: Vec<TimingConstraint>,
    /// One entry per troncon with optimized ratios.
    pub capacity: Vec<CapacityConstraint>,
}

impl LpModel {
    /// Builds the model from the current ratios and timing.
    pub fn build(db: &TdmDb, graph: &TimingGraph) -> Self {
        let mut index_of = vec![None; db.vars().len()];
        let variables: Vec<LpVariable> = db
            .opt_vars()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                index_of[v.index()] = Some(i);
                let var = db.var(v);
                LpVariable {
                    var: v,
                    troncon: var.troncon,
                    forward: var.forward,
                    value: var.value,
                    slack_ratio: graph
                        .slack_ratio_coef(v, db)
                        .map(|(k, b)| SlackRatio { k, b }),
                }
            })
            .collect();

        let timing = graph
            .edges()
            .iter()
            .map(|e| {
                let variable = e.xdr.and_then(|v| index_of[v.index()]);
                TimingConstraint {
                    driver: e.driver.as_raw(),
                    fanout: e.fanout.as_raw(),
                    const_delay: e.const_delay,
                    variable,
                    pinned_ratio: match (e.xdr, variable) {
                        (Some(v), None) => Some(db.value(v)),
                        _ => None,
                    },
                }
            })
            .collect();

        let capacity = db
            .active_troncons()
            .filter_map(|t| {
                let vars: Vec<usize> = t
                    .vars
                    .iter()
                    .filter_map(|v| index_of[v.index()])
                    .collect();
                (!vars.is_empty()).then(|| CapacityConstraint {
                    troncon: t.id,
                    limit: t.limit,
                    variables: vars,
                })
            })
            .collect();

        Self {
            choices: db.choices().values().to_vec(),
            tdm_coef: graph.tdm_coef(),
            source: graph.source().as_raw(),
            sink: graph.sink().as_raw(),
            sink_at: graph.sink_at(),
            variables,
            timing,
            capacity,
        }
    }

    /// Serializes the model as pretty JSON.
    pub fn to_json(&self) -> Result<String, SolveError> {
        serde_json::to_string_pretty(self).map_err(|e| SolveError::Model(e.to_string()))
    }

    /// Parses a model written by [`to_json`](Self::to_json).
    pub fn from_json(source: &str) -> Result<Self, SolveError> {
        serde_json::from_str(source).map_err(|e| SolveError::Model(e.to_string()))
    }

    /// Writes the model to `path`.
    pub fn write(&self, path: &Path) -> Result<(), SolveError> {
        std::fs::write(path, self.to_json()?).map_err(|e| SolveError::io(path, e))?;
        info!(
            path = %path.display(),
            variables = self.variables.len(),
            timing = self.timing.len(),
            capacity = self.capacity.len(),
            "model exported"
        );
        Ok(())
    }
}

/// A solver for [`LpModel`]s living outside this crate.
pub trait ExternalSolver {
    /// Returns one ratio per entry of `model.variables`.
    fn solve(&self, model: &LpModel) -> Result<Vec<f64>, SolveError>;
}

/// Writes a solver's values back to the variables of `model`.
pub fn import_solution(db: &mut TdmDb, model: &LpModel, values: &[f64]) -> Result<(), SolveError> {
    if values.len() != model.variables.len() {
        return Err(SolveError::External(format!(
            "solver returned {} values for {} variables",
            values.len(),
            model.variables.len()
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 1.0) {
        return Err(SolveError::External(format!("ratio {bad} is below 1 or not finite")));
    }
    for (var, &value) in model.variables.iter().zip(values) {
        db.set_value(var.var, value);
    }
    Ok(())
}

/// Exports the context, runs `solver` and imports its answer.
pub fn solve_external(ctx: &mut TdmContext, solver: &dyn ExternalSolver) -> Result<(), SolveError> {
    let model = LpModel::build(&ctx.db, &ctx.graph);
    let values = solver.solve(&model)?;
    import_solution(&mut ctx.db, &model, &values)?;
    ctx.update_timing();
    ctx.report_solution("external");
    Ok(())
}
