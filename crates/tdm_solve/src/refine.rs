//! Greedy refinement of a legal solution along the critical path.
//!
//! A variable on the critical path swaps its ratio with a smaller ratio held
//! by another variable of the same troncon and direction, so channel usage
//! never changes. Candidates whose edges lack the slack to absorb the larger
//! ratio are skipped; the rest are tried with the most residual slack first,
//! and a swap is kept only if the critical delay does not grow.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tdm_db::{TronconId, XdrVarId};
use tracing::{debug, info};

use crate::context::TdmContext;

/// Refinement runs until an improvement check fails; the check happens every
/// this many successful swaps.
const CHECK_INTERVAL: usize = 10;

/// One accepted swap: `u` held `u_val` and `v` held `v_val` before.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapRecord {
    /// The critical-path variable.
    pub u: XdrVarId,
    /// The variable it swapped with.
    pub v: XdrVarId,
    /// `u`'s ratio before the swap.
    pub u_val: f64,
    /// `v`'s ratio before the swap.
    pub v_val: f64,
}

impl SwapRecord {
    /// Whether both records exchange the same pair of ratios between the
    /// same pair of variables, in either orientation.
    pub fn same_as(&self, other: &SwapRecord) -> bool {
        (self.u == other.u
            && self.v == other.v
            && self.u_val == other.u_val
            && self.v_val == other.v_val)
            || (self.u == other.v
                && self.v == other.u
                && self.u_val == other.v_val
                && self.v_val == other.u_val)
    }
}

/// Swaps already made, so a swap is never repeated or undone by its mirror.
#[derive(Debug, Clone, Default)]
pub struct SwapHistory {
    records: Vec<SwapRecord>,
}

impl SwapHistory {
    /// Whether an equivalent swap was already made.
    pub fn contains(&self, record: &SwapRecord) -> bool {
        self.records.iter().any(|r| r.same_as(record))
    }

    fn push(&mut self, record: SwapRecord) {
        self.records.push(record);
    }

    fn pop(&mut self) {
        self.records.pop();
    }

    /// Number of recorded swaps.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no swap was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Summary of a refinement run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefineReport {
    /// Critical paths examined.
    pub iterations: usize,
    /// Swaps kept.
    pub swaps: usize,
    /// Critical delay before refinement.
    pub at_before: f64,
    /// Critical delay after refinement.
    pub at_after: f64,
}

/// Greedy local search over a legal solution.
pub struct GreedyRefiner<'a> {
    ctx: &'a mut TdmContext,
    history: SwapHistory,
}

impl<'a> GreedyRefiner<'a> {
    /// A refiner with an empty swap history.
    pub fn new(ctx: &'a mut TdmContext) -> Self {
        Self {
            ctx,
            history: SwapHistory::default(),
        }
    }

    /// Swaps accepted so far.
    pub fn history(&self) -> &SwapHistory {
        &self.history
    }

    /// Refines until a critical path yields no acceptable swap or the
    /// critical delay stops improving.
    pub fn run(&mut self) -> RefineReport {
        info!("begin greedy refinement");
        self.ctx.update_timing();
        self.ctx.report_solution("refine input");
        let at_before = self.ctx.arrival_time();

        let mut path = self.ctx.graph.critical_path(&self.ctx.sink);
        let mut iter = 0;
        let mut best = f64::MAX;
        while self.optimize_path(&path) {
            if iter % CHECK_INTERVAL == 0 {
                let at = self.ctx.arrival_time();
                if best <= at {
                    break;
                }
                best = at;
            }
            path = self.ctx.graph.critical_path(&self.ctx.sink);
            iter += 1;
        }

        self.ctx.report_solution("refine output");
        let report = RefineReport {
            iterations: iter + 1,
            swaps: self.history.len(),
            at_before,
            at_after: self.ctx.arrival_time(),
        };
        info!(
            swaps = report.swaps,
            at_before = report.at_before,
            at_after = report.at_after,
            "greedy refinement finished"
        );
        report
    }

    fn optimize_path(&mut self, path: &[tdm_timing::EdgeId]) -> bool {
        let db = &self.ctx.db;
        let mut seen = BTreeSet::new();
        let mut forward: BTreeMap<TronconId, Vec<XdrVarId>> = BTreeMap::new();
        let mut backward: BTreeMap<TronconId, Vec<XdrVarId>> = BTreeMap::new();
        for &e in path {
            let Some(v) = self.ctx.graph.edge(e).xdr else {
                continue;
            };
            if !seen.insert(v) {
                continue;
            }
            let var = db.var(v);
            let groups = if var.forward { &mut forward } else { &mut backward };
            groups.entry(var.troncon).or_default().push(v);
        }

        let mut jobs = Vec::new();
        for (is_forward, groups) in [(true, forward), (false, backward)] {
            for (t, mut vars) in groups {
                let on_path = vars.len();
                let related: Vec<XdrVarId> = db
                    .troncon(t)
                    .vars
                    .iter()
                    .copied()
                    .filter(|&v| db.var(v).forward == is_forward && !vars.contains(&v))
                    .collect();
                vars.extend(related);
                jobs.push((vars, on_path));
            }
        }

        jobs.into_iter()
            .any(|(vars, on_path)| self.optimize_troncon(&vars, on_path))
    }

    /// Tries to swap one of `vars[..on_path]` with one of the rest.
    fn optimize_troncon(&mut self, vars: &[XdrVarId], on_path: usize) -> bool {
        for &u in &vars[..on_path] {
            let val = self.ctx.db.value(u);
            let mut candidates = self.candidates(&vars[on_path..], val);
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (_, v) in candidates {
                let cand_val = self.ctx.db.value(v);
                let record = SwapRecord {
                    u,
                    v,
                    u_val: val,
                    v_val: cand_val,
                };
                if self.history.contains(&record) {
                    continue;
                }
                self.history.push(record);
                self.ctx.db.set_value(u, cand_val);
                self.ctx.db.set_value(v, val);

                let orig = self.ctx.arrival_time();
                self.ctx.update_timing();
                if self.ctx.arrival_time() > orig {
                    self.ctx.db.set_value(u, val);
                    self.ctx.db.set_value(v, cand_val);
                    self.ctx.update_timing();
                    self.history.pop();
                } else {
                    debug!(
                        u = %u,
                        v = %v,
                        from = val,
                        to = cand_val,
                        at = self.ctx.arrival_time(),
                        "swap accepted"
                    );
                    return true;
                }
            }
        }
        false
    }

    /// Variables holding a ratio below `val` whose edges can absorb `val`,
    /// keyed by negated residual slack.
    fn candidates(&self, others: &[XdrVarId], val: f64) -> Vec<(f64, XdrVarId)> {
        let (db, graph) = (&self.ctx.db, &self.ctx.graph);
        others
            .iter()
            .copied()
            .filter(|&v| db.value(v) < val)
            .filter_map(|v| {
                let mut min_res = f64::MAX;
                for &e in graph.var_edges(v) {
                    let slack = graph.slack(graph.edge(e).fanout);
                    let diff = graph.edge_delay_at(e, val) - graph.delay(e);
                    if slack < diff {
                        return None;
                    }
                    min_res = min_res.min(slack - diff);
                }
                Some((-min_res, v))
            })
            .collect()
    }
}

/// Runs greedy refinement on the context's worker pool.
pub fn refine(ctx: &mut TdmContext) -> RefineReport {
    ctx.install(|ctx| GreedyRefiner::new(ctx).run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::two_device_ctx;

    fn set_opt_values(ctx: &mut TdmContext, values: &[f64]) {
        let vars = ctx.db.opt_vars().to_vec();
        for (v, value) in vars.into_iter().zip(values) {
            ctx.db.set_value(v, *value);
        }
        ctx.update_timing();
    }

    fn opt_values(ctx: &TdmContext) -> Vec<f64> {
        ctx.db.opt_vars().iter().map(|&v| ctx.db.value(v)).collect()
    }

    #[test]
    fn mirror_swap_is_recognized() {
        let (a, b) = (XdrVarId::from_raw(0), XdrVarId::from_raw(1));
        let mut history = SwapHistory::default();
        history.push(SwapRecord {
            u: a,
            v: b,
            u_val: 16.0,
            v_val: 8.0,
        });
        assert!(history.contains(&SwapRecord {
            u: b,
            v: a,
            u_val: 8.0,
            v_val: 16.0,
        }));
        assert!(!history.contains(&SwapRecord {
            u: b,
            v: a,
            u_val: 16.0,
            v_val: 8.0,
        }));
    }

    #[test]
    fn critical_ratio_moves_to_slack_path() {
        // path k arrives at 4 + 5 * value + 4k
        let mut ctx = two_device_ctx(4, 2);
        set_opt_values(&mut ctx, &[1.0, 8.0, 8.0, 8.0]);
        assert_eq!(ctx.arrival_time(), 56.0);
        let report = refine(&mut ctx);
        assert_eq!(report.at_before, 56.0);
        assert_eq!(report.at_after, 52.0);
        assert_eq!(report.swaps, 1);
        assert_eq!(opt_values(&ctx), vec![8.0, 8.0, 8.0, 1.0]);
        assert_eq!(ctx.db.limit_vio(), 0);
    }

    #[test]
    fn balanced_solution_is_kept() {
        let mut ctx = two_device_ctx(4, 2);
        set_opt_values(&mut ctx, &[8.0, 8.0, 8.0, 8.0]);
        let report = refine(&mut ctx);
        assert_eq!(report.swaps, 0);
        assert_eq!(report.at_after, report.at_before);
        assert_eq!(opt_values(&ctx), vec![8.0; 4]);
    }
}
