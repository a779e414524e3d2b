//! Multiplier updates between Lagrangian iterations.
//!
//! `μ` is revised level by level from the sink towards the source. Every
//! node redistributes the flow leaving it over its driver edges: towards
//! critical drivers when it must receive more, away from the least critical
//! ones when it must receive less. A node only writes its own driver edges
//! and only reads edges owned by nodes of earlier levels, so the nodes of a
//! level are updated in parallel and their results scattered afterwards.

use std::cmp::Ordering;

use rayon::prelude::*;
use tdm_db::TdmDb;
use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tdm_timing::{EdgeId, NodeId, TimingGraph};

use super::data::LagData;

const BASE_RATE: f64 = 0.2;
const CHANGE_RATE: f64 = 0.01;
const CRITICAL_BAND: f64 = 0.05;
const SINK_SHARE: f64 = 0.01;
const SINK_STEP_CAP: f64 = 0.002;

/// Step ratio of iteration `iter`.
pub(crate) fn step_ratio(iter: usize) -> f64 {
    BASE_RATE * 0.5_f64.powf(CHANGE_RATE * iter as f64)
}

/// A driver edge of the node being updated.
#[derive(Debug, Clone, Copy)]
struct DriverFlow {
    edge: EdgeId,
    grad: f64,
    along: f64,
    critical: bool,
    mu: f64,
}

fn by_mu(a: &DriverFlow, b: &DriverFlow) -> Ordering {
    a.mu.total_cmp(&b.mu)
}

fn by_grad(a: &DriverFlow, b: &DriverFlow) -> Ordering {
    a.grad.total_cmp(&b.grad)
}

fn by_along_desc(a: &DriverFlow, b: &DriverFlow) -> Ordering {
    b.along.total_cmp(&a.along)
}

/// Every driver is critical: scale all of them to the outgoing flow.
fn crit_flow(flows: &mut [DriverFlow], driver_sum: f64, fanout_sum: f64) {
    flows.sort_by(by_mu);
    let n = flows.len();
    let mut diff = fanout_sum - driver_sum;
    for (d, f) in flows.iter_mut().enumerate() {
        if driver_sum != 0.0 {
            f.mu += diff * (f.mu / driver_sum);
        } else {
            let share = diff / (n - d) as f64;
            f.mu += share;
            diff -= share;
            if f.mu < 0.0 {
                diff += f.mu;
                f.mu = 0.0;
            }
        }
    }
}

/// Removes `driver_sum − fanout_sum` from `flows[start..]`, draining the
/// drivers with the most negative gradient first. Returns `false` when those
/// drivers do not carry enough flow to absorb the excess.
fn decrease_flow(flows: &mut [DriverFlow], driver_sum: f64, fanout_sum: f64, start: usize) -> bool {
    let n = flows.len();
    if start >= n {
        return true;
    }
    let mut diff = fanout_sum - driver_sum;
    let mut mu_sum: f64 = flows[start..].iter().map(|f| f.mu).sum();
    if mu_sum < driver_sum - fanout_sum {
        return false;
    }

    flows[start..].sort_by(by_grad);
    let mut max_abs = flows[start].grad.abs();
    let mut last = n;
    for d in (start..n).rev() {
        if flows[d].mu * flows[d].grad != 0.0 {
            break;
        }
        last = d;
    }

    let proportional = |flows: &mut [DriverFlow], from: usize, diff: f64, mu_sum: f64| {
        for f in &mut flows[from..] {
            f.mu = (f.mu + diff * (f.mu / mu_sum)).max(0.0);
        }
    };

    if last == start {
        proportional(flows, start, diff, mu_sum);
        return true;
    }

    let mut sum: f64 = flows[start..]
        .iter()
        .map(|f| f.mu * (f.grad.abs() / max_abs))
        .sum();
    let mut ratio = diff.abs() / sum;
    let mut cur = start;
    while ratio > 1.0 {
        let mu = flows[cur].mu;
        diff += mu;
        sum -= mu;
        mu_sum -= mu;
        flows[cur].mu = 0.0;
        cur += 1;

        if mu_sum == 0.0 {
            return true;
        }
        if cur == last {
            proportional(flows, cur, diff, mu_sum);
            return true;
        }

        sum *= max_abs;
        max_abs = flows[cur].grad.abs();
        sum /= max_abs;
        ratio = diff.abs() / sum;
    }

    for f in &mut flows[cur..] {
        f.mu = (f.mu + f.mu * ratio * (f.grad / max_abs)).max(0.0);
    }
    true
}

/// Adds `fanout_sum − driver_sum` to the drivers whose along-edge arrival is
/// within the critical band of the latest one.
fn increase_flow(flows: &mut [DriverFlow], driver_sum: f64, fanout_sum: f64) {
    let diff = fanout_sum - driver_sum;
    flows.sort_by(by_along_desc);
    let threshold = flows[0].along * (1.0 - CRITICAL_BAND);
    let band = flows.iter().take_while(|f| f.along >= threshold).count();
    let crit_sum: f64 = flows[..band].iter().map(|f| f.mu).sum();
    for f in &mut flows[..band] {
        if crit_sum != 0.0 {
            f.mu += diff * (f.mu / crit_sum);
        } else {
            f.mu += diff / band as f64;
        }
    }
}

/// Shifts a small share of the sink's flow onto its latest drivers, then
/// takes the same amount back from the others.
fn sink_flow(
    flows: &mut [DriverFlow],
    mut driver_sum: f64,
    fanout_sum: f64,
    mut ratio: f64,
) -> bool {
    flows.sort_by(by_along_desc);
    let threshold = flows[0].along * (1.0 - CRITICAL_BAND);
    let max_num = ((flows.len() as f64 * SINK_SHARE) as usize).max(1);

    let mut last: Option<usize> = None;
    let mut cur_mu_sum = 0.0;
    let mut cur_delta_sum = 0.0;
    for d in 0..max_num.min(flows.len()) {
        if flows[d].along < threshold {
            break;
        }
        let mu = flows[d].mu;
        if cur_delta_sum + mu * ratio > (driver_sum - cur_mu_sum - mu) * SINK_STEP_CAP {
            if d == 0 && mu > 0.0 {
                ratio = (driver_sum - mu) * SINK_STEP_CAP / mu;
            } else {
                break;
            }
        }
        last = Some(d);
        cur_mu_sum += mu;
        cur_delta_sum += mu * ratio;
    }

    let next = match last {
        Some(last) => {
            for f in &mut flows[..=last] {
                let delta = f.mu * ratio;
                f.mu += delta;
                driver_sum += delta;
            }
            last + 1
        }
        None => 0,
    };
    decrease_flow(flows, driver_sum, fanout_sum, next)
}

/// Pushes any rounding residue onto the driver with the largest `|μ|`.
fn remove_acc_issue(flows: &mut [DriverFlow], fanout_sum: f64) {
    let driver_sum: f64 = flows.iter().map(|f| f.mu).sum();
    if driver_sum == fanout_sum {
        return;
    }
    let mut best: Option<usize> = None;
    for (i, f) in flows.iter().enumerate() {
        if best.map_or(true, |b| f.mu.abs() > flows[b].mu.abs()) {
            best = Some(i);
        }
    }
    if let Some(i) = best {
        flows[i].mu = (flows[i].mu + fanout_sum - driver_sum).max(0.0);
    }
}

/// New `μ` of the driver edges of one node.
fn update_node(
    data: &LagData,
    graph: &TimingGraph,
    n: NodeId,
    ratio: f64,
    sink: &DiagnosticSink,
) -> Vec<(EdgeId, f64)> {
    let node = graph.node(n);
    if node.drivers.is_empty() {
        return Vec::new();
    }
    let mut flows: Vec<DriverFlow> = node
        .drivers
        .iter()
        .map(|&e| DriverFlow {
            edge: e,
            grad: LagData::mu_grad(graph, e),
            along: graph.along(e),
            critical: graph.is_critical(e),
            mu: data.mu(e),
        })
        .collect();
    let is_sink = n == graph.sink();
    let num_crit = flows.iter().filter(|f| f.critical).count();
    let fanout_sum = if is_sink {
        1.0
    } else {
        node.fanouts.iter().map(|&e| data.mu(e)).sum()
    };
    let driver_sum: f64 = flows.iter().map(|f| f.mu).sum();

    let absorbed = if is_sink {
        if num_crit == flows.len() {
            return Vec::new();
        }
        sink_flow(&mut flows, driver_sum, fanout_sum, ratio)
    } else if num_crit == flows.len() {
        crit_flow(&mut flows, driver_sum, fanout_sum);
        true
    } else if driver_sum > fanout_sum {
        decrease_flow(&mut flows, driver_sum, fanout_sum, 0)
    } else {
        increase_flow(&mut flows, driver_sum, fanout_sum);
        true
    };

    if !absorbed {
        sink.emit(
            Diagnostic::warning(
                DiagnosticCode::new(Category::Solver, 2),
                "driver multipliers cannot absorb the flow decrease",
            )
            .with_subject(format!("timing node {}", n.as_raw()))
            .with_note(format!("incoming {driver_sum}, outgoing {fanout_sum}")),
        );
        return Vec::new();
    }

    remove_acc_issue(&mut flows, fanout_sum);
    flows.into_iter().map(|f| (f.edge, f.mu)).collect()
}

/// Revises every `μ`, one reverse level at a time.
pub(crate) fn update_mu(
    data: &mut LagData,
    graph: &TimingGraph,
    ratio: f64,
    sink: &DiagnosticSink,
) {
    for level in graph.rev_levels() {
        let current: &LagData = data;
        let updates: Vec<Vec<(EdgeId, f64)>> = level
            .par_iter()
            .map(|&n| update_node(current, graph, n, ratio, sink))
            .collect();
        for (e, mu) in updates.into_iter().flatten() {
            data.mu[e.index()] = mu;
        }
    }
}

/// Re-fits `λ` of each troncon to the revised `μ`. Stops at the first
/// troncon whose weights spread wider than the choice range.
pub(crate) fn update_lambda(data: &mut LagData, graph: &TimingGraph, db: &TdmDb) {
    for i in 0..data.troncons.len() {
        let mut weights: Vec<f64> = data.troncon_vars[i]
            .iter()
            .map(|&v| data.weighted_mu(v, graph).sqrt())
            .collect();
        let sum: f64 = weights.iter().sum();
        weights.sort_by(f64::total_cmp);
        let (Some(&lo), Some(&hi)) = (weights.first(), weights.last()) else {
            continue;
        };
        if hi / lo > data.max_choice {
            break;
        }
        let limit = db.troncon(data.troncons[i]).limit as f64;
        data.lambda[i] = (sum / limit).powi(2).max(hi);
    }
}
