//! Arrival/required-time propagation and critical path queries.
//!
//! Propagation walks the levels of the graph. Nodes of one level only read
//! state written by earlier levels, so each level is evaluated as one
//! parallel batch on the current rayon pool and its results are scattered
//! before the next level starts.

use rayon::prelude::*;
use tdm_common::{nearly_equal, TIME_EPSILON};
use tdm_db::{TdmDb, XdrVarId};
use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::graph::TimingGraph;
use crate::ids::{EdgeId, NodeId};

/// Per-node result of one forward step: the node's arrival time and the
/// `(edge, delay, along)` triples of its fanout edges.
type ArrivalUpdate = (usize, f64, Vec<(usize, f64, f64)>);

impl TimingGraph {
    /// Delay of an edge under the current ratios.
    pub fn edge_delay(&self, edge: EdgeId, db: &TdmDb) -> f64 {
        let e = &self.edges[edge.index()];
        match (e.net, e.xdr) {
            (None, _) => 0.0,
            (Some(_), None) => e.const_delay,
            (Some(_), Some(var)) => e.const_delay + self.tdm_coef * db.value(var),
        }
    }

    /// Delay the edge would have if its variable took `value`.
    pub fn edge_delay_at(&self, edge: EdgeId, value: f64) -> f64 {
        let e = &self.edges[edge.index()];
        match (e.net, e.xdr) {
            (None, _) => 0.0,
            (Some(_), None) => e.const_delay,
            (Some(_), Some(_)) => e.const_delay + self.tdm_coef * value,
        }
    }

    /// Recomputes arrival times, edge delays and along-edge arrivals.
    pub fn update_arrival(&mut self, db: &TdmDb) {
        self.arrival.fill(-1.0);
        self.arrival[self.source.index()] = 0.0;

        for l in 0..self.levels.len() {
            let updates: Vec<ArrivalUpdate> = self.levels[l]
                .par_iter()
                .map(|&n| {
                    let node = &self.nodes[n.index()];
                    let at = node
                        .drivers
                        .iter()
                        .fold(self.arrival[n.index()], |acc, e| acc.max(self.along[e.index()]));
                    let fanouts = node
                        .fanouts
                        .iter()
                        .map(|&e| {
                            let delay = self.edge_delay(e, db);
                            (e.index(), delay, delay + at)
                        })
                        .collect();
                    (n.index(), at, fanouts)
                })
                .collect();
            for (n, at, fanouts) in updates {
                self.arrival[n] = at;
                for (e, delay, along) in fanouts {
                    self.delay[e] = delay;
                    self.along[e] = along;
                }
            }
        }
    }

    /// Recomputes required times from the sink's arrival time. Must follow
    /// [`update_arrival`](Self::update_arrival).
    pub fn update_require(&mut self) {
        self.require.fill(f64::INFINITY);
        let sink = self.sink.index();
        self.require[sink] = self.arrival[sink];

        for l in 0..self.rev_levels.len() {
            let updates: Vec<(usize, f64)> = self.rev_levels[l]
                .par_iter()
                .filter(|n| n.index() != sink)
                .map(|&n| {
                    let rt = self.nodes[n.index()]
                        .fanouts
                        .iter()
                        .map(|&e| {
                            let edge = &self.edges[e.index()];
                            self.require[edge.fanout.index()] - self.delay[e.index()]
                        })
                        .fold(f64::INFINITY, f64::min);
                    (n.index(), rt)
                })
                .collect();
            for (n, rt) in updates {
                self.require[n] = rt;
            }
        }
    }

    /// Forward then backward propagation.
    pub fn update_timing(&mut self, db: &TdmDb) {
        self.update_arrival(db);
        self.update_require();
    }

    /// Arrival time at the sink: the design's critical delay.
    pub fn sink_at(&self) -> f64 {
        self.arrival[self.sink.index()]
    }

    /// Arrival time of a node.
    pub fn arrival(&self, node: NodeId) -> f64 {
        self.arrival[node.index()]
    }

    /// Required time of a node.
    pub fn require(&self, node: NodeId) -> f64 {
        self.require[node.index()]
    }

    /// `require − arrival`.
    pub fn slack(&self, node: NodeId) -> f64 {
        self.require[node.index()] - self.arrival[node.index()]
    }

    /// Delay of an edge at the last propagation.
    pub fn delay(&self, edge: EdgeId) -> f64 {
        self.delay[edge.index()]
    }

    /// Driver arrival plus edge delay at the last propagation.
    pub fn along(&self, edge: EdgeId) -> f64 {
        self.along[edge.index()]
    }

    /// Whether the edge's variable is optimized.
    pub fn is_opt_edge(&self, edge: EdgeId, db: &TdmDb) -> bool {
        self.edges[edge.index()].xdr.is_some_and(|v| db.is_opt(v))
    }

    /// Whether the edge determines its fanout's arrival time.
    pub fn is_critical(&self, edge: EdgeId) -> bool {
        let e = &self.edges[edge.index()];
        nearly_equal(
            self.arrival[e.fanout.index()],
            self.arrival[e.driver.index()] + self.delay[edge.index()],
            TIME_EPSILON,
        )
    }

    /// Walks back from the sink along the first critical driver edge of each
    /// node. Edges are returned sink first. A walk that finds a node without
    /// a critical driver stops there and emits `T001`.
    pub fn critical_path(&self, sink: &DiagnosticSink) -> Vec<EdgeId> {
        let mut path = Vec::new();
        let mut node = self.sink;
        while !self.nodes[node.index()].drivers.is_empty() {
            let next = self.nodes[node.index()]
                .drivers
                .iter()
                .copied()
                .find(|&e| self.is_critical(e));
            match next {
                Some(e) => {
                    path.push(e);
                    node = self.edges[e.index()].driver;
                }
                None => {
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticCode::new(Category::Timing, 1),
                            "critical path walk found no critical driver",
                        )
                        .with_subject(format!("timing node {}", node.as_raw()))
                        .with_note(format!("{} edges collected", path.len())),
                    );
                    break;
                }
            }
        }
        path
    }

    /// Linearized slack ratio `k + b·value` of a variable's worst edge:
    /// `k = 1 + (driver_at − fanout_rt + const_delay) / sink_at` and
    /// `b = tdm_coef / sink_at`. Returns `None` for variables without edges.
    pub fn slack_ratio_coef(&self, var: XdrVarId, db: &TdmDb) -> Option<(f64, f64)> {
        let sink_at = self.sink_at();
        let value = db.value(var);
        let b = self.tdm_coef / sink_at;
        self.var_edges[var.index()]
            .iter()
            .map(|&e| {
                let edge = &self.edges[e.index()];
                1.0 + (self.arrival[edge.driver.index()] - self.require[edge.fanout.index()]
                    + edge.const_delay)
                    / sink_at
            })
            .fold(None, |best: Option<f64>, k| match best {
                Some(bk) if bk + b * value >= k + b * value => Some(bk),
                _ => Some(k),
            })
            .map(|k| (k, b))
    }
}
