//! Timing graph construction from the resource model.
//!
//! Construction runs in a fixed order:
//!
//! 1. One node per instance; one edge from each TdmNet's driver to every
//!    distinct other instance on it.
//! 2. Break cycles: every instance that is neither a LUT nor an I/O gets a
//!    pseudo node that takes over all of its outgoing edges.
//! 3. Add wire delay to intra-device edges.
//! 4. Connect a virtual source to every node without drivers and every node
//!    without fanouts to a virtual sink.
//! 5. Levelize forward and backward.
//! 6. Zero the constant delay of intra-device edges not between LUT/FF
//!    instances.

use std::collections::BTreeSet;

use tdm_config::TimingConfig;
use tdm_db::{InstanceKind, TdmDb};
use tracing::debug;

use crate::error::TimingError;
use crate::graph::{NodeRole, TimingGraph};
use crate::ids::NodeId;

impl TimingGraph {
    /// Builds the levelized timing graph of `db` and evaluates the timing of
    /// its current ratios.
    pub fn build(db: &TdmDb, config: &TimingConfig) -> Result<Self, TimingError> {
        let design = db.design();
        let mut graph = TimingGraph::with_vars(db.vars().len(), config.tdm_coef);

        for (i, inst) in design.instances.iter().enumerate() {
            let gate_delay = if inst.kind == InstanceKind::Lut {
                config.lut_delay
            } else {
                0.0
            };
            graph.add_node(
                Some(tdm_db::InstanceId::from_raw(i as u32)),
                Some(inst.kind),
                NodeRole::Instance,
                gate_delay,
            );
        }

        for net in db.nets() {
            let driver = net.driver_pin().instance;
            let sinks: BTreeSet<_> = net
                .pins
                .iter()
                .map(|p| p.instance)
                .filter(|inst| *inst != driver)
                .collect();
            for inst in sinks {
                graph.add_edge(
                    NodeId::from_raw(driver.as_raw()),
                    NodeId::from_raw(inst.as_raw()),
                    Some(net.id),
                    net.xdr,
                );
            }
        }

        graph.break_cycles(db)?;
        graph.set_const_delay(db, config.wire_delay_coef);
        graph.set_source_sink();
        graph.levelize()?;
        graph.remove_abnormal_edges();

        graph.arrival = vec![-1.0; graph.nodes.len()];
        graph.require = vec![f64::INFINITY; graph.nodes.len()];
        graph.delay = vec![0.0; graph.edges.len()];
        graph.along = vec![0.0; graph.edges.len()];
        graph.update_timing(db);

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            levels = graph.levels.len(),
            "timing graph built"
        );
        Ok(graph)
    }

    fn break_cycles(&mut self, db: &TdmDb) -> Result<(), TimingError> {
        let count = self.nodes.len();
        for i in 0..count {
            let node = &self.nodes[i];
            if matches!(node.kind, Some(InstanceKind::Lut | InstanceKind::Io)) {
                continue;
            }
            let (instance, kind, gate_delay) = (node.instance, node.kind, node.gate_delay);
            let pseudo = self.add_node(instance, kind, NodeRole::Pseudo, gate_delay);
            let fanouts = std::mem::take(&mut self.nodes[i].fanouts);
            for e in &fanouts {
                self.edges[e.index()].driver = pseudo;
            }
            self.nodes[pseudo.index()].fanouts = fanouts;
        }
        debug!(pseudo_nodes = self.nodes.len() - count, "cycles broken");

        match self.find_cycle() {
            Some(node) => {
                let instance = self.nodes[node.index()]
                    .instance
                    .map(|inst| db.design().instance(inst).name.clone())
                    .unwrap_or_default();
                Err(TimingError::Cycle { instance })
            }
            None => Ok(()),
        }
    }

    /// Returns a node on a cycle, if any.
    fn find_cycle(&self) -> Option<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }
        let mut mark = vec![Mark::New; self.nodes.len()];
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for root in 0..self.nodes.len() {
            if mark[root] != Mark::New {
                continue;
            }
            mark[root] = Mark::Open;
            stack.push((root, 0));
            while let Some(top) = stack.last_mut() {
                let (v, next) = *top;
                if let Some(e) = self.nodes[v].fanouts.get(next) {
                    top.1 += 1;
                    let w = self.edges[e.index()].fanout.index();
                    match mark[w] {
                        Mark::Open => return Some(NodeId::from_raw(w as u32)),
                        Mark::New => {
                            mark[w] = Mark::Open;
                            stack.push((w, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    mark[v] = Mark::Done;
                    stack.pop();
                }
            }
        }
        None
    }

    fn set_const_delay(&mut self, db: &TdmDb, wire_delay_coef: f64) {
        for edge in self.edges.iter_mut().filter(|e| e.is_intra_net()) {
            let driver = &self.nodes[edge.driver.index()];
            let fanout = &self.nodes[edge.fanout.index()];
            let (Some(d), Some(f)) = (driver.instance, fanout.instance) else {
                continue;
            };
            let (dp, fp) = (db.placement(d), db.placement(f));
            if dp.site() == fp.site() && driver.is_lut() && fanout.is_ff() {
                continue;
            }
            edge.const_delay += wire_delay_coef * dp.manhattan(fp).max(1.0);
        }
    }

    fn set_source_sink(&mut self) {
        let inputs: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.drivers.is_empty())
            .map(|n| n.id)
            .collect();
        let outputs: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.fanouts.is_empty())
            .map(|n| n.id)
            .collect();
        self.source = self.add_node(None, None, NodeRole::Source, 0.0);
        self.sink = self.add_node(None, None, NodeRole::Sink, 0.0);
        for node in inputs {
            self.add_edge(self.source, node, None, None);
        }
        for node in outputs {
            self.add_edge(node, self.sink, None, None);
        }
    }

    fn levelize(&mut self) -> Result<(), TimingError> {
        self.levels = self.frontiers(self.source, true);
        self.rev_levels = self.frontiers(self.sink, false);

        let reached: usize = self.levels.iter().map(Vec::len).sum();
        if reached != self.nodes.len() {
            return Err(TimingError::Unlevelized {
                reached,
                total: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Breadth-first frontiers from `start`; a node joins a frontier once all
    /// of its predecessors in the walking direction have been placed.
    fn frontiers(&self, start: NodeId, forward: bool) -> Vec<Vec<NodeId>> {
        let mut pending: Vec<usize> = self
            .nodes
            .iter()
            .map(|n| if forward { n.drivers.len() } else { n.fanouts.len() })
            .collect();
        let mut levels = Vec::new();
        let mut frontier = vec![start];
        while !frontier.is_empty() {
            let mut upcoming = Vec::new();
            for &node in &frontier {
                let node = &self.nodes[node.index()];
                let adjacent = if forward { &node.fanouts } else { &node.drivers };
                for e in adjacent {
                    let edge = &self.edges[e.index()];
                    let w = if forward { edge.fanout } else { edge.driver };
                    pending[w.index()] -= 1;
                    if pending[w.index()] == 0 {
                        upcoming.push(w);
                    }
                }
            }
            levels.push(std::mem::replace(&mut frontier, upcoming));
        }
        levels
    }

    fn remove_abnormal_edges(&mut self) {
        for edge in self.edges.iter_mut().filter(|e| e.is_intra_net()) {
            let lut_ff = self.nodes[edge.driver.index()].is_lut_or_ff()
                && self.nodes[edge.fanout.index()].is_lut_or_ff();
            if !lut_ff {
                edge.const_delay = 0.0;
            }
        }
    }
}
