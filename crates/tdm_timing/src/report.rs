//! Structural statistics of a built timing graph.

use serde::Serialize;
use tdm_db::TdmDb;
use tracing::{debug, info};

use crate::graph::{NodeRole, TimingGraph};

/// Distribution of constant delays on intra-device edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayQuantiles {
    /// Smallest delay.
    pub min: f64,
    /// Largest delay.
    pub max: f64,
    /// Mean delay.
    pub avg: f64,
    /// Delays at the 25/50/75/90/95/98 percent positions, each taken at the
    /// floor position `⌊n·q⌋` of the sorted delays.
    pub quantiles: [f64; 6],
}

/// Counts describing a timing graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    /// Forward levels.
    pub levels: usize,
    /// Backward levels.
    pub rev_levels: usize,
    /// Nodes, source and sink included.
    pub nodes: usize,
    /// Edges.
    pub edges: usize,
    /// Inter-device edges.
    pub xdr_edges: usize,
    /// Fanouts of the source.
    pub sources: usize,
    /// Drivers of the sink.
    pub sinks: usize,
    /// Largest fan-in of a non-virtual node.
    pub max_fanin: usize,
    /// Largest fan-out of a non-virtual node.
    pub max_fanout: usize,
    /// Intra-device delay distribution, absent without intra-device edges.
    pub intra_delay: Option<DelayQuantiles>,
}

const QUANTILES: [f64; 6] = [0.25, 0.5, 0.75, 0.9, 0.95, 0.98];

/// Element at floor position `⌊n·q⌋` of a non-empty sorted slice, clamped to
/// the last element. No interpolation between neighbours.
fn floor_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    sorted[((n as f64 * q) as usize).min(n - 1)]
}

impl TimingGraph {
    /// Computes the structural summary.
    pub fn summary(&self) -> GraphSummary {
        let mut intra: Vec<f64> = self
            .edges
            .iter()
            .filter(|e| e.is_intra_net())
            .map(|e| e.const_delay)
            .collect();
        intra.sort_by(f64::total_cmp);
        let intra_delay = (!intra.is_empty()).then(|| {
            let n = intra.len();
            DelayQuantiles {
                min: intra[0],
                max: intra[n - 1],
                avg: intra.iter().sum::<f64>() / n as f64,
                quantiles: QUANTILES.map(|q| floor_quantile(&intra, q)),
            }
        });

        let inner = self
            .nodes
            .iter()
            .filter(|n| !matches!(n.role, NodeRole::Source | NodeRole::Sink));
        GraphSummary {
            levels: self.levels.len(),
            rev_levels: self.rev_levels.len(),
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            xdr_edges: self.edges.iter().filter(|e| e.xdr.is_some()).count(),
            sources: self.nodes[self.source.index()].fanouts.len(),
            sinks: self.nodes[self.sink.index()].drivers.len(),
            max_fanin: inner.clone().map(|n| n.drivers.len()).max().unwrap_or(0),
            max_fanout: inner.map(|n| n.fanouts.len()).max().unwrap_or(0),
            intra_delay,
        }
    }

    /// Logs the summary and, at debug level, per-level edge counts.
    pub fn report(&self, db: &TdmDb) {
        let s = self.summary();
        info!(
            levels = s.levels,
            rev_levels = s.rev_levels,
            nodes = s.nodes,
            edges = s.edges,
            xdr_edges = s.xdr_edges,
            sources = s.sources,
            sinks = s.sinks,
            max_fanin = s.max_fanin,
            max_fanout = s.max_fanout,
            "timing graph"
        );
        if let Some(d) = &s.intra_delay {
            info!(
                min = d.min,
                max = d.max,
                avg = d.avg,
                quantiles = ?d.quantiles,
                "intra-net delay"
            );
        }
        for (l, level) in self.levels.iter().enumerate() {
            let fanouts = || level.iter().flat_map(|n| self.nodes[n.index()].fanouts.iter());
            let xdr = fanouts().filter(|e| self.edges[e.index()].xdr.is_some()).count();
            let opt = fanouts().filter(|&&e| self.is_opt_edge(e, db)).count();
            debug!(
                level = l,
                nodes = level.len(),
                const_edges = fanouts().count() - xdr,
                xdr_edges = xdr,
                opt_xdr_edges = opt,
                "level"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::floor_quantile;
    use crate::test_util::{chain_db, DbBuilder};
    use crate::TimingGraph;
    use tdm_config::TimingConfig;
    use tdm_db::InstanceKind;

    #[test]
    fn quantiles_take_the_floor_position() {
        let delays: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(floor_quantile(&delays, 0.25), 2.0);
        assert_eq!(floor_quantile(&delays, 0.5), 5.0);
        assert_eq!(floor_quantile(&delays, 0.98), 9.0);
        assert_eq!(floor_quantile(&[3.0], 0.98), 3.0);
        assert_eq!(floor_quantile(&delays[..2], 1.0), 1.0);
    }

    #[test]
    fn chain_summary() {
        let db = chain_db();
        let g = TimingGraph::build(&db, &TimingConfig::default()).unwrap();
        let s = g.summary();
        assert_eq!(s.nodes, 6);
        assert_eq!(s.edges, 6);
        assert_eq!(s.xdr_edges, 0);
        assert_eq!(s.sources, 2);
        assert_eq!(s.sinks, 2);
        assert_eq!(s.levels, 5);
        let d = s.intra_delay.unwrap();
        assert_eq!(d.min, 12.0);
        assert_eq!(d.max, 12.0);
        assert_eq!(d.quantiles, [12.0; 6]);
    }

    #[test]
    fn summary_without_intra_edges() {
        let mut b = DbBuilder::new();
        let a = b.inst("a", InstanceKind::Lut, 0, (0.0, 0.0));
        let c = b.inst("c", InstanceKind::Lut, 1, (0.0, 0.0));
        b.net(a, &[c]);
        let db = b.build(20);
        let g = TimingGraph::build(&db, &TimingConfig::default()).unwrap();
        let s = g.summary();
        assert_eq!(s.xdr_edges, 1);
        assert!(s.intra_delay.is_none());
        assert_eq!(s.max_fanout, 1);
    }

    #[test]
    fn summary_serializes() {
        let db = chain_db();
        let g = TimingGraph::build(&db, &TimingConfig::default()).unwrap();
        let json = serde_json::to_string(&g.summary()).unwrap();
        assert!(json.contains("\"xdr_edges\":0"));
    }
}
