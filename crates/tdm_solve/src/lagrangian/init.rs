//! Initial multipliers.
//!
//! `μ` spreads one unit of flow backwards from the sink, splitting each
//! node's outgoing flow over its drivers in proportion to how many optimized
//! inter-device edges lie upstream of each driver. `λ` is then chosen so that
//! the closed-form ratios of each troncon just fill its limit.

use tdm_db::TdmDb;
use tdm_timing::TimingGraph;

use super::data::LagData;

pub(crate) fn init_mu(data: &mut LagData, db: &TdmDb, graph: &TimingGraph) {
    let mut node_prec = vec![0.0_f64; graph.node_count()];
    let mut edge_prec = vec![0.0_f64; graph.edge_count()];
    for level in graph.levels() {
        for &n in level {
            let node = graph.node(n);
            for &e in &node.drivers {
                if graph.is_opt_edge(e, db) {
                    edge_prec[e.index()] += 1.0;
                }
                node_prec[n.index()] += edge_prec[e.index()];
            }
            let share = node_prec[n.index()] / node.fanouts.len() as f64;
            for &e in &node.fanouts {
                edge_prec[e.index()] = share;
            }
        }
    }

    for level in graph.rev_levels() {
        for &n in level {
            let node = graph.node(n);
            let fanout_sum = if n == graph.sink() {
                1.0
            } else {
                node.fanouts.iter().map(|e| data.mu[e.index()]).sum()
            };
            let prec = node_prec[n.index()];
            for &e in &node.drivers {
                data.mu[e.index()] = if prec == 0.0 {
                    fanout_sum / node.drivers.len() as f64
                } else {
                    fanout_sum * edge_prec[e.index()] / prec
                };
            }
        }
    }
}

pub(crate) fn init_lambda(data: &mut LagData, graph: &TimingGraph, db: &TdmDb) {
    for i in 0..data.troncons.len() {
        let limit = db.troncon(data.troncons[i]).limit as f64;
        let mut sum = 0.0;
        let mut max_weight = 0.0_f64;
        for &var in &data.troncon_vars[i] {
            let weight = data.weighted_mu(var, graph);
            sum += weight.sqrt();
            max_weight = max_weight.max(weight);
        }
        data.lambda[i] = (sum / limit).powi(2).max(max_weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::two_device_ctx;

    #[test]
    fn initial_mu_conserves_flow() {
        let ctx = two_device_ctx(4, 2);
        let mut data = LagData::new(&ctx.db, &ctx.graph);
        init_mu(&mut data, &ctx.db, &ctx.graph);
        assert!(data.is_legal(&ctx.graph));
        assert!(data.mu.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn initial_mu_prefers_opt_edges() {
        let ctx = two_device_ctx(4, 2);
        let mut data = LagData::new(&ctx.db, &ctx.graph);
        init_mu(&mut data, &ctx.db, &ctx.graph);
        // every unit of flow into the sink passes through an inter-device edge
        let through_xdr: f64 = ctx
            .graph
            .edges()
            .iter()
            .filter(|e| e.xdr.is_some())
            .map(|e| data.mu(e.id))
            .sum();
        assert!((through_xdr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn initial_lambda_fills_limit() {
        let ctx = two_device_ctx(4, 2);
        let mut data = LagData::new(&ctx.db, &ctx.graph);
        init_mu(&mut data, &ctx.db, &ctx.graph);
        init_lambda(&mut data, &ctx.graph, &ctx.db);
        assert_eq!(data.lambda.len(), 1);
        let lambda = data.lambda[0];
        assert!(lambda > 0.0);
        // closed-form ratios sqrt(λ / w_i) use at most `limit` slots
        let usage: f64 = data.troncon_vars[0]
            .iter()
            .map(|&v| {
                let w = data.weighted_mu(v, &ctx.graph);
                1.0 / (lambda / w).sqrt().max(1.0)
            })
            .sum();
        assert!(usage <= 2.0 + 1e-9);
    }
}
