//! Lagrange multipliers and the quantities derived from them.

use tdm_db::{TdmDb, TronconId, XdrVarId};
use tdm_timing::{EdgeId, TimingGraph};

/// Tolerance of the multiplier conservation check.
pub const MULTIPLIER_EPSILON: f64 = 1e-5;

/// One multiplier `μ` per timing edge and one `λ` per active troncon.
#[derive(Debug, Clone)]
pub struct LagData {
    /// Edge multipliers, indexed by edge.
    pub mu: Vec<f64>,
    /// Troncon multipliers, indexed like `troncons`.
    pub lambda: Vec<f64>,
    /// Troncons holding optimized variables, in ID order.
    pub troncons: Vec<TronconId>,
    /// Optimized variables of each entry of `troncons`.
    pub troncon_vars: Vec<Vec<XdrVarId>>,
    lambda_index: Vec<Option<usize>>,
    /// Largest ratio a variable may take.
    pub max_choice: f64,
}

impl LagData {
    /// Zeroed multipliers for the optimized variables of `db`.
    pub fn new(db: &TdmDb, graph: &TimingGraph) -> Self {
        let mut lambda_index = vec![None; db.troncons().len()];
        let mut troncons = Vec::new();
        let mut troncon_vars: Vec<Vec<XdrVarId>> = Vec::new();
        for t in db.active_troncons() {
            let vars: Vec<XdrVarId> = t.vars.iter().copied().filter(|&v| db.is_opt(v)).collect();
            if vars.is_empty() {
                continue;
            }
            lambda_index[t.id.index()] = Some(troncons.len());
            troncons.push(t.id);
            troncon_vars.push(vars);
        }
        Self {
            mu: vec![0.0; graph.edge_count()],
            lambda: vec![0.0; troncons.len()],
            troncons,
            troncon_vars,
            lambda_index,
            max_choice: f64::from(db.choices().max()),
        }
    }

    /// `λ` of a troncon, if it holds optimized variables.
    pub fn lambda_of(&self, troncon: TronconId) -> Option<f64> {
        self.lambda_index[troncon.index()].map(|i| self.lambda[i])
    }

    /// `μ` of an edge.
    pub fn mu(&self, edge: EdgeId) -> f64 {
        self.mu[edge.index()]
    }

    /// `Σ tdm_coef · μ` over the edges of a variable.
    pub fn weighted_mu(&self, var: XdrVarId, graph: &TimingGraph) -> f64 {
        graph
            .var_edges(var)
            .iter()
            .map(|&e| graph.tdm_coef() * self.mu[e.index()])
            .sum()
    }

    /// Subgradient of `μ(e)`: along-edge arrival minus fanout arrival.
    pub fn mu_grad(graph: &TimingGraph, edge: EdgeId) -> f64 {
        graph.along(edge) - graph.arrival(graph.edge(edge).fanout)
    }

    /// Subgradient of `λ(t)`: continuous usage minus limit.
    pub fn lambda_grad(db: &TdmDb, troncon: TronconId) -> f64 {
        let t = db.troncon(troncon);
        t.cont_usage(db.vars()) - t.limit as f64
    }

    /// Whether flow is conserved: one unit enters the sink and every other
    /// node except the source passes on what it receives.
    pub fn is_legal(&self, graph: &TimingGraph) -> bool {
        graph.nodes().iter().all(|node| {
            let incoming: f64 = node.drivers.iter().map(|e| self.mu[e.index()]).sum();
            let outgoing: f64 = node.fanouts.iter().map(|e| self.mu[e.index()]).sum();
            if node.id == graph.sink() {
                (incoming - 1.0).abs() <= MULTIPLIER_EPSILON
            } else if node.id == graph.source() {
                true
            } else {
                (incoming - outgoing).abs() <= MULTIPLIER_EPSILON
            }
        })
    }

    /// Lagrangian dual value at the current ratios and arrival times.
    pub fn dual(&self, db: &TdmDb, graph: &TimingGraph) -> f64 {
        let channel: f64 = self
            .troncons
            .iter()
            .zip(&self.lambda)
            .map(|(&t, &lambda)| lambda * Self::lambda_grad(db, t))
            .sum();
        let timing: f64 = graph
            .edges()
            .iter()
            .map(|e| self.mu[e.id.index()] * Self::mu_grad(graph, e.id))
            .sum();
        graph.sink_at() + channel + timing
    }
}
