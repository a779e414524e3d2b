//! Timing graph data structures.
//!
//! The [`TimingGraph`] has one node per design instance, plus pseudo nodes
//! created while breaking cycles and a virtual source and sink. Edges run
//! from a net's driver to each of its sinks; inter-device edges carry the
//! [`XdrVarId`] whose ratio adds to their delay.
//!
//! Structure (nodes, edges, levels) is fixed after construction. The timing
//! state (arrival and required times per node, delay and along-edge arrival
//! per edge) lives in flat vectors refreshed by the propagation routines in
//! [`sta`](crate::sta).

use tdm_db::{InstanceId, InstanceKind, TdmNetId, XdrVarId};

use crate::ids::{EdgeId, NodeId};

/// The role of a timing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// A design instance (its driver side, after cycle breaking).
    Instance,
    /// The output side of a split sequential or macro instance.
    Pseudo,
    /// Virtual start of all paths.
    Source,
    /// Virtual end of all paths.
    Sink,
}

/// A node of the timing graph.
#[derive(Debug, Clone)]
pub struct TimingNode {
    /// This node's ID.
    pub id: NodeId,
    /// The design instance, absent for the source and sink.
    pub instance: Option<InstanceId>,
    /// Kind of the design instance.
    pub kind: Option<InstanceKind>,
    /// Role in the graph.
    pub role: NodeRole,
    /// Gate delay contributed to every outgoing edge.
    pub gate_delay: f64,
    /// Incoming edges.
    pub drivers: Vec<EdgeId>,
    /// Outgoing edges.
    pub fanouts: Vec<EdgeId>,
}

impl TimingNode {
    /// Whether the node stands for a LUT.
    pub fn is_lut(&self) -> bool {
        self.kind == Some(InstanceKind::Lut)
    }

    /// Whether the node stands for a flip-flop.
    pub fn is_ff(&self) -> bool {
        self.kind == Some(InstanceKind::Ff)
    }

    /// Whether the node stands for a LUT or a flip-flop.
    pub fn is_lut_or_ff(&self) -> bool {
        self.kind.is_some_and(InstanceKind::is_lut_or_ff)
    }
}

/// A directed edge of the timing graph.
#[derive(Debug, Clone)]
pub struct TimingEdge {
    /// This edge's ID.
    pub id: EdgeId,
    /// Start node.
    pub driver: NodeId,
    /// End node.
    pub fanout: NodeId,
    /// The TdmNet the edge belongs to; absent for source/sink edges.
    pub net: Option<TdmNetId>,
    /// The ratio variable of an inter-device edge.
    pub xdr: Option<XdrVarId>,
    /// Ratio-independent part of the delay.
    pub const_delay: f64,
}

impl TimingEdge {
    /// Whether the edge belongs to a net that stays on one device.
    pub fn is_intra_net(&self) -> bool {
        self.net.is_some() && self.xdr.is_none()
    }
}

/// The levelized timing DAG together with its timing state.
#[derive(Debug, Clone)]
pub struct TimingGraph {
    pub(crate) nodes: Vec<TimingNode>,
    pub(crate) edges: Vec<TimingEdge>,
    pub(crate) var_edges: Vec<Vec<EdgeId>>,
    pub(crate) levels: Vec<Vec<NodeId>>,
    pub(crate) rev_levels: Vec<Vec<NodeId>>,
    pub(crate) source: NodeId,
    pub(crate) sink: NodeId,
    pub(crate) tdm_coef: f64,

    pub(crate) arrival: Vec<f64>,
    pub(crate) require: Vec<f64>,
    pub(crate) delay: Vec<f64>,
    pub(crate) along: Vec<f64>,
}

impl TimingGraph {
    /// Creates an empty graph for `num_vars` ratio variables.
    pub(crate) fn with_vars(num_vars: usize, tdm_coef: f64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            var_edges: vec![Vec::new(); num_vars],
            levels: Vec::new(),
            rev_levels: Vec::new(),
            source: NodeId::from_raw(0),
            sink: NodeId::from_raw(0),
            tdm_coef,
            arrival: Vec::new(),
            require: Vec::new(),
            delay: Vec::new(),
            along: Vec::new(),
        }
    }

    /// Adds a node and returns its ID.
    pub(crate) fn add_node(
        &mut self,
        instance: Option<InstanceId>,
        kind: Option<InstanceKind>,
        role: NodeRole,
        gate_delay: f64,
    ) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(TimingNode {
            id,
            instance,
            kind,
            role,
            gate_delay,
            drivers: Vec::new(),
            fanouts: Vec::new(),
        });
        id
    }

    /// Adds an edge whose constant delay starts at the driver's gate delay.
    pub(crate) fn add_edge(
        &mut self,
        driver: NodeId,
        fanout: NodeId,
        net: Option<TdmNetId>,
        xdr: Option<XdrVarId>,
    ) -> EdgeId {
        let id = EdgeId::from_raw(self.edges.len() as u32);
        let const_delay = self.nodes[driver.index()].gate_delay;
        self.edges.push(TimingEdge {
            id,
            driver,
            fanout,
            net,
            xdr,
            const_delay,
        });
        self.nodes[driver.index()].fanouts.push(id);
        self.nodes[fanout.index()].drivers.push(id);
        if let Some(var) = xdr {
            self.var_edges[var.index()].push(id);
        }
        id
    }

    /// Number of nodes, source and sink included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes.
    pub fn nodes(&self) -> &[TimingNode] {
        &self.nodes
    }

    /// All edges.
    pub fn edges(&self) -> &[TimingEdge] {
        &self.edges
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: NodeId) -> &TimingNode {
        &self.nodes[id.index()]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> &TimingEdge {
        &self.edges[id.index()]
    }

    /// Edges whose delay depends on the given variable.
    pub fn var_edges(&self, var: XdrVarId) -> &[EdgeId] {
        &self.var_edges[var.index()]
    }

    /// Node levels from the source to the sink.
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    /// Node levels from the sink to the source.
    pub fn rev_levels(&self) -> &[Vec<NodeId>] {
        &self.rev_levels
    }

    /// The virtual source.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The virtual sink.
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Delay added per unit of ratio on inter-device edges.
    pub fn tdm_coef(&self) -> f64 {
        self.tdm_coef
    }
}
