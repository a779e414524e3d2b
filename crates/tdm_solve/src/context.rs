//! The state shared by every solver phase.

use std::sync::Arc;

use tdm_config::FlowConfig;
use tdm_db::TdmDb;
use tdm_diagnostics::DiagnosticSink;
use tdm_timing::TimingGraph;

use crate::error::SolveError;

/// The resource model, its timing graph, the diagnostic sink and the worker
/// pool, bundled for the solver phases.
pub struct TdmContext {
    /// Nets, channels and ratios.
    pub db: TdmDb,
    /// Timing graph kept in sync with `db` by the phases.
    pub graph: TimingGraph,
    /// Collected user-facing conditions.
    pub sink: DiagnosticSink,
    /// Flow settings.
    pub config: FlowConfig,
    pool: Arc<rayon::ThreadPool>,
}

impl TdmContext {
    /// Builds the timing graph of `db` on a pool of `config.flow.threads`
    /// workers.
    pub fn new(db: TdmDb, config: FlowConfig, sink: DiagnosticSink) -> Result<Self, SolveError> {
        let threads = config.flow.threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SolveError::ThreadPool {
                threads,
                message: e.to_string(),
            })?;
        let graph = pool.install(|| TimingGraph::build(&db, &config.timing))?;
        Ok(Self {
            db,
            graph,
            sink,
            config,
            pool: Arc::new(pool),
        })
    }

    /// Runs `f` with the context's worker pool as the current rayon pool.
    pub fn install<R: Send>(&mut self, f: impl FnOnce(&mut Self) -> R + Send) -> R {
        let pool = Arc::clone(&self.pool);
        pool.install(|| f(self))
    }

    /// Refreshes arrival and required times.
    pub fn update_timing(&mut self) {
        self.graph.update_timing(&self.db);
    }

    /// Refreshes arrival times only.
    pub fn update_arrival(&mut self) {
        self.graph.update_arrival(&self.db);
    }

    /// The design's critical delay at the last propagation.
    pub fn arrival_time(&self) -> f64 {
        self.graph.sink_at()
    }

    /// Logs the solution quality line.
    pub fn report_solution(&self, stage: &str) {
        self.db.report_solution(stage, self.arrival_time());
    }
}
