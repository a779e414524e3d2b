//! The end-to-end optimization flow.
//!
//! Chains the phases on one [`TdmContext`]:
//! 1. Continuous solve (Lagrangian, or reuse of the `_cont` checkpoint)
//! 2. Feasibility check and choice-set widening
//! 3. Legalization
//! 4. Greedy refinement
//! 5. Final report and solution file
//!
//! Intermediate solutions are checkpointed next to the output file, named
//! after `<bench>`, the output path without its extension.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tdm_config::{ContMethod, FlowConfig, LegalizeMethod};
use tdm_db::{
    read_device_map, read_placement, Design, FeasibilityReport, TdmDb, TronconSummary,
};
use tdm_diagnostics::DiagnosticSink;
use tdm_timing::GraphSummary;
use tracing::info;

use crate::context::TdmContext;
use crate::error::SolveError;
use crate::lagrangian::{solve_lagrangian, LagOutcome};
use crate::legalize::{legalize, LegalizeReport};
use crate::lp::LpModel;
use crate::refine::{refine, RefineReport};

/// Input files of a run.
#[derive(Debug, Clone)]
pub struct FlowInputs {
    /// JSON netlist.
    pub design: PathBuf,
    /// Instance-to-device assignment.
    pub devices: PathBuf,
    /// Instance placement.
    pub placement: PathBuf,
}

/// Files written by [`run_flow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPaths {
    /// Final solution.
    pub out: PathBuf,
    /// Lagrangian convergence curve, `<bench>.curve`.
    pub curve: PathBuf,
    /// Continuous checkpoint, `<bench>_cont.tdm`.
    pub cont: PathBuf,
    /// Legalized checkpoint, `<bench>_leg.tdm`.
    pub leg: PathBuf,
}

impl FlowPaths {
    /// Derives the checkpoint names from the output path.
    pub fn new(out: &Path) -> Self {
        let bench = out.with_extension("");
        Self {
            out: out.to_path_buf(),
            curve: with_suffix(&bench, ".curve"),
            cont: with_suffix(&bench, "_cont.tdm"),
            leg: with_suffix(&bench, "_leg.tdm"),
        }
    }
}

fn with_suffix(bench: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(bench.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Arrival time and violations of the current solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionReport {
    /// Critical delay.
    pub at: f64,
    /// Summed continuous-limit violation.
    pub cont_limit_vio: f64,
    /// Summed discrete-limit violation.
    pub limit_vio: usize,
    /// Summed distance to the closest choices.
    pub choice_vio: f64,
    /// Whether every ratio is a legal choice.
    pub legal: bool,
}

impl SolutionReport {
    /// Measures the context's current solution. Timing must be up to date.
    pub fn of(ctx: &TdmContext) -> Self {
        Self {
            at: ctx.arrival_time(),
            cont_limit_vio: ctx.db.cont_limit_vio(),
            limit_vio: ctx.db.limit_vio(),
            choice_vio: ctx.db.choice_vio(),
            legal: ctx.db.is_legal(),
        }
    }
}

/// Everything a run measured, phase by phase.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    /// Channel structure.
    pub troncons: TronconSummary,
    /// Timing graph structure.
    pub graph: GraphSummary,
    /// Lagrangian outcome, absent when the checkpoint was reused.
    pub lagrangian: Option<LagOutcome>,
    /// Choice-set widening.
    pub feasibility: FeasibilityReport,
    /// Legalization outcome, absent when disabled.
    pub legalize: Option<LegalizeReport>,
    /// Refinement outcome, absent when disabled.
    pub refine: Option<RefineReport>,
    /// The written solution.
    pub solution: SolutionReport,
}

/// Loads the inputs and builds the resource model and timing graph.
pub fn load_context(
    inputs: &FlowInputs,
    config: FlowConfig,
    sink: DiagnosticSink,
) -> Result<TdmContext, SolveError> {
    let design = Design::load(&inputs.design)?;
    let devices = read_device_map(&design, &inputs.devices)?;
    let placement = read_placement(&design, &inputs.placement)?;
    info!(
        design = %design.name,
        instances = design.instances.len(),
        nets = design.nets.len(),
        "design loaded"
    );
    let db = TdmDb::build(design, devices, placement, &config.channel, &sink)?;
    db.report_troncons();
    let ctx = TdmContext::new(db, config, sink)?;
    ctx.graph.report(&ctx.db);
    Ok(ctx)
}

/// Runs every configured phase and writes the solution to `out`.
pub fn run_flow(ctx: &mut TdmContext, out: &Path) -> Result<FlowSummary, SolveError> {
    let paths = FlowPaths::new(out);
    let flow = ctx.config.flow.clone();
    ctx.update_timing();
    ctx.report_solution("input");

    let lagrangian = match flow.cont {
        ContMethod::Lag => Some(solve_lagrangian(ctx, Some(&paths.curve))?),
        ContMethod::None => {
            ctx.db.read_solution(&paths.cont)?;
            ctx.update_timing();
            None
        }
    };
    ctx.report_solution("continuous");
    ctx.db.write_solution(&paths.cont)?;

    let feasibility = ctx
        .db
        .check_feasibility(ctx.config.channel.choice_ceiling, &ctx.sink);
    if feasibility.widened > 0 {
        info!(
            widened = feasibility.widened,
            max_choice = ctx.db.choices().max(),
            "choice set widened"
        );
    }

    let legalized = match flow.legalize {
        LegalizeMethod::None => None,
        method => Some(legalize(ctx, method)?),
    };
    ctx.db.write_solution(&paths.leg)?;

    let refined = flow.refine.then(|| refine(ctx));

    ctx.update_timing();
    ctx.report_solution("final");
    ctx.db.write_solution(&paths.out)?;

    Ok(FlowSummary {
        troncons: ctx.db.troncon_summary(),
        graph: ctx.graph.summary(),
        lagrangian,
        feasibility,
        legalize: legalized,
        refine: refined,
        solution: SolutionReport::of(ctx),
    })
}

/// Loads a solution file into the context and measures it.
pub fn evaluate_solution(
    ctx: &mut TdmContext,
    solution: &Path,
) -> Result<SolutionReport, SolveError> {
    ctx.db.read_solution(solution)?;
    ctx.update_timing();
    ctx.report_solution("loaded");
    Ok(SolutionReport::of(ctx))
}

/// Writes the LP/ILP export of the current problem to `path`.
pub fn export_model(ctx: &mut TdmContext, path: &Path) -> Result<LpModel, SolveError> {
    ctx.update_timing();
    let model = LpModel::build(&ctx.db, &ctx.graph);
    model.write(path)?;
    info!(
        path = %path.display(),
        variables = model.variables.len(),
        timing = model.timing.len(),
        capacity = model.capacity.len(),
        "model exported"
    );
    Ok(model)
}
