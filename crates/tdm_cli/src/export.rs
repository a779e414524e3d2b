//! `tdmopt export-model`: the LP/ILP model as JSON.

use crate::pipeline::{load_flow_config, load_inputs, render_diagnostics};
use crate::{ExportArgs, GlobalArgs};

/// Runs the `tdmopt export-model` command.
pub fn run(args: &ExportArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_flow_config(global)?;
    let mut ctx = load_inputs(&args.inputs, config)?;
    if let Some(solution) = &args.solution {
        ctx.db.read_solution(solution)?;
    }
    let model = tdm_solve::export_model(&mut ctx, &args.model)?;
    let errors = render_diagnostics(&ctx.sink, global);

    if !global.quiet {
        eprintln!(
            "  Exported {} variables, {} timing and {} capacity constraints to {}",
            model.variables.len(),
            model.timing.len(),
            model.capacity.len(),
            args.model.display()
        );
    }
    Ok(if errors > 0 { 1 } else { 0 })
}
