//! `tdmopt report`: arrival time and violations of a solution file.

use tdm_solve::{evaluate_solution, SolutionReport};

use crate::pipeline::{load_flow_config, load_inputs, render_diagnostics};
use crate::{GlobalArgs, ReportArgs, ReportFormat};

/// Runs the `tdmopt report` command.
///
/// Exit code 1 means the solution is not legal or breaks a channel limit.
pub fn run(args: &ReportArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_flow_config(global)?;
    let mut ctx = load_inputs(&args.inputs, config)?;
    let report = evaluate_solution(&mut ctx, &args.solution)?;
    let errors = render_diagnostics(&ctx.sink, global);

    match args.format {
        ReportFormat::Text => println!("{}", format_report(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    let ok = errors == 0 && report.legal && report.limit_vio == 0;
    Ok(if ok { 0 } else { 1 })
}

fn format_report(report: &SolutionReport) -> String {
    format!(
        "arrival time     {:.3}\n\
         limit vio        {}\n\
         cont limit vio   {:.3}\n\
         choice vio       {:.3}\n\
         legal            {}",
        report.at, report.limit_vio, report.cont_limit_vio, report.choice_vio, report.legal
    )
}
