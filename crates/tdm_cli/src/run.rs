//! `tdmopt run`: the full optimization flow.

use tdm_config::{ContMethod, FlowConfig, LegalizeMethod};
use tdm_solve::{run_flow, FlowSummary};

use crate::pipeline::{load_flow_config, load_inputs, render_diagnostics};
use crate::{CliCont, CliLegalize, GlobalArgs, ReportFormat, RunArgs};

/// Runs the `tdmopt run` command.
///
/// Returns exit code 0 on success, 1 when an error diagnostic was emitted.
/// The solution file is written in both cases.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = load_flow_config(global)?;
    apply_overrides(&mut config, args);
    tdm_config::validate_config(&config)?;

    if !global.quiet {
        eprintln!("   Loading {}", args.inputs.design.display());
    }
    let mut ctx = load_inputs(&args.inputs, config)?;
    let summary = run_flow(&mut ctx, &args.out)?;
    let errors = render_diagnostics(&ctx.sink, global);

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                print_summary(&summary);
                eprintln!("     Written {}", args.out.display());
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(if errors > 0 { 1 } else { 0 })
}

/// Applies command-line flags on top of the configuration file.
fn apply_overrides(config: &mut FlowConfig, args: &RunArgs) {
    if let Some(cont) = args.cont {
        config.flow.cont = match cont {
            CliCont::Lag => ContMethod::Lag,
            CliCont::None => ContMethod::None,
        };
    }
    if let Some(legalize) = args.legalize {
        config.flow.legalize = match legalize {
            CliLegalize::Disp => LegalizeMethod::Disp,
            CliLegalize::MaxDisp => LegalizeMethod::MaxDisp,
            CliLegalize::None => LegalizeMethod::None,
        };
    }
    if let Some(threads) = args.threads {
        config.flow.threads = threads;
    }
    if let Some(lag_iter) = args.lag_iter {
        config.flow.lag_iter = lag_iter;
    }
    if args.compute_dual {
        config.flow.compute_dual = true;
    }
    if args.no_refine {
        config.flow.refine = false;
    }
}

fn print_summary(summary: &FlowSummary) {
    eprintln!(
        "  Troncons {} ({} active, {} optimized ratios)",
        summary.troncons.troncons, summary.troncons.active, summary.troncons.opt_vars
    );
    if let Some(lag) = &summary.lagrangian {
        eprintln!(
            "Lagrangian {} iterations, primal {:.3}, dual {:.3}, gap {:.4}",
            lag.iterations, lag.primal, lag.dual, lag.gap
        );
    }
    if summary.feasibility.widened > 0 {
        eprintln!("   Widened choice set by {}", summary.feasibility.widened);
    }
    if let Some(leg) = &summary.legalize {
        eprintln!(
            "  Legalized {} troncons, avg disp {:.3}, max disp {:.3}",
            leg.legalized, leg.avg_disp, leg.max_max_disp
        );
    }
    if let Some(refine) = &summary.refine {
        eprintln!(
            "   Refined {} swaps, {:.3} -> {:.3}",
            refine.swaps, refine.at_before, refine.at_after
        );
    }
    let s = &summary.solution;
    eprintln!(
        "  Solution at {:.3}, limit vio {}, choice vio {:.3}{}",
        s.at,
        s.limit_vio,
        s.choice_vio,
        if s.legal { "" } else { " (not legal)" }
    );
}
