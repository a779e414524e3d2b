//! tdmopt: TDM ratio optimization for multi-FPGA designs.
//!
//! Provides `tdmopt run` for the full optimization flow, `tdmopt export-model`
//! for handing the problem to an external LP/ILP solver, and `tdmopt report`
//! for evaluating an existing solution file.

#![warn(missing_docs)]

mod export;
mod pipeline;
mod report;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// tdmopt assigns TDM ratios to inter-FPGA nets.
#[derive(Parser, Debug)]
#[command(name = "tdmopt", version, about = "TDM ratio optimizer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `tdm.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Optimize the ratios and write the solution.
    Run(RunArgs),
    /// Write the LP/ILP model of the problem as JSON.
    ExportModel(ExportArgs),
    /// Evaluate a solution file.
    Report(ReportArgs),
}

/// The three input files every command reads.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON netlist.
    #[arg(long)]
    pub design: PathBuf,

    /// Instance-to-device assignment.
    #[arg(long)]
    pub devices: PathBuf,

    /// Instance placement.
    #[arg(long)]
    pub placement: PathBuf,
}

/// Arguments for the `tdmopt run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Solution file; checkpoints are written next to it.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Continuous solving strategy.
    #[arg(long, value_enum)]
    pub cont: Option<CliCont>,

    /// Legalization objective.
    #[arg(long, value_enum)]
    pub legalize: Option<CliLegalize>,

    /// Worker threads.
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Lagrangian iteration budget.
    #[arg(long)]
    pub lag_iter: Option<usize>,

    /// Evaluate the dual bound at every Lagrangian iteration.
    #[arg(long)]
    pub compute_dual: bool,

    /// Skip greedy refinement.
    #[arg(long)]
    pub no_refine: bool,

    /// Output format for the run summary.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `tdmopt export-model` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Model output path.
    #[arg(short, long)]
    pub model: PathBuf,

    /// Solution to load before exporting, used as the warm start.
    #[arg(long)]
    pub solution: Option<PathBuf>,
}

/// Arguments for the `tdmopt report` subcommand.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Solution file to evaluate.
    #[arg(short, long)]
    pub solution: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Continuous solving strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliCont {
    /// Lagrangian relaxation.
    Lag,
    /// Reuse the `<bench>_cont.tdm` checkpoint.
    None,
}

/// Legalization objective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliLegalize {
    /// Minimize total displacement.
    Disp,
    /// Minimize the worst displacement first.
    MaxDisp,
    /// Keep continuous values.
    None,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Output format of summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    pipeline::init_tracing(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::ExportModel(ref args) => export::run(args, &global),
        Command::Report(ref args) => report::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUTS: [&str; 6] = [
        "--design",
        "b.json",
        "--devices",
        "b.device",
        "--placement",
        "b.pos",
    ];

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["tdmopt"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn parse_run_default() {
        let mut args = vec!["run"];
        args.extend(INPUTS);
        args.extend(["--out", "b.tdm"]);
        let cli = parse(&args);
        match cli.command {
            Command::Run(ref run) => {
                assert_eq!(run.inputs.design, PathBuf::from("b.json"));
                assert_eq!(run.out, PathBuf::from("b.tdm"));
                assert!(run.cont.is_none());
                assert!(run.legalize.is_none());
                assert!(run.threads.is_none());
                assert!(!run.no_refine);
                assert_eq!(run.format, ReportFormat::Text);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_overrides() {
        let mut args = vec!["run"];
        args.extend(INPUTS);
        args.extend([
            "--out",
            "b.tdm",
            "--cont",
            "none",
            "--legalize",
            "max-disp",
            "-j",
            "4",
            "--lag-iter",
            "200",
            "--compute-dual",
            "--no-refine",
        ]);
        let cli = parse(&args);
        match cli.command {
            Command::Run(ref run) => {
                assert_eq!(run.cont, Some(CliCont::None));
                assert_eq!(run.legalize, Some(CliLegalize::MaxDisp));
                assert_eq!(run.threads, Some(4));
                assert_eq!(run.lag_iter, Some(200));
                assert!(run.compute_dual);
                assert!(run.no_refine);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_export_model() {
        let mut args = vec!["export-model"];
        args.extend(INPUTS);
        args.extend(["--model", "m.json"]);
        let cli = parse(&args);
        match cli.command {
            Command::ExportModel(ref export) => {
                assert_eq!(export.model, PathBuf::from("m.json"));
                assert!(export.solution.is_none());
            }
            _ => panic!("expected ExportModel command"),
        }
    }

    #[test]
    fn parse_report_json() {
        let mut args = vec!["report"];
        args.extend(INPUTS);
        args.extend(["--solution", "b.tdm", "--format", "json"]);
        let cli = parse(&args);
        match cli.command {
            Command::Report(ref report) => {
                assert_eq!(report.solution, PathBuf::from("b.tdm"));
                assert_eq!(report.format, ReportFormat::Json);
            }
            _ => panic!("expected Report command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let mut args = vec!["--quiet", "--config", "tdm.toml", "--color", "never", "report"];
        args.extend(INPUTS);
        args.extend(["--solution", "b.tdm"]);
        let cli = parse(&args);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.config, Some(PathBuf::from("tdm.toml")));
    }

    #[test]
    fn missing_inputs_rejected() {
        let result = Cli::try_parse_from(["tdmopt", "run", "--out", "b.tdm"]);
        assert!(result.is_err());
    }
}
