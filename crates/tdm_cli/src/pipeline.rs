//! Shared setup used by every command: logging, configuration, input
//! loading and diagnostic rendering.

use tdm_config::FlowConfig;
use tdm_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use tdm_solve::{load_context, FlowInputs, TdmContext};
use tracing_subscriber::EnvFilter;

use crate::{GlobalArgs, InputArgs};

/// Installs the tracing subscriber. `RUST_LOG` wins over the flags.
pub fn init_tracing(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(global.color)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `--config` if given, otherwise the defaults.
pub fn load_flow_config(global: &GlobalArgs) -> Result<FlowConfig, Box<dyn std::error::Error>> {
    match &global.config {
        Some(path) => Ok(tdm_config::load_config(path)?),
        None => Ok(FlowConfig::default()),
    }
}

/// Reads the three input files into a solver context.
pub fn load_inputs(
    inputs: &InputArgs,
    config: FlowConfig,
) -> Result<TdmContext, Box<dyn std::error::Error>> {
    let inputs = FlowInputs {
        design: inputs.design.clone(),
        devices: inputs.devices.clone(),
        placement: inputs.placement.clone(),
    };
    Ok(load_context(&inputs, config, DiagnosticSink::new())?)
}

/// Prints every collected diagnostic to stderr and returns the error count.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) -> usize {
    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.diagnostics() {
        if global.quiet && !diag.severity.is_error() {
            continue;
        }
        eprintln!("{}", renderer.render(&diag));
    }
    let errors = sink.error_count();
    let warnings = sink.warning_count();
    if !global.quiet && errors + warnings > 0 {
        eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn global(config: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn defaults_without_config() {
        let config = load_flow_config(&global(None)).unwrap();
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdm.toml");
        std::fs::write(&path, "[channel]\nlimit = 4\n").unwrap();
        let config = load_flow_config(&global(Some(path))).unwrap();
        assert_eq!(config.channel.limit, 4);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdm.toml");
        std::fs::write(&path, "[channel]\nmax_choice = 12\n").unwrap();
        assert!(load_flow_config(&global(Some(path))).is_err());
    }

    #[test]
    fn counts_errors_only() {
        use tdm_diagnostics::{Category, Diagnostic, DiagnosticCode};
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::warning(
            DiagnosticCode::new(Category::Channel, 1),
            "tight",
        ));
        sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Channel, 3),
            "infeasible",
        ));
        assert_eq!(render_diagnostics(&sink, &global(None)), 1);
    }
}
