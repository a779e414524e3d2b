//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::FlowConfig;
use std::path::Path;

/// Loads and validates a `tdm.toml` configuration from the given file.
pub fn load_config(path: &Path) -> Result<FlowConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `tdm.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<FlowConfig, ConfigError> {
    let config: FlowConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are usable by every phase.
pub fn validate_config(config: &FlowConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.flow.threads == 0 {
        return invalid("flow.threads must be at least 1");
    }
    if config.flow.lag_iter == 0 {
        return invalid("flow.lag_iter must be at least 1");
    }
    if config.channel.limit == 0 {
        return invalid("channel.limit must be at least 1");
    }
    if config.channel.max_choice == 0 || config.channel.max_choice % 8 != 0 {
        return invalid("channel.max_choice must be a positive multiple of 8");
    }
    if config.channel.choice_ceiling % 8 != 0 {
        return invalid("channel.choice_ceiling must be a multiple of 8");
    }
    if config.channel.choice_ceiling < config.channel.max_choice {
        return invalid("channel.choice_ceiling must not be below channel.max_choice");
    }
    for (name, value) in [
        ("timing.tdm_coef", config.timing.tdm_coef),
        ("timing.lut_delay", config.timing.lut_delay),
        ("timing.wire_delay_coef", config.timing.wire_delay_coef),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be finite and non-negative"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContMethod, LegalizeMethod};

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, FlowConfig::default());
        assert_eq!(config.flow.cont, ContMethod::Lag);
        assert_eq!(config.flow.legalize, LegalizeMethod::MaxDisp);
        assert!(config.flow.refine);
        assert_eq!(config.flow.threads, 8);
        assert_eq!(config.flow.lag_iter, 1000);
        assert!(!config.flow.compute_dual);
        assert_eq!(config.channel.limit, 20);
        assert_eq!(config.channel.max_choice, 1600);
        assert_eq!(config.channel.choice_ceiling, 1600);
        assert_eq!(config.timing.tdm_coef, 5.0);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[flow]
cont = "none"
legalize = "disp"
refine = false
threads = 2
lag_iter = 150
compute_dual = true

[channel]
limit = 4
max_choice = 64
choice_ceiling = 256

[timing]
tdm_coef = 4.0
lut_delay = 1.5
wire_delay_coef = 0.5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.flow.cont, ContMethod::None);
        assert_eq!(config.flow.legalize, LegalizeMethod::Disp);
        assert!(!config.flow.refine);
        assert_eq!(config.flow.threads, 2);
        assert_eq!(config.flow.lag_iter, 150);
        assert!(config.flow.compute_dual);
        assert_eq!(config.channel.limit, 4);
        assert_eq!(config.channel.max_choice, 64);
        assert_eq!(config.channel.choice_ceiling, 256);
        assert_eq!(config.timing.lut_delay, 1.5);
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_field_errors() {
        let err = load_config_from_str("[flow]\nthread = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn zero_threads_rejected() {
        let err = load_config_from_str("[flow]\nthreads = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn max_choice_must_be_multiple_of_eight() {
        let err = load_config_from_str("[channel]\nmax_choice = 100\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn ceiling_below_max_choice_rejected() {
        let toml = "[channel]\nmax_choice = 64\nchoice_ceiling = 32\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn negative_coefficient_rejected() {
        let err = load_config_from_str("[timing]\ntdm_coef = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdm.toml");
        std::fs::write(&path, "[flow]\nthreads = 3\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.flow.threads, 3);
    }

    #[test]
    fn io_error_from_missing_file() {
        let err = load_config(Path::new("/nonexistent/dir/tdm.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
