//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::PlacerConfig;
use std::path::Path;

/// Loads and validates an `islet.toml` configuration file.
pub fn load_config(path: &Path) -> Result<PlacerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PlacerConfig, ConfigError> {
    let config: PlacerConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks that the schedule parameters are usable.
fn validate_config(config: &PlacerConfig) -> Result<(), ConfigError> {
    let anneal = &config.anneal;
    if !(anneal.cooling_rate > 0.0 && anneal.cooling_rate < 1.0) {
        return Err(ConfigError::Validation(format!(
            "cooling_rate must be in (0, 1), got {}",
            anneal.cooling_rate
        )));
    }
    if anneal.final_temperature <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "final_temperature must be positive, got {}",
            anneal.final_temperature
        )));
    }
    if anneal.initial_temperature < anneal.final_temperature {
        return Err(ConfigError::Validation(
            "initial_temperature must not be below final_temperature".to_string(),
        ));
    }
    if anneal.moves_per_temperature == 0 {
        return Err(ConfigError::Validation(
            "moves_per_temperature must be at least 1".to_string(),
        ));
    }
    let probs = config.perturb.as_array();
    if probs.iter().any(|p| *p < 0.0) {
        return Err(ConfigError::Validation(
            "perturbation probabilities must be non-negative".to_string(),
        ));
    }
    if probs.iter().sum::<f64>() <= 0.0 {
        return Err(ConfigError::Validation(
            "perturbation probabilities must not all be zero".to_string(),
        ));
    }
    if config.timeout.seconds == 0 {
        return Err(ConfigError::Validation(
            "timeout seconds must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.anneal.cooling_rate, 0.85);
    }

    #[test]
    fn full_config_parses() {
        let toml = r#"
[anneal]
initial_temperature = 500.0
final_temperature = 0.5
cooling_rate = 0.9
moves_per_temperature = 100
no_improvement_limit = 5

[timeout]
seconds = 60
emergency_seconds = 5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.anneal.initial_temperature, 500.0);
        assert_eq!(config.anneal.no_improvement_limit, 5);
        assert_eq!(config.timeout.seconds, 60);
        assert_eq!(config.timeout.emergency_seconds, 5);
    }

    #[test]
    fn rejects_bad_cooling_rate() {
        let err = load_config_from_str("[anneal]\ncooling_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_final_temperature() {
        let err = load_config_from_str("[anneal]\nfinal_temperature = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_inverted_temperatures() {
        let toml = "[anneal]\ninitial_temperature = 0.5\nfinal_temperature = 2.0\n";
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn rejects_zero_moves() {
        let err = load_config_from_str("[anneal]\nmoves_per_temperature = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_negative_probability() {
        let err = load_config_from_str("[perturb]\nswap = -0.1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_all_zero_probabilities() {
        let toml = "[perturb]\nrotate = 0\nmove = 0\nswap = 0\nchange_rep = 0\nconvert_sym = 0\n";
        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = load_config_from_str("[timeout]\nseconds = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_syntax_errors() {
        let err = load_config_from_str("[anneal\ncooling_rate = 0.9").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeout]").unwrap();
        writeln!(file, "seconds = 30").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.timeout.seconds, 30);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nope/islet.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
