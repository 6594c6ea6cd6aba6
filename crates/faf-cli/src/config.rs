//! Runtime configuration from environment.

use anyhow::{bail, Context, Result};
use faf_core::PlannerRules;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// JSON file overriding the default planner rules
    pub rules_path: Option<PathBuf>,
    /// Batch worker threads; rayon's default when unset
    pub workers: Option<usize>,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rules_path: lookup("FAF_RULES").filter(|s| !s.trim().is_empty()).map(PathBuf::from),
            workers: lookup("FAF_WORKERS")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n| *n > 0),
            log_json: lookup("FAF_LOG_JSON")
                .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Planner rules: the override file when configured, defaults otherwise.
    pub fn load_rules(&self) -> Result<PlannerRules> {
        let Some(path) = &self.rules_path else {
            return Ok(PlannerRules::default());
        };
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read rules {}", path.display()))?;
        parse_rules(&text).with_context(|| format!("Invalid rules {}", path.display()))
    }
}

/// Parse a (possibly partial) rules override; missing keys keep their defaults.
pub fn parse_rules(text: &str) -> Result<PlannerRules> {
    let rules: PlannerRules = serde_json::from_str(text)?;
    let errors = rules.validate();
    if !errors.is_empty() {
        bail!("{}", errors.join("; "));
    }
    Ok(rules)
}

/// Install the global subscriber. `RUST_LOG` refines the default directives.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("faf_core=info".parse()?)
        .add_directive("faf_cli=debug".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| fmt::layer().json()))
        .with((!config.log_json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(config(&[]), Config::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = config(&[
            ("FAF_RULES", "rules.json"),
            ("FAF_WORKERS", "4"),
            ("FAF_LOG_JSON", "true"),
        ]);
        assert_eq!(cfg.rules_path, Some(PathBuf::from("rules.json")));
        assert_eq!(cfg.workers, Some(4));
        assert!(cfg.log_json);
    }

    #[test]
    fn ignores_unusable_values() {
        let cfg = config(&[("FAF_RULES", " "), ("FAF_WORKERS", "0"), ("FAF_LOG_JSON", "no")]);
        assert_eq!(cfg, Config::default());
        assert_eq!(config(&[("FAF_WORKERS", "many")]).workers, None);
    }

    #[test]
    fn default_rules_without_override() {
        assert_eq!(Config::default().load_rules().unwrap(), PlannerRules::default());
    }

    #[test]
    fn partial_rules_override() {
        let rules = parse_rules(r#"{ "straight_points_per_km": 20.0 }"#).unwrap();
        assert_eq!(rules.straight_points_per_km, 20.0);
        assert_eq!(rules.arc_points_per_turn, PlannerRules::default().arc_points_per_turn);
    }

    #[test]
    fn invalid_rules_are_rejected() {
        assert!(parse_rules(r#"{ "straight_points_per_km": -1.0 }"#).is_err());
        assert!(parse_rules("not json").is_err());
        // Partial overrides that would otherwise reach a clamp or an empty sample set
        assert!(parse_rules(r#"{ "min_initial_leg_km": 8.0 }"#).is_err());
        assert!(parse_rules(r#"{ "min_vertical_points": 0 }"#).is_err());
    }

    #[test]
    fn missing_rules_file_is_an_error() {
        let cfg = Config {
            rules_path: Some(PathBuf::from("/nonexistent/faf-rules.json")),
            ..Config::default()
        };
        assert!(cfg.load_rules().is_err());
    }
}
