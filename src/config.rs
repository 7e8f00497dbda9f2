//! Configuration for the A/B test toolkit
//!
//! Loads configuration from config.yml file. Environment variables
//! (`AB_ALPHA`, `AB_GROUP_A`, `AB_GROUP_B`, `AB_OUTPUT_DIR`, `AB_SIM_SEED`)
//! take precedence over file values; `${VAR}` placeholders in the file are
//! resolved from the environment.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::analytics::contingency::{DEFAULT_LABEL_A, DEFAULT_LABEL_B};
use crate::analytics::SignificanceLevel;
use crate::etl::EventNames;
use crate::simulation::{
    SimulationConfig, DEFAULT_COMMENT_PROBABILITY, DEFAULT_CONVERSION_RATE_A,
    DEFAULT_CONVERSION_RATE_B, DEFAULT_VISITORS_PER_VERSION,
};
use crate::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_OUTPUT_DIR: &str = "ab_test_output";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    analysis: Option<AnalysisConfig>,
    etl: Option<EtlConfig>,
    simulation: Option<YamlSimulationConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    alpha: Option<String>,
    group_a: Option<String>,
    group_b: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EtlConfig {
    output_dir: Option<String>,
    visit_event: Option<String>,
    conversion_event: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlSimulationConfig {
    visitors_per_version: Option<u64>,
    conversion_rate_a: Option<f64>,
    conversion_rate_b: Option<f64>,
    comment_probability: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    seed: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub alpha: SignificanceLevel,
    pub group_a: String,
    pub group_b: String,
    pub output_dir: PathBuf,
    pub event_names: EventNames,
    pub visitors_per_version: u64,
    pub conversion_rate_a: f64,
    pub conversion_rate_b: f64,
    pub comment_probability: f64,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    ///
    /// Errors are logged and replaced by the built-in defaults; commands use
    /// [`Config::load`] instead so a broken file is reported.
    pub fn new() -> Self {
        Self::load().unwrap_or_else(|err| {
            warn!("Ignoring configuration, using defaults: {}", err);
            Self::defaults()
        })
    }

    /// Load `.env`, then `config.yml` from the current directory or, only if
    /// that file does not exist, from the parent directory.
    pub fn load() -> Result<Self> {
        Self::load_dotenv();
        Self::load_first_existing(&[
            PathBuf::from(CONFIG_FILE),
            Path::new("..").join(CONFIG_FILE),
        ])
    }

    /// Load the first candidate file that exists. A file that exists but
    /// fails to parse or validate is an error, later candidates are not
    /// tried. Without any file, defaults plus environment overrides apply.
    pub fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                Self::load_from_file(path)
            }
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE);
                Self::from_yaml(YamlConfig::default())
            }
        }
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }
        match value {
            Some(v) if v.starts_with("${") && v.ends_with('}') => {
                let var_name = &v[2..v.len() - 1];
                std::env::var(var_name).ok().filter(|s| !s.is_empty())
            }
            other => other,
        }
    }

    /// Resolve and parse a value from string config or env var
    fn resolve_env_parsed<T>(value: Option<String>, env_key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::resolve_env_string(value, env_key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                Error::ConfigError(format!("cannot parse '{}' ({}): {}", raw, env_key, e))
            }),
        }
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: YamlConfig) -> Result<Self> {
        let analysis = yaml.analysis.unwrap_or_default();
        let etl = yaml.etl.unwrap_or_default();
        let sim = yaml.simulation.unwrap_or_default();

        let alpha = match Self::resolve_env_parsed::<f64>(analysis.alpha, "AB_ALPHA")? {
            Some(value) => SignificanceLevel::new(value)
                .map_err(|e| Error::ConfigError(e.to_string()))?,
            None => SignificanceLevel::default(),
        };

        let defaults = EventNames::default();
        let config = Self {
            alpha,
            group_a: Self::resolve_env_string(analysis.group_a, "AB_GROUP_A")
                .unwrap_or_else(|| DEFAULT_LABEL_A.to_string()),
            group_b: Self::resolve_env_string(analysis.group_b, "AB_GROUP_B")
                .unwrap_or_else(|| DEFAULT_LABEL_B.to_string()),
            output_dir: Self::resolve_env_string(etl.output_dir, "AB_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            event_names: EventNames {
                visit: etl.visit_event.unwrap_or(defaults.visit),
                conversion: etl.conversion_event.unwrap_or(defaults.conversion),
            },
            visitors_per_version: sim
                .visitors_per_version
                .unwrap_or(DEFAULT_VISITORS_PER_VERSION),
            conversion_rate_a: sim.conversion_rate_a.unwrap_or(DEFAULT_CONVERSION_RATE_A),
            conversion_rate_b: sim.conversion_rate_b.unwrap_or(DEFAULT_CONVERSION_RATE_B),
            comment_probability: sim
                .comment_probability
                .unwrap_or(DEFAULT_COMMENT_PROBABILITY),
            seed: Self::resolve_env_parsed::<u64>(sim.seed, "AB_SIM_SEED")?,
        };

        config
            .simulation_config()
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Create config with built-in defaults, ignoring the environment
    pub fn defaults() -> Self {
        Self {
            alpha: SignificanceLevel::default(),
            group_a: DEFAULT_LABEL_A.to_string(),
            group_b: DEFAULT_LABEL_B.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            event_names: EventNames::default(),
            visitors_per_version: DEFAULT_VISITORS_PER_VERSION,
            conversion_rate_a: DEFAULT_CONVERSION_RATE_A,
            conversion_rate_b: DEFAULT_CONVERSION_RATE_B,
            comment_probability: DEFAULT_COMMENT_PROBABILITY,
            seed: None,
        }
    }

    /// Simulation settings derived from this configuration
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            visitors_per_version: self.visitors_per_version,
            conversion_rate_a: self.conversion_rate_a,
            conversion_rate_b: self.conversion_rate_b,
            comment_probability: self.comment_probability,
            seed: self.seed,
            label_a: self.group_a.clone(),
            label_b: self.group_b.clone(),
            ..SimulationConfig::default()
        }
    }
}
