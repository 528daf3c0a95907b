//! Run configuration.
//!
//! Defaults, overridden by environment variables (a `.env` file is honoured by
//! the binary), overridden again by command line flags.

use crate::error::ConfigError;
use crate::models::Ipv4;
use std::str::FromStr;

/// Viewer account override.
pub const ENV_ACCOUNT_ID: &str = "AWSNET_ACCOUNT_ID";
/// `first` or `last`.
pub const ENV_DUPLICATE_KEYS: &str = "AWSNET_DUPLICATE_KEYS";
/// `supernet` or `exact`.
pub const ENV_ROUTE_COVERAGE: &str = "AWSNET_ROUTE_COVERAGE";
/// Truthy value disables parallel document reads.
pub const ENV_SEQUENTIAL_LOAD: &str = "AWSNET_SEQUENTIAL_LOAD";

/// Default log4rs configuration file.
pub const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";
/// Default snapshot directory, as written by the export script.
pub const DEFAULT_INPUT_DIR: &str = "./aws-data";

/// Which record wins when two records of one family share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    FirstWins,
    #[default]
    LastWins,
}

impl DuplicateKeyPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            DuplicateKeyPolicy::FirstWins => "first",
            DuplicateKeyPolicy::LastWins => "last",
        }
    }
}

impl FromStr for DuplicateKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-wins" => Ok(DuplicateKeyPolicy::FirstWins),
            "last" | "last-wins" => Ok(DuplicateKeyPolicy::LastWins),
            _ => Err(ConfigError::DuplicateKeyPolicy(s.to_string())),
        }
    }
}

/// When a route destination counts as covering a target CIDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteCoverage {
    /// Equal or supernet destinations cover the target.
    #[default]
    Supernet,
    /// Only an identical network covers the target.
    Exact,
}

impl RouteCoverage {
    pub fn covers(&self, route: &Ipv4, target: &Ipv4) -> bool {
        match self {
            RouteCoverage::Supernet => route.contains_net(target),
            RouteCoverage::Exact => route.network() == target.network(),
        }
    }
}

impl FromStr for RouteCoverage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supernet" => Ok(RouteCoverage::Supernet),
            "exact" => Ok(RouteCoverage::Exact),
            _ => Err(ConfigError::RouteCoverage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Overrides the account id found in `metadata.json`.
    pub viewer_account: Option<String>,
    pub duplicate_keys: DuplicateKeyPolicy,
    pub coverage: RouteCoverage,
    /// Read documents on the rayon pool. Output is identical either way.
    pub parallel_load: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            viewer_account: None,
            duplicate_keys: DuplicateKeyPolicy::default(),
            coverage: RouteCoverage::default(),
            parallel_load: true,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<AnalysisConfig, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `AWSNET_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<AnalysisConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AnalysisConfig::default();
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(account) = value(ENV_ACCOUNT_ID) {
            config.viewer_account = Some(account.trim().to_string());
        }
        if let Some(policy) = value(ENV_DUPLICATE_KEYS) {
            config.duplicate_keys = policy.parse()?;
        }
        if let Some(coverage) = value(ENV_ROUTE_COVERAGE) {
            config.coverage = coverage.parse()?;
        }
        if let Some(sequential) = value(ENV_SEQUENTIAL_LOAD) {
            config.parallel_load = !parse_flag(ENV_SEQUENTIAL_LOAD, &sequential)?;
        }
        log::debug!("config from environment: {config:?}");
        Ok(config)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Flag {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
