// Orchestrator Configuration
//
// Stage locations, planner strategy and logging defaults, loaded from TOML
// with environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use holon_core::orchestrate::context::DEFAULT_PLANNER_STRATEGY;
use holon_core::orchestrate::model::{
    DEFAULT_CREATE_STAGE, DEFAULT_EXECUTE_STAGE, DEFAULT_PLAN_STAGE,
};
use holon_core::orchestrate::runner::{DEFAULT_INTERPRETER, DEFAULT_STAGES_DIR};
use holon_core::{StageNames, StageSettings};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "holon.toml";

/// Accepted log levels
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// External stage settings
    pub stages: StagesConfig,

    /// Planning settings
    pub planner: PlannerConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file yields the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Apply `HOLON_*` environment overrides
    ///
    /// Environment variables:
    /// - `HOLON_STAGES_DIR` - Directory holding the stage executables
    /// - `HOLON_INTERPRETER` - Stage interpreter (empty runs stages directly)
    /// - `HOLON_STAGE_TIMEOUT_SECS` - Per-stage timeout in seconds
    /// - `HOLON_PLANNER_STRATEGY` - Strategy passed to the planning stage
    /// - `HOLON_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
    ///
    /// `lookup` resolves a variable name; the CLI passes the process
    /// environment.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("HOLON_STAGES_DIR") {
            self.stages.dir = PathBuf::from(dir);
        }

        if let Some(interpreter) = lookup("HOLON_INTERPRETER") {
            self.stages.interpreter = interpreter;
        }

        if let Some(raw) = lookup("HOLON_STAGE_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("HOLON_STAGE_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            self.stages.timeout_secs = Some(secs);
        }

        if let Some(strategy) = lookup("HOLON_PLANNER_STRATEGY") {
            self.planner.strategy = strategy;
        }

        if let Some(level) = lookup("HOLON_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("stages.create", &self.stages.create),
            ("stages.plan", &self.stages.plan),
            ("stages.execute", &self.stages.execute),
            ("planner.strategy", &self.planner.strategy),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} cannot be empty")));
            }
        }

        if self.stages.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "stages.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Runner settings derived from the `[stages]` section
    pub fn stage_settings(&self) -> StageSettings {
        let interpreter = self.stages.interpreter.trim();
        StageSettings {
            stages_dir: self.stages.dir.clone(),
            interpreter: (!interpreter.is_empty()).then(|| interpreter.to_string()),
            timeout: self.stages.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Stage names from the `[stages]` section
    pub fn stage_names(&self) -> StageNames {
        StageNames {
            create: self.stages.create.clone(),
            plan: self.stages.plan.clone(),
            execute: self.stages.execute.clone(),
        }
    }
}

/// External stage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StagesConfig {
    /// Directory holding the stage executables
    pub dir: PathBuf,

    /// Interpreter used to launch stages; empty executes them directly
    pub interpreter: String,

    /// Creation stage name
    pub create: String,

    /// Planning stage name
    pub plan: String,

    /// Execution stage name
    pub execute: String,

    /// Per-stage timeout in seconds (unset waits indefinitely)
    pub timeout_secs: Option<u64>,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STAGES_DIR),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            create: DEFAULT_CREATE_STAGE.to_string(),
            plan: DEFAULT_PLAN_STAGE.to_string(),
            execute: DEFAULT_EXECUTE_STAGE.to_string(),
            timeout_secs: None,
        }
    }
}

/// Planning configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Strategy name handed to the planning stage
    pub strategy: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_PLANNER_STRATEGY.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to parse configuration from file
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configuration contains invalid values or settings
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
