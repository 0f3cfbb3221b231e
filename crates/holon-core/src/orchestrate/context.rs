use std::path::PathBuf;

use crate::ledger::Ledger;

use super::model::StageNames;

/// Planner strategy handed to the planning stage unless overridden.
pub const DEFAULT_PLANNER_STRATEGY: &str = "bootstrap-planner";

/// Runtime configuration for one orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationContext {
    /// Ledger the stages write to and plans are read from.
    pub ledger: Ledger,
    /// Repository handed to the execution stage.
    pub repo_path: PathBuf,
    /// External stage names.
    pub stage_names: StageNames,
    /// Strategy name passed to the planning stage.
    pub planner_strategy: String,
}

impl OrchestrationContext {
    /// Create a context with default stage names and planner strategy.
    pub fn new(ledger_dir: impl Into<PathBuf>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger: Ledger::new(ledger_dir),
            repo_path: repo_path.into(),
            stage_names: StageNames::default(),
            planner_strategy: DEFAULT_PLANNER_STRATEGY.to_string(),
        }
    }

    /// Override the stage names.
    pub fn with_stage_names(mut self, stage_names: StageNames) -> Self {
        self.stage_names = stage_names;
        self
    }

    /// Override the planner strategy.
    pub fn with_planner_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.planner_strategy = strategy.into();
        self
    }
}
