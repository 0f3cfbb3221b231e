use serde::{Deserialize, Serialize};

/// Default creation stage script.
pub const DEFAULT_CREATE_STAGE: &str = "intent_creator.sh";
/// Default planning stage script.
pub const DEFAULT_PLAN_STAGE: &str = "planner.sh";
/// Default execution stage script.
pub const DEFAULT_EXECUTE_STAGE: &str = "executor.sh";

/// Names of the three external stages, resolved by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNames {
    /// Creates the intent in the ledger.
    pub create: String,
    /// Appends candidate plans to the ledger.
    pub plan: String,
    /// Executes the chosen plan.
    pub execute: String,
}

impl Default for StageNames {
    fn default() -> Self {
        Self {
            create: DEFAULT_CREATE_STAGE.to_string(),
            plan: DEFAULT_PLAN_STAGE.to_string(),
            execute: DEFAULT_EXECUTE_STAGE.to_string(),
        }
    }
}

/// Output captured from a stage that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Captured standard output. Informational only.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Progress notification emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationEvent {
    /// The descriptor was read and the run is about to touch the ledger.
    IntentLoaded {
        /// Intent being processed.
        intent_id: String,
    },
    /// A lifecycle step is starting.
    StepStarted {
        /// 1-based step number.
        step: u8,
        /// Human-readable heading.
        title: &'static str,
    },
    /// A stage exited successfully.
    StageFinished {
        /// Stage name.
        stage: String,
        /// What the stage printed.
        output: StageOutput,
    },
    /// The selector chose a plan.
    PlanSelected {
        /// Chosen plan.
        plan_id: String,
    },
}
