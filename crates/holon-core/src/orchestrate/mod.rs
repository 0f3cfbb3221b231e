//! Orchestration of the intent lifecycle: create, plan, select, execute.

/// Per-run configuration.
pub mod context;
/// Fail-fast lifecycle engine.
pub mod engine;
/// Stage names, stage output and progress events.
pub mod model;
/// Runner abstraction for external stages.
pub mod runner;
/// Lifecycle state machine.
pub mod state;

pub use context::OrchestrationContext;
pub use engine::{OrchestrationEngine, OrchestrationRunReport};
pub use model::{OrchestrationEvent, StageNames, StageOutput};
pub use runner::{ProcessStageRunner, StageRunner, StageSettings};
pub use state::{LifecycleState, OrchestrationState};
