#![warn(missing_docs)]

//! holon-core - intent lifecycle coordination for Holon.
//!
//! An intent moves through four stages: creation, plan generation, plan
//! selection and execution. Creation, planning and execution are delegated to
//! external stage processes; this crate sequences them and picks the plan.

/// Error types and exit-code mapping.
pub mod error;
/// Line-delimited ledger reader.
pub mod ledger;
/// Intent and plan records.
pub mod model;
/// Orchestration engine, stage runner and lifecycle state.
pub mod orchestrate;
/// Expected-value plan selection.
pub mod selector;

pub use error::{ErrorKind, HolonError, Result};
pub use ledger::{read_records, Ledger, PLANS_FILE};
pub use model::{IntentDescriptor, Plan};
pub use orchestrate::{
    LifecycleState, OrchestrationContext, OrchestrationEngine, OrchestrationEvent,
    OrchestrationRunReport, OrchestrationState, ProcessStageRunner, StageNames, StageOutput,
    StageRunner, StageSettings,
};
pub use selector::{rank_candidates, select_best, select_best_id, ScoredPlan};
