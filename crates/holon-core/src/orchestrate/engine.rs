use std::future::Future;
use std::path::Path;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::error::{HolonError, Result};
use crate::model::IntentDescriptor;
use crate::selector::select_best_id;

use super::{
    context::OrchestrationContext,
    model::{OrchestrationEvent, StageOutput},
    runner::{ProcessStageRunner, StageRunner},
    state::{LifecycleState, OrchestrationState},
};

/// Output of a successful orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationRunReport {
    /// Intent that was processed.
    pub intent_id: String,
    /// Plan that was selected and executed.
    pub plan_id: String,
    /// Final state snapshot.
    pub state: OrchestrationState,
    /// Output of each stage, in invocation order.
    pub stage_outputs: Vec<(String, StageOutput)>,
}

/// Engine that drives one intent through its lifecycle.
///
/// Stages run strictly one after another. The first error moves the state to
/// `Failed` and ends the run; no later stage is invoked.
pub struct OrchestrationEngine<R: StageRunner = ProcessStageRunner> {
    /// Lifecycle state of the latest run.
    pub state: OrchestrationState,
    runner: R,
    events: Option<UnboundedSender<OrchestrationEvent>>,
}

impl Default for OrchestrationEngine<ProcessStageRunner> {
    fn default() -> Self {
        Self::new(ProcessStageRunner::default())
    }
}

impl<R: StageRunner> OrchestrationEngine<R> {
    /// Create a new orchestration engine with a custom runner.
    pub fn new(runner: R) -> Self {
        Self {
            state: OrchestrationState::default(),
            runner,
            events: None,
        }
    }

    /// Send progress events to `events` during each run.
    ///
    /// Sending never blocks; events are dropped once the receiver is gone.
    pub fn with_events(mut self, events: UnboundedSender<OrchestrationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stage runner in use.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run the full lifecycle for the intent described by `intent_file`.
    pub async fn run(
        &mut self,
        context: &OrchestrationContext,
        intent_file: &Path,
    ) -> Result<OrchestrationRunReport> {
        self.run_until(context, intent_file, std::future::pending::<()>())
            .await
    }

    /// Like [`run`](Self::run), but abandons the run when `shutdown`
    /// completes. The in-flight stage future is dropped, which kills its
    /// process group.
    pub async fn run_until<S>(
        &mut self,
        context: &OrchestrationContext,
        intent_file: &Path,
        shutdown: S,
    ) -> Result<OrchestrationRunReport>
    where
        S: Future<Output = ()>,
    {
        self.state = OrchestrationState::default();

        let outcome = {
            let progress = Progress(self.events.as_ref());
            let drive = drive(&self.runner, &mut self.state, progress, context, intent_file);
            tokio::select! {
                outcome = drive => outcome,
                () = shutdown => Err(HolonError::Cancelled {
                    reason: "interrupted".to_string(),
                }),
            }
        };

        match outcome {
            Ok(stage_outputs) => {
                let intent_id = self.state.intent_id.clone().unwrap_or_default();
                let plan_id = self.state.selected_plan.clone().unwrap_or_default();
                info!(intent_id = %intent_id, plan_id = %plan_id, "orchestration complete");
                Ok(OrchestrationRunReport {
                    intent_id,
                    plan_id,
                    state: self.state.clone(),
                    stage_outputs,
                })
            }
            Err(err) => {
                let failed_in = self.state.state;
                self.state.fail(&err);
                error!(after = %failed_in, error = %err, "orchestration failed");
                Err(err)
            }
        }
    }
}

/// Optional progress sink handed down to the lifecycle steps.
#[derive(Clone, Copy)]
struct Progress<'a>(Option<&'a UnboundedSender<OrchestrationEvent>>);

impl Progress<'_> {
    fn emit(self, event: OrchestrationEvent) {
        if let Some(tx) = self.0 {
            let _ = tx.send(event);
        }
    }

    fn step(self, step: u8, title: &'static str) {
        info!(step, "{title}");
        self.emit(OrchestrationEvent::StepStarted { step, title });
    }
}

async fn drive<R: StageRunner>(
    runner: &R,
    state: &mut OrchestrationState,
    progress: Progress<'_>,
    context: &OrchestrationContext,
    intent_file: &Path,
) -> Result<Vec<(String, StageOutput)>> {
    let intent = IntentDescriptor::load(intent_file)?;
    let intent_id = intent.intent_id;
    state.intent_id = Some(intent_id.clone());
    progress.emit(OrchestrationEvent::IntentLoaded {
        intent_id: intent_id.clone(),
    });

    let ledger_dir = context.ledger.root().display().to_string();
    info!(
        intent_id = %intent_id,
        ledger = %ledger_dir,
        repo = %context.repo_path.display(),
        "starting orchestration"
    );
    context.ledger.ensure_exists()?;

    let mut outputs = Vec::with_capacity(3);

    progress.step(1, "Creating Intent...");
    let args = vec![ledger_dir.clone(), intent_file.display().to_string()];
    outputs.push(run_stage(runner, progress, &context.stage_names.create, &args).await?);
    transition(state, LifecycleState::Created);

    progress.step(2, "Generating Plans...");
    let args = vec![
        ledger_dir.clone(),
        intent_id.clone(),
        context.planner_strategy.clone(),
    ];
    outputs.push(run_stage(runner, progress, &context.stage_names.plan, &args).await?);
    transition(state, LifecycleState::Planned);

    progress.step(3, "Selecting Best Plan...");
    let plans = context.ledger.read_plans()?;
    let plan_id = select_best_id(&plans, &intent_id)?;
    info!(plan_id = %plan_id, candidates = plans.len(), "selected plan");
    state.selected_plan = Some(plan_id.clone());
    transition(state, LifecycleState::Selected);
    progress.emit(OrchestrationEvent::PlanSelected {
        plan_id: plan_id.clone(),
    });

    progress.step(4, "Executing Plan...");
    let args = vec![
        ledger_dir,
        intent_id,
        plan_id,
        context.repo_path.display().to_string(),
    ];
    outputs.push(run_stage(runner, progress, &context.stage_names.execute, &args).await?);
    transition(state, LifecycleState::Executed);

    Ok(outputs)
}

async fn run_stage<R: StageRunner>(
    runner: &R,
    progress: Progress<'_>,
    stage: &str,
    args: &[String],
) -> Result<(String, StageOutput)> {
    let output = runner.run(stage, args).await?;
    progress.emit(OrchestrationEvent::StageFinished {
        stage: stage.to_string(),
        output: output.clone(),
    });
    Ok((stage.to_string(), output))
}

fn transition(state: &mut OrchestrationState, expected: LifecycleState) {
    let reached = state.advance();
    debug_assert_eq!(reached, Some(expected));
}
