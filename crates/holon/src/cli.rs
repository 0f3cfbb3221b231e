// CLI Interface
//
// `orchestrate-intent <ledger_dir> <intent_json_file> <repo_path>`

use std::path::PathBuf;

use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use tracing::{debug, warn};

use holon_core::{
    HolonError, OrchestrationContext, OrchestrationEngine, OrchestrationEvent, ProcessStageRunner,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::config::{OrchestratorConfig, DEFAULT_CONFIG_FILE};
use crate::logging::init_logging;

/// Exit code for failures that carry no orchestration error kind
pub const GENERIC_FAILURE: u8 = 1;

/// Holon - intent lifecycle orchestrator
#[derive(Parser, Debug)]
#[command(name = "orchestrate-intent")]
#[command(author = "Holon Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run an intent through create, plan, select and execute stages", long_about = None)]
pub struct Cli {
    /// Ledger directory shared with the stages
    #[arg(value_name = "LEDGER_DIR")]
    pub ledger_dir: PathBuf,

    /// Intent descriptor (JSON with an `intent_id` field)
    #[arg(value_name = "INTENT_JSON_FILE")]
    pub intent_file: PathBuf,

    /// Repository handed to the execution stage
    #[arg(value_name = "REPO_PATH")]
    pub repo_path: PathBuf,

    /// Configuration file (defaults to ./holon.toml when present)
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the stage executables
    #[arg(long = "stages-dir", value_name = "DIR")]
    pub stages_dir: Option<PathBuf>,

    /// Per-stage timeout in seconds
    #[arg(long = "stage-timeout", value_name = "SECS")]
    pub stage_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Resolve configuration: file, then environment, then flags.
    pub fn resolve_config(&self) -> AnyhowResult<OrchestratorConfig> {
        self.resolve_config_from(|key| std::env::var(key).ok())
    }

    /// [`resolve_config`](Self::resolve_config) with an explicit variable
    /// lookup in place of the process environment.
    pub fn resolve_config_from<F>(&self, lookup: F) -> AnyhowResult<OrchestratorConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {:?}", path);
                }
                OrchestratorConfig::load(path)?
            }
            None => OrchestratorConfig::load(DEFAULT_CONFIG_FILE)?,
        };

        config
            .apply_env_from(lookup)
            .context("Invalid environment override")?;

        if let Some(dir) = &self.stages_dir {
            config.stages.dir = dir.clone();
        }
        if let Some(secs) = self.stage_timeout {
            config.stages.timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Build the per-run context from arguments and configuration.
    pub fn context(&self, config: &OrchestratorConfig) -> OrchestrationContext {
        OrchestrationContext::new(&self.ledger_dir, &self.repo_path)
            .with_stage_names(config.stage_names())
            .with_planner_strategy(config.planner.strategy.clone())
    }

    /// Run the CLI
    pub async fn run(self) -> AnyhowResult<()> {
        let config = self.resolve_config()?;
        init_logging(&config.logging.level, self.verbose);
        debug!(?config, "resolved configuration");

        let context = self.context(&config);
        let (tx, rx) = unbounded_channel();
        let mut engine = OrchestrationEngine::new(ProcessStageRunner::new(config.stage_settings()))
            .with_events(tx);
        let printer = tokio::spawn(print_progress(
            rx,
            self.ledger_dir.clone(),
            self.repo_path.clone(),
        ));

        let outcome = engine
            .run_until(&context, &self.intent_file, interrupted())
            .await;

        // Closing the sender lets the printer drain and finish.
        drop(engine);
        if let Err(e) = printer.await {
            warn!(error = %e, "progress printer stopped early");
        }

        let report = outcome?;
        println!("=== Orchestration Complete ===");
        println!("Intent {} has been processed.", report.intent_id);

        Ok(())
    }
}

/// Print run progress to stdout as events arrive.
async fn print_progress(
    mut events: UnboundedReceiver<OrchestrationEvent>,
    ledger_dir: PathBuf,
    repo_path: PathBuf,
) {
    while let Some(event) = events.recv().await {
        match event {
            OrchestrationEvent::IntentLoaded { intent_id } => {
                println!("=== Holon Intent Orchestration ===");
                println!("Intent ID: {intent_id}");
                println!("Ledger Directory: {}", ledger_dir.display());
                println!("Repository Path: {}", repo_path.display());
                println!();
            }
            OrchestrationEvent::StepStarted { step, title } => {
                println!("Step {step}: {title}");
            }
            OrchestrationEvent::StageFinished { output, .. } => {
                let stdout = output.stdout.trim_end();
                if !stdout.is_empty() {
                    println!("{stdout}");
                }
                println!();
            }
            OrchestrationEvent::PlanSelected { plan_id } => {
                println!("Selected Plan: {plan_id}");
                println!();
            }
        }
    }
}

/// Resolves when the process receives an interrupt.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for interrupts");
        std::future::pending::<()>().await;
    }
}

/// Convert an argument parsing failure into a usage error.
pub fn usage_error(err: &clap::Error) -> HolonError {
    HolonError::usage(err.render().to_string())
}

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<HolonError>()
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(GENERIC_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parses_three_positionals() {
        let cli = Cli::parse_from(["orchestrate-intent", "ledger", "intent.json", "/repo"]);
        assert_eq!(cli.ledger_dir, PathBuf::from("ledger"));
        assert_eq!(cli.intent_file, PathBuf::from("intent.json"));
        assert_eq!(cli.repo_path, PathBuf::from("/repo"));
        assert!(!cli.verbose);
    }

    #[rstest]
    #[case(&["orchestrate-intent"])]
    #[case(&["orchestrate-intent", "ledger"])]
    #[case(&["orchestrate-intent", "ledger", "intent.json"])]
    #[case(&["orchestrate-intent", "ledger", "intent.json", "/repo", "extra"])]
    fn test_wrong_arity_is_usage_error(#[case] args: &[&str]) {
        let err = Cli::try_parse_from(args).expect_err("must fail");
        let usage = usage_error(&err);
        assert_eq!(usage.exit_code(), 2);
        assert!(usage.to_string().contains("Usage"));
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("holon.toml");
        std::fs::write(&config_path, "[stages]\ntimeout_secs = 5\n").expect("write config");
        let cli = Cli::parse_from([
            "orchestrate-intent",
            "--config",
            config_path.to_str().expect("utf-8 path"),
            "--stages-dir",
            "/opt/stages",
            "--stage-timeout",
            "45",
            "ledger",
            "intent.json",
            "/repo",
        ]);

        let config = cli.resolve_config_from(no_env).expect("config");
        assert_eq!(config.stages.dir, PathBuf::from("/opt/stages"));
        assert_eq!(config.stages.timeout_secs, Some(45));
    }

    #[test]
    fn test_env_sits_between_file_and_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("holon.toml");
        std::fs::write(&config_path, "[planner]\nstrategy = \"from-file\"\n").expect("write");
        let cli = Cli::parse_from([
            "orchestrate-intent",
            "--config",
            config_path.to_str().expect("utf-8 path"),
            "--stage-timeout",
            "9",
            "ledger",
            "intent.json",
            "/repo",
        ]);

        let config = cli
            .resolve_config_from(|key| match key {
                "HOLON_PLANNER_STRATEGY" => Some("from-env".to_string()),
                "HOLON_STAGE_TIMEOUT_SECS" => Some("3".to_string()),
                _ => None,
            })
            .expect("config");
        assert_eq!(config.planner.strategy, "from-env");
        assert_eq!(config.stages.timeout_secs, Some(9));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let cli = Cli::parse_from([
            "orchestrate-intent",
            "--config",
            "/definitely/not/here/holon.toml",
            "ledger",
            "intent.json",
            "/repo",
        ]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_exit_code_maps_holon_errors() {
        let err = anyhow::Error::new(HolonError::no_candidates("i1"));
        assert_eq!(exit_code(&err), 6);

        let wrapped = anyhow::Error::new(HolonError::input("intent.json", "missing intent_id"))
            .context("while orchestrating");
        assert_eq!(exit_code(&wrapped), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("config broke")), GENERIC_FAILURE);
    }

    #[test]
    fn test_context_uses_config() {
        let cli = Cli::parse_from(["orchestrate-intent", "ledger", "intent.json", "/repo"]);
        let mut config = OrchestratorConfig::default();
        config.planner.strategy = "beam".to_string();

        let context = cli.context(&config);
        assert_eq!(context.planner_strategy, "beam");
        assert_eq!(context.ledger.plans_path(), PathBuf::from("ledger/plans.jsonl"));
    }
}
