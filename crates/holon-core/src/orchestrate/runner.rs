use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{HolonError, Result};

use super::model::StageOutput;

/// Default directory holding the stage executables.
pub const DEFAULT_STAGES_DIR: &str = "entrypoints";
/// Default interpreter used to launch stage scripts.
pub const DEFAULT_INTERPRETER: &str = "bash";

/// Abstraction for stage execution, enabling test doubles.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Run `stage` with positional `args`.
    ///
    /// Returns captured output on a zero exit status. Anything else is an
    /// error and must stop the run.
    async fn run(&self, stage: &str, args: &[String]) -> Result<StageOutput>;
}

/// Where and how stage executables are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    /// Directory containing the stage executables.
    pub stages_dir: PathBuf,
    /// Program used to launch a stage. `None` executes the stage file directly.
    pub interpreter: Option<String>,
    /// Per-stage wall-clock budget. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            stages_dir: PathBuf::from(DEFAULT_STAGES_DIR),
            interpreter: Some(DEFAULT_INTERPRETER.to_string()),
            timeout: None,
        }
    }
}

/// Runner that spawns each stage as a child process.
///
/// On unix each stage leads its own process group. If the run future is
/// dropped (timeout or cancellation) the whole group is killed, including
/// anything the stage script started.
#[derive(Debug, Clone, Default)]
pub struct ProcessStageRunner {
    settings: StageSettings,
}

impl ProcessStageRunner {
    /// Create a runner from settings.
    pub fn new(settings: StageSettings) -> Self {
        Self { settings }
    }

    /// Active settings.
    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    fn command_line(&self, stage: &str, args: &[String]) -> Vec<String> {
        let script = self.settings.stages_dir.join(stage).display().to_string();
        self.settings
            .interpreter
            .iter()
            .cloned()
            .chain(std::iter::once(script))
            .chain(args.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl StageRunner for ProcessStageRunner {
    async fn run(&self, stage: &str, args: &[String]) -> Result<StageOutput> {
        let argv = self.command_line(stage, args);
        info!("Running: {}", argv.join(" "));

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| HolonError::StageSpawn {
            stage: stage.to_string(),
            source,
        })?;
        let mut group = ProcessGroupGuard::new(child.id());

        let waited = match self.settings.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| HolonError::StageTimedOut {
                    stage: stage.to_string(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| {
            HolonError::io(format!("failed to collect output of stage {stage}"), None, e)
        })?;
        group.disarm();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(HolonError::StageFailed {
                stage: stage.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        if !stdout.trim().is_empty() {
            debug!(stage, stdout = %stdout.trim_end(), "stage wrote to stdout");
        }
        if !stderr.trim().is_empty() {
            debug!(stage, stderr = %stderr.trim_end(), "stage wrote to stderr");
        }

        Ok(StageOutput { stdout, stderr })
    }
}

/// Kills a stage's process group when dropped while still armed.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// The stage finished on its own; leave the group alone.
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            let Ok(pgid) = libc::pid_t::try_from(pgid) else {
                return;
            };
            // SAFETY: killpg only sends a signal; the group was created for
            // this stage by `process_group(0)`.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
                debug!(pgid, "killed stage process group");
                return;
            }
            let err = std::io::Error::last_os_error();
            // ESRCH: every member already exited.
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pgid, error = %err, "failed to kill stage process group");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sh_runner(dir: &std::path::Path, timeout: Option<Duration>) -> ProcessStageRunner {
        ProcessStageRunner::new(StageSettings {
            stages_dir: dir.to_path_buf(),
            interpreter: Some("sh".to_string()),
            timeout,
        })
    }

    #[test]
    fn command_line_puts_interpreter_first() {
        let runner = ProcessStageRunner::default();
        let argv = runner.command_line("planner.sh", &["ledger".to_string(), "i1".to_string()]);
        assert_eq!(argv[0], "bash");
        assert!(argv[1].ends_with("planner.sh"));
        assert_eq!(&argv[2..], ["ledger", "i1"]);

        let direct = ProcessStageRunner::new(StageSettings {
            interpreter: None,
            ..StageSettings::default()
        });
        assert!(direct.command_line("executor.sh", &[])[0].ends_with("executor.sh"));
    }

    #[tokio::test]
    async fn captures_stdout_and_passes_args_positionally() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("echo.sh"), "echo \"$1|$2\"\n").expect("write");

        let output = sh_runner(dir.path(), None)
            .run("echo.sh", &["first arg".to_string(), "second".to_string()])
            .await
            .expect("stage succeeds");
        assert_eq!(output.stdout, "first arg|second\n");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("fail.sh"), "echo 'planner exploded' >&2\nexit 1\n")
            .expect("write");

        let err = sh_runner(dir.path(), None)
            .run("fail.sh", &[])
            .await
            .expect_err("stage fails");
        match err {
            HolonError::StageFailed { stage, stderr, .. } => {
                assert_eq!(stage, "fail.sh");
                assert_eq!(stderr, "planner exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_interpreter_is_spawn_error() {
        let dir = tempdir().expect("tempdir");
        let runner = ProcessStageRunner::new(StageSettings {
            stages_dir: dir.path().to_path_buf(),
            interpreter: Some(dir.path().join("no-such-shell").display().to_string()),
            timeout: None,
        });

        let err = runner.run("any.sh", &[]).await.expect_err("spawn fails");
        assert!(matches!(err, HolonError::StageSpawn { .. }));
    }

    #[tokio::test]
    async fn hung_stage_times_out() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("hang.sh"), "sleep 30\n").expect("write");

        let err = sh_runner(dir.path(), Some(Duration::from_millis(100)))
            .run("hang.sh", &[])
            .await
            .expect_err("times out");
        assert!(matches!(err, HolonError::StageTimedOut { .. }));
    }
}
