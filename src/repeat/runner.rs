//! Sequential and concurrent execution of a command template.

use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::accounts::address_of;
use crate::blockchain::{BlockTag, BlockchainResult, RpcClient};
use crate::config::RpcConfig;
use crate::lifecycle::Shutdown;
use crate::repeat::template::{display_args, CommandTemplate, NonceSource};
use crate::repeat::RepeatResult;
use crate::resilience::is_nonce_collision;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub times: usize,
    /// Pause between sequential runs, and between concurrent starts.
    pub delay: Duration,
    /// Upper bound on runs in flight in concurrent mode.
    pub concurrent: usize,
    /// Continue after a failed sequential run without asking.
    pub keep_going: bool,
    /// Attempts per concurrent run when the failure is a nonce collision.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            times: 1,
            delay: Duration::from_secs(1),
            concurrent: 3,
            keep_going: false,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Cancelled,
}

/// Looks up the pending nonce that fills `{REPLACE}`.
#[derive(Debug, Clone)]
pub struct NonceFetcher {
    client: RpcClient,
    address: Address,
}

impl NonceFetcher {
    pub fn new(source: &NonceSource, timeout_secs: u64) -> RepeatResult<Self> {
        let address = address_of(&source.private_key)?;
        let client = RpcClient::connect(RpcConfig {
            url: source.rpc_url.clone(),
            timeout_secs,
            ..Default::default()
        })?;
        Ok(Self { client, address })
    }

    pub async fn pending(&self) -> BlockchainResult<u64> {
        self.client.nonce(self.address, BlockTag::Pending).await
    }
}

async fn render(
    template: &CommandTemplate,
    fetcher: Option<&NonceFetcher>,
    execution: usize,
) -> RepeatResult<Vec<String>> {
    let nonce = match fetcher {
        Some(fetcher) => {
            let nonce = fetcher.pending().await?;
            tracing::info!(nonce = nonce, execution = execution, "Using nonce");
            Some(nonce)
        }
        None => None,
    };
    Ok(template.render(nonce))
}

fn command(args: &[String]) -> Command {
    let mut cmd = Command::new(&args[0]);
    cmd.args(&args[1..]).kill_on_drop(true);
    cmd
}

/// Run the template `config.times` times, one after another.
///
/// After a failed run `should_continue(execution)` decides whether to go on,
/// unless `keep_going` is set.
pub async fn run_sequential(
    template: &CommandTemplate,
    fetcher: Option<&NonceFetcher>,
    config: &RunnerConfig,
    shutdown: &Shutdown,
    should_continue: &dyn Fn(usize) -> bool,
) -> RepeatResult<RunSummary> {
    let mut summary = RunSummary::default();

    for i in 0..config.times {
        let execution = i + 1;
        if shutdown.is_triggered() {
            summary.cancelled += config.times - i;
            break;
        }

        let args = render(template, fetcher, execution).await?;
        tracing::info!(execution = execution, total = config.times, command = %display_args(&args), "Execution starting");

        let mut child = command(&args);
        let status = tokio::select! {
            status = child.status() => status,
            _ = shutdown.wait() => {
                summary.cancelled += config.times - i;
                break;
            }
        };

        match status {
            Ok(status) if status.success() => {
                tracing::info!(execution = execution, "Execution completed successfully");
                summary.succeeded += 1;
            }
            other => {
                match other {
                    Ok(status) => tracing::error!(execution = execution, status = %status, "Execution failed"),
                    Err(e) => tracing::error!(execution = execution, error = %e, "Execution failed"),
                }
                summary.failed += 1;
                if execution < config.times && !config.keep_going && !should_continue(execution) {
                    tracing::warn!("Execution stopped by user");
                    summary.cancelled += config.times - execution;
                    break;
                }
            }
        }

        if execution < config.times && !config.delay.is_zero() {
            tracing::info!(delay_ms = config.delay.as_millis() as u64, "Waiting before next execution");
            tokio::time::sleep(config.delay).await;
        }
    }

    Ok(summary)
}

/// Run the template concurrently.
///
/// Run `i` starts `i * delay` after the first, at most `config.concurrent`
/// are in flight, and runs that fail with a nonce collision are retried with
/// a fresh nonce. Triggering `shutdown` cancels everything not yet finished.
pub async fn run_concurrent(
    template: Arc<CommandTemplate>,
    fetcher: Option<Arc<NonceFetcher>>,
    config: &RunnerConfig,
    shutdown: Shutdown,
) -> RunSummary {
    let semaphore = Arc::new(Semaphore::new(config.concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for i in 0..config.times {
        let template = template.clone();
        let fetcher = fetcher.clone();
        let semaphore = semaphore.clone();
        let shutdown = shutdown.clone();
        let config = config.clone();
        let stagger = config.delay.saturating_mul(i as u32);

        tasks.spawn(async move {
            tokio::select! {
                outcome = async {
                    tokio::time::sleep(stagger).await;
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return Outcome::Cancelled,
                    };
                    execute_with_retry(&template, fetcher.as_deref(), &config, i + 1).await
                } => outcome,
                _ = shutdown.wait() => Outcome::Cancelled,
            }
        });
    }

    let mut summary = RunSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => summary.record(outcome),
            Err(e) => {
                tracing::error!(error = %e, "Execution task failed");
                summary.failed += 1;
            }
        }
    }
    summary
}

async fn execute_with_retry(
    template: &CommandTemplate,
    fetcher: Option<&NonceFetcher>,
    config: &RunnerConfig,
    execution: usize,
) -> Outcome {
    let attempts = config.max_retries.max(1);

    for attempt in 1..=attempts {
        let args = match render(template, fetcher, execution).await {
            Ok(args) => args,
            Err(e) => {
                tracing::error!(execution = execution, error = %e, "Error getting nonce");
                return Outcome::Failed;
            }
        };
        tracing::info!(
            execution = execution,
            total = config.times,
            attempt = attempt,
            max_attempts = attempts,
            command = %display_args(&args),
            "Execution starting"
        );

        let output = match capture(&args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(execution = execution, error = %e, "Error during execution");
                return Outcome::Failed;
            }
        };
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            tracing::info!(execution = execution, "Execution completed successfully");
            if !stdout.trim().is_empty() {
                println!("[execution {}] {}", execution, stdout.trim_end());
            }
            return Outcome::Succeeded;
        }

        tracing::error!(execution = execution, status = %output.status, "Execution failed");
        if !stderr.trim().is_empty() {
            eprintln!("[execution {}] {}", execution, stderr.trim_end());
        }

        let collided = is_nonce_collision(&stderr) || is_nonce_collision(&stdout);
        if collided && attempt < attempts {
            tracing::warn!(execution = execution, "Nonce error detected, retrying with updated nonce");
            tokio::time::sleep(config.retry_delay).await;
            continue;
        }
        break;
    }
    Outcome::Failed
}

async fn capture(args: &[String]) -> std::io::Result<Output> {
    command(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
}
