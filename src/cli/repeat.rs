//! `chainops repeat`

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::cli::{confirmer, Context};
use crate::error::Result;
use crate::lifecycle::signals::spawn_ctrl_c_listener;
use crate::lifecycle::Shutdown;
use crate::repeat::{run_concurrent, run_sequential, CommandTemplate, NonceFetcher, RunnerConfig};

#[derive(Debug, Args)]
pub struct RepeatArgs {
    /// Command line to run; `{REPLACE}` becomes the pending nonce
    pub command: String,

    /// Number of runs
    #[arg(short, long, default_value_t = 1)]
    pub times: usize,

    /// Seconds between runs (or between concurrent starts)
    #[arg(short, long, default_value = "1.0", value_parser = parse_seconds)]
    pub delay: Duration,

    /// Run concurrently instead of one after another
    #[arg(long, visible_alias = "async")]
    pub concurrent_mode: bool,

    /// Runs in flight in concurrent mode
    #[arg(short, long, default_value_t = 3)]
    pub concurrent: usize,

    /// Do not ask whether to continue after a failed run
    #[arg(long)]
    pub keep_going: bool,
}

fn parse_seconds(value: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid delay '{}': {}", value, e))
}

pub async fn run(args: RepeatArgs, ctx: &Context) -> Result<()> {
    let template = CommandTemplate::parse(&args.command)?;
    let fetcher = template
        .nonce_source()
        .map(|source| NonceFetcher::new(source, ctx.config.rpc.timeout_secs))
        .transpose()?;

    let config = RunnerConfig {
        times: args.times,
        delay: args.delay,
        concurrent: args.concurrent,
        keep_going: args.keep_going,
        max_retries: ctx.config.transactions.max_retries,
        retry_delay: Duration::from_secs(ctx.config.transactions.retry_delay_secs),
    };

    let shutdown = Shutdown::new();
    let listener = spawn_ctrl_c_listener(shutdown.clone());

    let summary = if args.concurrent_mode {
        run_concurrent(
            Arc::new(template),
            fetcher.map(Arc::new),
            &config,
            shutdown.clone(),
        )
        .await
    } else {
        let confirm = confirmer(false);
        let should_continue =
            move |execution: usize| confirm(&format!("Execution {} failed. Continue?", execution));
        run_sequential(
            &template,
            fetcher.as_ref(),
            &config,
            &shutdown,
            &should_continue,
        )
        .await?
    };
    listener.abort();

    println!(
        "\nCompleted: {} succeeded, {} failed, {} cancelled",
        summary.succeeded, summary.failed, summary.cancelled
    );
    Ok(())
}
