use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use anyhow::Context;
use tracing::{info, trace, warn};

use cadence_core::{PollConfigBuilder, ShouldContinue, TaskError, Ticker, Work, poll};
use cadence_model::{PollSpec, StrategyKind};
use cadence_observe::{LoggerConfig, LoggerLevel, init_logger, progress::log_progress};

/// Usage: `cadence-demo ['{"strategy":"linear-backoff","retries":4,"params":{"start":100}}']`
#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) logger
    let cfg = LoggerConfig {
        level: LoggerLevel::new("info,cadence_core=debug")?,
        ..Default::default()
    };
    init_logger(&cfg)?;
    info!("logger initialized");

    // 2) one-shot poll of a flaky operation
    let spec = load_spec()?;
    let config = PollConfigBuilder::new(spec)
        .on_progress(log_progress)
        .build()?;
    info!(%config, "polling flaky operation");

    match poll(flaky(2), config).await {
        Ok(value) => info!(value, "flaky operation recovered"),
        Err(e) => warn!(error = %e, failures = e.failures().len(), "flaky operation gave up"),
    }

    // 3) lifecycle: start, pause, resume, cancel
    let config = PollConfigBuilder::new(PollSpec::default())
        .name("heartbeat")
        .strategy_kind(StrategyKind::LinearBackoff)
        .param("start", 100)
        .param("increment", 50)
        .retries(10)
        .continue_policy(ShouldContinue::on_error())
        .on_progress(log_progress)
        .build()?;

    let work = flaky(u32::MAX).with_hooks(|| trace!("tick begins"), || trace!("tick ends"));
    let ticker = Ticker::new(work, config);
    let handle = ticker.start()?;

    tokio::time::sleep(Duration::from_millis(300)).await;
    ticker.pause();
    info!(paused = ticker.is_paused(), "heartbeat paused");

    tokio::time::sleep(Duration::from_millis(500)).await;
    ticker.resume();
    info!("heartbeat resumed");

    tokio::time::sleep(Duration::from_millis(200)).await;
    ticker.cancel();

    match handle.await {
        Ok(value) => info!(value, "heartbeat settled"),
        Err(e) => info!(error = %e, failures = e.failures().len(), "heartbeat stopped"),
    }
    Ok(())
}

/// Spec from the first argument (inline JSON), or the defaults.
fn load_spec() -> anyhow::Result<PollSpec> {
    let Some(raw) = std::env::args().nth(1) else {
        return Ok(PollSpec {
            name: Some("flaky".into()),
            interval_ms: 200,
            timeout_ms: Some(1_000),
            master_timeout_ms: Some(5_000),
            ..Default::default()
        });
    };
    serde_json::from_str(&raw).context("parsing poll spec")
}

/// Fails `failures` times, then returns the number of the successful call.
fn flaky(failures: u32) -> Work<u32, String> {
    let calls = Arc::new(AtomicU32::new(0));
    Work::new(move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < failures {
                Err(TaskError::Fail(format!("call {n} not ready")))
            } else {
                Ok(n)
            }
        }
    })
}
