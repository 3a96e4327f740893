//! A small data pipeline showing the library end to end.
//!
//! Runs the abort, timeout, retry and interval examples around a chunked
//! transform of fifty numbers. Set `LOG_LEVEL` and `LOG_FORMAT` to change the
//! output.

use anyhow::{bail, Context};
use asynckit::prelude::*;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, info};

const CHUNK_SIZE: usize = 10;
const WORK_DELAY: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;

    if let Err(err) = run().await {
        error!(error = %err, "Data pipeline failed");
        return Err(err);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let fake_data: Vec<u32> = (1..=50).collect();

    let timeout_run = tokio::spawn(timeout_example());
    let loop_signal = interval_loop_example();

    let retry = with_retry(flaky_lookup, RetryConfig::new().with_timeout_ms(2000))?;
    match safe_wrap(retry.call(42)).await {
        SafeResult::Success(value) => info!(value, "Retry example finished"),
        SafeResult::Failure(err) => error!(error = %err, "Retry example failed"),
    }

    info!(chunk_size = CHUNK_SIZE, "Starting transform into do_math");
    let mut equation_result = Vec::with_capacity(fake_data.len());
    let results = chunk_each_stream(&fake_data, CHUNK_SIZE, |n| do_math(*n))?;
    let mut steps = std::pin::pin!(enumerate_async(results));
    while let Some(Step { step, value }) = steps.next().await {
        match value {
            SafeResult::Success(value) => equation_result.push(value),
            SafeResult::Failure(err) => error!(error = %err, "do_math failed"),
        }
        info!(step, total = fake_data.len(), "Step completed");
    }

    info!("Finished do_math, starting post-processing");
    let summed: BoxFuture<'_, anyhow::Result<serde_json::Value>> =
        async { Ok::<_, anyhow::Error>(serde_json::to_value(apply_sum(&equation_result).await?)?) }.boxed();
    let formatted: BoxFuture<'_, anyhow::Result<serde_json::Value>> =
        async { Ok::<_, anyhow::Error>(serde_json::to_value(apply_format(&equation_result).await?)?) }.boxed();
    let results = named_join_unwrap([("summed", summed), ("formatted", formatted)])
        .await
        .map_err(|fails| anyhow::anyhow!("post-processing failed for {:?}", fails.keys()))?;

    info!("All tasks complete");
    debug!(results = %serde_json::to_string(&results)?, "Post-processing results");

    timeout_run.await.context("timeout example panicked")?;
    abort_example().await;
    loop_signal.abort("Loop Aborted Externally");
    // Give the loop a chance to log its exit.
    tokio::task::yield_now().await;
    Ok(())
}

async fn abort_example() {
    info!("Start abort example");
    let signal = CancellationSignal::new();
    let pending = run_abortable(
        async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            2
        },
        &signal,
    );
    signal.abort_default();
    match pending.await {
        Ok(value) => info!(value, "Abort example resolved"),
        Err(reason) => info!(%reason, "Abort example rejected"),
    }
}

async fn timeout_example() {
    info!("Start timeout example");
    let outcome = run_timeout(
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            69
        },
        Duration::from_millis(500),
    )
    .await;
    match outcome {
        Ok(value) => info!(value, "Timeout example resolved"),
        Err(reason) => info!(%reason, "Timeout example rejected"),
    }
}

fn interval_loop_example() -> CancellationSignal {
    info!("Interval loop setup");
    let signal = CancellationSignal::new();
    let ticks = interval_loop(Duration::from_millis(200), Some(signal.clone()));
    tokio::spawn(async move {
        let mut steps = std::pin::pin!(enumerate_async(ticks));
        while let Some(Step { step, value }) = steps.next().await {
            if let Err(reason) = value {
                info!("Interval loop done");
                debug!(%reason, "Interval loop ended");
                break;
            }
            info!(step, "ping");
        }
    });
    signal
}

async fn flaky_lookup(num: u32) -> anyhow::Result<u32> {
    debug!("Starting retry example");
    let (wait_ms, fails) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(0..3000), rng.gen_bool(0.5))
    };
    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    if fails {
        bail!("Example post-processing error");
    }
    Ok(num)
}

async fn do_math(num: u32) -> anyhow::Result<u32> {
    tokio::time::sleep(WORK_DELAY).await;
    if num == 13 {
        bail!("Avoiding some bad luck (num = {num})");
    }
    Ok(num * 17 + 500)
}

async fn apply_sum(data: &[u32]) -> anyhow::Result<Vec<u32>> {
    info!("Starting apply_sum");
    let sums = chunk_operation_collect(data, CHUNK_SIZE, |chunk| async move {
        tokio::time::sleep(WORK_DELAY).await;
        Ok::<u32, anyhow::Error>(chunk.iter().sum())
    })
    .await?;
    info!("Finished apply_sum");
    Ok(sums.into_iter().filter_map(SafeResult::into_success).collect())
}

async fn apply_format(data: &[u32]) -> anyhow::Result<Vec<String>> {
    info!("Starting apply_format");
    let mut formatted = Vec::with_capacity(data.len());
    let mut results = std::pin::pin!(chunk_each_stream(data, CHUNK_SIZE, |n| pretty_number(*n))?);
    while let Some(result) = results.next().await {
        match result {
            SafeResult::Success(value) => formatted.push(value),
            SafeResult::Failure(err) => error!(error = %err, "apply_format failed"),
        }
    }
    info!("Finished apply_format");
    Ok(formatted)
}

async fn pretty_number(num: u32) -> anyhow::Result<String> {
    tokio::time::sleep(WORK_DELAY / 3).await;
    let reversed: Vec<char> = num.to_string().chars().rev().collect();
    let groups: Vec<String> = chunk_all(&reversed, 3)?
        .into_iter()
        .map(|group| group.iter().collect())
        .collect();
    Ok(groups.join(",").chars().rev().collect())
}
