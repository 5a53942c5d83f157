use std::{io::Write, sync::Arc};

use anyhow::{Context, bail};
use tracing::{info, warn};

use jmaas_core::{Orchestrator, OrchestratorConfig, RunnerRouter, Subscribe};
use jmaas_exec::{JMeterProvider, ProcRunner};
use jmaas_model::{JobKey, JobSpec, MODE_CONCURRENCY};
use jmaas_observe::{Journal, LoggerConfig, logger_init};
use jmaas_prometheus::{Encoder, PrometheusMetrics, TextEncoder};

const USAGE: &str = "usage: jmaas-agentd [--metrics] <host> [mode] [key]";

struct Args {
    host: String,
    mode: String,
    key: JobKey,
    metrics: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut metrics = false;
    let mut positional = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--metrics" => metrics = true,
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(host) = positional.next() else {
        bail!(USAGE);
    };
    let mode = positional
        .next()
        .unwrap_or_else(|| MODE_CONCURRENCY.to_string());
    let key = positional.next().map(JobKey::new).unwrap_or_else(JobKey::generate);

    Ok(Args {
        host,
        mode,
        key,
        metrics,
    })
}

fn jmeter() -> JMeterProvider {
    let mut provider = JMeterProvider::new();
    if let Ok(bin) = std::env::var("JMAAS_JMETER_BIN") {
        provider = provider.with_program(bin);
    }
    if let Ok(dir) = std::env::var("JMAAS_PLANS_DIR") {
        provider = provider.with_plans_dir(dir);
    }
    provider
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let log_cfg = LoggerConfig::from_env()?;
    logger_init(&log_cfg)?;

    let args = parse_args()?;

    // 2) Router + runners
    let router = RunnerRouter::new().with_runner(Arc::new(ProcRunner::new(jmeter())));

    // 3) Orchestrator
    let metrics = Arc::new(PrometheusMetrics::new().context("metrics registry")?);
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Journal::new()), metrics.clone()];
    let config = OrchestratorConfig::from_env()?;
    let orchestrator = Orchestrator::new(config, router, subscribers)?;

    // 4) Submit; samples go to stdout for the whole run
    let spec = JobSpec::new(args.host, args.mode);
    let handle = orchestrator.submit(args.key.clone(), spec, jmaas_core::stdout())?;
    info!(key = %args.key, "job submitted; press Ctrl+C to stop waiting");

    // 5) Wait for the run, or stop waiting on Ctrl+C
    let outcome = tokio::select! {
        outcome = handle.wait() => Some(outcome),
        _ = tokio::signal::ctrl_c() => {
            warn!(key = %args.key, "interrupted; the job keeps running until it terminates");
            None
        }
    };

    orchestrator.shutdown().await;

    if args.metrics {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&metrics.gather(), &mut buf)?;
        std::io::stderr().write_all(&buf)?;
    }

    match outcome.or_else(|| handle.outcome()) {
        Some(Ok(done)) => {
            info!(key = %args.key, elapsed_ms = done.elapsed.as_millis() as u64, "job succeeded");
            Ok(())
        }
        Some(Err(failure)) => Err(failure).with_context(|| format!("job {} failed", args.key)),
        None => bail!("job {} finished without a result", args.key),
    }
}
