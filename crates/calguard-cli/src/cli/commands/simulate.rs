//! `calguard simulate` – drive an in-memory provider through the invoker.

use anyhow::{Context, Result};
use calguard_core::calendar::{CalendarEvent, InMemoryProvider, Invoker, ProviderFactory};
use calguard_core::config::CalguardConfig;
use calguard_core::messages::user_message;
use calguard_core::perf::PerformanceReport;
use calguard_core::{CalendarError, FailureKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const CALENDAR_KEY: &str = "calendar:primary";

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub operations: usize,
    pub failure_rate: f64,
    pub kind: FailureKind,
    pub latency_ms: u64,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FailureSummary {
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SimulationReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Operations not sent upstream because no event existed to target.
    pub skipped: usize,
    pub failures: BTreeMap<FailureKind, FailureSummary>,
    pub performance: PerformanceReport,
    pub pool_max_size: usize,
    pub pool_keys: Vec<String>,
}

fn sample_event(n: usize) -> CalendarEvent {
    let hour = 8 + n % 10;
    CalendarEvent::new(
        format!("Synthetic meeting {n}"),
        format!("2024-06-01T{hour:02}:00:00"),
        format!("2024-06-01T{hour:02}:30:00"),
    )
}

/// Run the workload synchronously. Operations rotate through
/// create, get, update, list and delete on the events created so far;
/// update and delete are skipped while no event exists.
pub(crate) fn simulate(cfg: &CalguardConfig, opts: &SimulateOptions) -> SimulationReport {
    let mut cfg = cfg.clone();
    if let Some(ms) = opts.retry_delay_ms {
        cfg.retry.initial_delay_secs = ms as f64 / 1000.0;
    }

    let provider = Arc::new(
        InMemoryProvider::new()
            .with_latency(Duration::from_millis(opts.latency_ms))
            .with_random_failures(opts.failure_rate, opts.kind),
    );
    let factory: ProviderFactory<InMemoryProvider> = {
        let provider = Arc::clone(&provider);
        Arc::new(move || Ok(Arc::clone(&provider)))
    };
    let invoker = Invoker::from_config(CALENDAR_KEY, factory, &cfg);

    let mut ids: Vec<String> = Vec::new();
    let mut succeeded = 0;
    let mut skipped = 0;
    let mut errors: Vec<CalendarError> = Vec::new();
    for n in 0..opts.operations {
        let outcome = match n % 5 {
            0 => Some(invoker.create_event(&sample_event(n)).map(|ev| {
                if let Some(id) = ev.id {
                    ids.push(id);
                }
            })),
            1 => Some(match ids.last() {
                Some(id) => invoker.get_event(id).map(|_| ()),
                None => invoker.get_event("evt-unknown").map(|_| ()),
            }),
            2 => ids
                .last()
                .map(|id| invoker.update_event(id, &sample_event(n)).map(|_| ())),
            3 => Some(
                invoker
                    .list_events("2024-06-01T00:00:00", "2024-06-02T00:00:00")
                    .map(|_| ()),
            ),
            _ => ids.first().cloned().map(|id| {
                invoker.delete_event(&id).map(|()| {
                    ids.retain(|known| known != &id);
                })
            }),
        };
        match outcome {
            None => skipped += 1,
            Some(Ok(())) => succeeded += 1,
            Some(Err(err)) => {
                tracing::debug!(op = n, error = %err, "simulated operation failed");
                errors.push(err);
            }
        }
    }

    let mut failures: BTreeMap<FailureKind, FailureSummary> = BTreeMap::new();
    for err in &errors {
        failures
            .entry(err.kind)
            .or_insert_with(|| FailureSummary {
                count: 0,
                message: user_message(err, cfg.locale),
            })
            .count += 1;
    }

    let pool = invoker.pool().stats();
    SimulationReport {
        succeeded,
        failed: errors.len(),
        skipped,
        failures,
        performance: invoker.performance_report(),
        pool_max_size: pool.max_size,
        pool_keys: pool.keys,
    }
}

fn print_report(report: &SimulationReport) {
    println!(
        "  {:<14}  {:>6}  {:>9}  {:>9}  {:>9}  {:>8}",
        "Operation", "Calls", "Avg(ms)", "Min(ms)", "Max(ms)", "Success"
    );
    println!(
        "  {}  {}  {}  {}  {}  {}",
        "--------------", "------", "---------", "---------", "---------", "--------"
    );
    for (name, s) in &report.performance.stats {
        println!(
            "  {:<14}  {:>6}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7.1}%",
            name,
            s.call_count,
            s.avg.as_secs_f64() * 1000.0,
            s.min.as_secs_f64() * 1000.0,
            s.max.as_secs_f64() * 1000.0,
            s.success_rate * 100.0
        );
    }
    println!();
    println!(
        "Operations: {} succeeded, {} failed after retries, {} skipped",
        report.succeeded, report.failed, report.skipped
    );
    for (kind, summary) in &report.failures {
        println!("  {kind}: {} ({})", summary.count, summary.message);
    }
    println!(
        "Pool: {}/{} [{}]",
        report.pool_keys.len(),
        report.pool_max_size,
        report.pool_keys.join(", ")
    );
    for warning in &report.performance.warnings {
        println!("warning: {warning}");
    }
    for suggestion in &report.performance.suggestions {
        println!("suggestion: {suggestion}");
    }
}

pub async fn run_simulate(cfg: &CalguardConfig, opts: SimulateOptions, json: bool) -> Result<()> {
    if !(0.0..=1.0).contains(&opts.failure_rate) {
        anyhow::bail!("--failure-rate must be between 0 and 1, got {}", opts.failure_rate);
    }
    tracing::info!(
        operations = opts.operations,
        failure_rate = opts.failure_rate,
        kind = %opts.kind,
        "starting simulation"
    );
    let report = tokio::task::spawn_blocking({
        let cfg = cfg.clone();
        move || simulate(&cfg, &opts)
    })
    .await
    .context("simulation task join")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
