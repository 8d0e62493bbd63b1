use crate::computations::{self, EvenDistinctSort};
use crate::model::{DemoConfig, SortOutcome, SortReport};
use crate::offload::{InvocationState, Offload, Registry};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "offload-demo",
    version,
    about = "Sort a large array on a background execution unit while the UI stays responsive"
)]
pub struct Cli {
    /// Number of random values to sort
    #[arg(long, default_value_t = 50_000)]
    pub len: usize,

    /// Exclusive upper bound for generated values
    #[arg(long, default_value_t = 100_000)]
    pub max_value: i64,

    /// Seed for reproducible input
    #[arg(long)]
    pub seed: Option<u64>,

    /// Busy-wait iterations that simulate a long-running computation
    #[arg(long, default_value_t = 200_000_000)]
    pub spin_iterations: u64,

    /// Give up waiting for the result after this long (headless modes only)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Write logs here instead of the default cache location
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, false).await;
        }
    }

    run_headless(args.clone(), args.json).await
}

/// Build a `DemoConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> DemoConfig {
    DemoConfig {
        len: args.len,
        max_value: args.max_value,
        seed: args.seed,
        spin_iterations: args.spin_iterations,
        timeout: args.timeout.map(Duration::from),
    }
}

/// Run one offloaded sort and wait for it to settle.
pub(crate) async fn sort_once(cfg: DemoConfig) -> Result<SortReport> {
    let registry = computations::registry(&cfg);
    sort_with(registry, cfg).await
}

/// Like [`sort_once`], resolving the sort against `registry`.
async fn sort_with(registry: Registry, cfg: DemoConfig) -> Result<SortReport> {
    let input = computations::generate_input(cfg.len, cfg.max_value, cfg.seed);
    let input_len = input.len();
    let mut offload = Offload::<EvenDistinctSort>::new(registry);

    let started = Instant::now();
    offload
        .trigger(input)
        .context("failed to start background sort")?;

    let state = match cfg.timeout {
        Some(limit) => tokio::time::timeout(limit, offload.settle())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "background sort timed out after {}",
                    humantime::format_duration(limit)
                )
            })?,
        None => offload.settle().await,
    };
    let outcome = match state {
        InvocationState::Completed(values) => SortOutcome::completed(values.clone()),
        InvocationState::Failed(error) => SortOutcome::Failed {
            error: error.clone(),
        },
        other => return Err(anyhow::anyhow!("background sort did not settle: {other:?}")),
    };
    let elapsed = started.elapsed();
    let computation = offload.descriptor().to_string();
    offload.close();

    Ok(SortReport {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        computation,
        config: cfg,
        input_len,
        elapsed,
        outcome,
    })
}

async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let cfg = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();

    if !json {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Sorting {} numbers in the background…",
            cfg.len
        )));
    }
    let report = sort_once(cfg).await?;

    if json {
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(&report);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    match report.outcome {
        SortOutcome::Completed { .. } => Ok(()),
        SortOutcome::Failed { error } => Err(anyhow::anyhow!("background sort failed: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::{ComputeError, Computation};

    fn config(len: usize) -> DemoConfig {
        DemoConfig {
            len,
            max_value: 1_000,
            seed: Some(42),
            spin_iterations: 0,
            timeout: Some(Duration::from_secs(10)),
        }
    }

    #[test]
    fn parses_defaults() {
        let args = Cli::parse_from(["offload-demo"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.len, 50_000);
        assert_eq!(cfg.max_value, 100_000);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.timeout, None);
        assert!(!args.json && !args.text);
    }

    #[test]
    fn parses_humantime_timeout() {
        let args = Cli::parse_from([
            "offload-demo",
            "--text",
            "--timeout",
            "1m 30s",
            "--seed",
            "3",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(90)));
        assert_eq!(cfg.seed, Some(3));
        assert!(args.text);
    }

    #[tokio::test]
    async fn json_and_text_are_exclusive() {
        let args = Cli::parse_from(["offload-demo", "--json", "--text"]);
        assert!(run(args).await.is_err());
    }

    #[tokio::test]
    async fn sort_once_reports_even_distinct_values() {
        let report = sort_once(config(2_000)).await.expect("report");
        assert_eq!(report.input_len, 2_000);
        assert_eq!(report.computation, "even-distinct-sort");

        let SortOutcome::Completed { values, stats } = report.outcome else {
            panic!("expected completion");
        };
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values.iter().all(|v| v % 2 == 0));
        assert_eq!(stats.map(|s| s.count), Some(values.len()));
    }

    /// Registered under the real sort's name; sleeps so the unit thread finishes on its own.
    struct SleepySort;

    impl Computation for SleepySort {
        const NAME: &'static str = EvenDistinctSort::NAME;
        type Input = Vec<i64>;
        type Output = Vec<i64>;

        fn compute(&self, input: Vec<i64>) -> Result<Vec<i64>, ComputeError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(input)
        }
    }

    #[tokio::test]
    async fn sort_once_honours_timeout() {
        let cfg = DemoConfig {
            timeout: Some(Duration::from_millis(50)),
            ..config(10)
        };
        let registry = Registry::builder().register(SleepySort).build();
        let err = sort_with(registry, cfg).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
