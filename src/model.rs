use crate::offload::WorkerError;
use crate::stats::OutputStats;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub len: usize,
    pub max_value: i64,
    #[serde(default)]
    pub seed: Option<u64>,
    pub spin_iterations: u64,
    /// Headless wait limit. The helper itself never times out.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SortOutcome {
    Completed {
        values: Vec<i64>,
        stats: Option<OutputStats>,
    },
    Failed {
        error: WorkerError,
    },
}

impl SortOutcome {
    pub fn completed(values: Vec<i64>) -> Self {
        let stats = crate::stats::summarize(&values);
        SortOutcome::Completed { values, stats }
    }
}

/// One headless run, as printed by `--json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortReport {
    #[serde(default)]
    pub timestamp_utc: String,
    pub computation: String,
    pub config: DemoConfig,
    pub input_len: usize,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub outcome: SortOutcome,
}
