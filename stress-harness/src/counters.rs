// stress-harness/src/counters.rs
// Per-pid counter series, tree totals, moving averages and summary
// statistics

use crate::process_tree::TOTALS_PID;
use crate::sample_source::CounterSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window used for both simple and exponential moving averages
pub const MOVING_AVERAGE_WINDOW: usize = 4;

/// A pid's accumulated time-ordered counter history. All value vectors
/// grow together, exactly once per sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub pid: i32,
    pub parent_pid: i32,
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub ctime: Vec<f64>,
    pub elapsed: Vec<f64>,
    pub timestamp: Vec<i64>,
}

impl Series {
    pub fn new(pid: i32, parent_pid: i32) -> Self {
        Self {
            pid,
            parent_pid,
            cpu: Vec::new(),
            memory: Vec::new(),
            ctime: Vec::new(),
            elapsed: Vec::new(),
            timestamp: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    fn push_sample(&mut self, sample: &CounterSample) {
        self.cpu.push(sample.cpu_percent);
        self.memory.push(sample.memory_bytes as f64);
        self.ctime.push(sample.cumulative_time_ms.unwrap_or(0) as f64);
        self.elapsed.push(sample.elapsed_ms as f64);
        self.timestamp.push(sample.timestamp_ms);
    }
}

/// Percentile/mean summary over the Totals memory series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStatistics {
    pub elapsed_time_ms: f64,
    pub metric_value: f64,
    pub iterations: Vec<f64>,
    pub p95: f64,
    pub p90: f64,
    pub p50: f64,
    pub mean: f64,
    pub primary_metric: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_metric: Option<String>,
}

/// Mutable aggregation state owned by one CounterSampler for its
/// lifetime: raw per-pid series plus the derived maps computed at stop
/// time. Cleared only by an explicit reset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CounterStore {
    pub collection: BTreeMap<i32, Series>,
    pub sma_over4: BTreeMap<i32, Series>,
    pub ema_over4: BTreeMap<i32, Series>,
    pub statistics: Option<ComputedStatistics>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's samples in. Series and fields are created lazily
    /// on first appearance; every sample appends exactly one element per
    /// field. Callers hold the store lock for the whole tick so readers
    /// never observe a partial fold.
    pub fn record_tick(&mut self, samples: &[CounterSample]) {
        for sample in samples {
            self.collection
                .entry(sample.pid)
                .or_insert_with(|| Series::new(sample.pid, sample.parent_pid))
                .push_sample(sample);
        }
    }

    /// Sum cpu/memory/ctime across every tracked real process, indexed by
    /// the real root pid's recorded timestamps. A process with no data at
    /// some index (appeared late, exited early) contributes 0 there. The
    /// result is stored under the Totals pseudo-pid.
    pub fn compute_totals(&mut self, root_pid: i32) {
        let mut totals = Series::new(TOTALS_PID, TOTALS_PID);
        let len = self.collection.get(&root_pid).map(Series::len).unwrap_or(0);

        for idx in 0..len {
            let mut cpu = 0.0;
            let mut memory = 0.0;
            let mut ctime = 0.0;
            for (pid, series) in &self.collection {
                if *pid <= 0 {
                    continue; // pseudo-rows never feed the totals
                }
                cpu += series.cpu.get(idx).copied().unwrap_or(0.0);
                memory += series.memory.get(idx).copied().unwrap_or(0.0);
                ctime += series.ctime.get(idx).copied().unwrap_or(0.0);
            }
            let root = &self.collection[&root_pid];
            totals.cpu.push(cpu);
            totals.memory.push(memory);
            totals.ctime.push(ctime);
            totals.elapsed.push(root.elapsed[idx]);
            totals.timestamp.push(root.timestamp[idx]);
        }

        self.collection.insert(TOTALS_PID, totals);
    }

    /// Derive the 4-period SMA/EMA maps for every series in the
    /// collection, Totals and WholeComputer included. The first
    /// window-1 positions have no defined average and are dropped from
    /// the value fields and from elapsed/timestamp alike, keeping
    /// indices aligned.
    pub fn compute_moving_averages(&mut self) {
        let mut sma = BTreeMap::new();
        let mut ema = BTreeMap::new();
        for (pid, series) in &self.collection {
            sma.insert(*pid, derived_series(series, simple_moving_average));
            ema.insert(*pid, derived_series(series, exponential_moving_average));
        }
        self.sma_over4 = sma;
        self.ema_over4 = ema;
    }

    /// Percentile/mean summary over the Totals memory series. None when
    /// no totals were recorded.
    pub fn compute_statistics(&mut self) {
        let totals = match self.collection.get(&TOTALS_PID) {
            Some(series) if !series.is_empty() => series,
            _ => {
                self.statistics = None;
                return;
            }
        };

        let memory = totals.memory.clone();
        let elapsed_time_ms = totals.elapsed.last().copied().unwrap_or(0.0);
        let mean = memory.iter().sum::<f64>() / memory.len() as f64;
        let p95 = percentile(&memory, 95.0);
        let p90 = percentile(&memory, 90.0);
        let p50 = percentile(&memory, 50.0);

        self.statistics = Some(ComputedStatistics {
            elapsed_time_ms,
            metric_value: mean,
            iterations: memory,
            p95,
            p90,
            p50,
            mean,
            primary_metric: "memory_bytes".to_string(),
            secondary_metric: None,
        });
    }

    pub fn reset(&mut self) {
        self.collection.clear();
        self.sma_over4.clear();
        self.ema_over4.clear();
        self.statistics = None;
    }
}

fn derived_series(series: &Series, average: fn(&[f64], usize) -> Vec<f64>) -> Series {
    let drop = MOVING_AVERAGE_WINDOW - 1;
    Series {
        pid: series.pid,
        parent_pid: series.parent_pid,
        cpu: average(&series.cpu, MOVING_AVERAGE_WINDOW),
        memory: average(&series.memory, MOVING_AVERAGE_WINDOW),
        ctime: average(&series.ctime, MOVING_AVERAGE_WINDOW),
        elapsed: series.elapsed.iter().skip(drop).copied().collect(),
        timestamp: series.timestamp.iter().skip(drop).copied().collect(),
    }
}

fn simple_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Seeded with the mean of the first window, then
/// ema = alpha * x + (1 - alpha) * prev with alpha = 2 / (window + 1).
fn exponential_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < window {
        return Vec::new();
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - window + 1);
    out.push(values[..window].iter().sum::<f64>() / window as f64);
    for &value in &values[window..] {
        let prev = out[out.len() - 1];
        out.push(alpha * value + (1.0 - alpha) * prev);
    }
    out
}

/// Nearest-rank percentile; 0.0 for an empty series
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil().max(1.0) as usize;
    sorted[rank.min(sorted.len()) - 1]
}
