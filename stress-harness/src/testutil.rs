// stress-harness/src/testutil.rs
// Mock snapshot/sample sources and recording sinks shared across tests

use crate::artifacts::{ArtifactSink, ChartSink, ChartSpec};
use crate::error::{HarnessError, Result};
use crate::process_tree::{ProcessInfo, ProcessSnapshotProvider, WHOLE_COMPUTER_PID};
use crate::sample_source::{CounterSample, SampleSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Fixed synthetic process snapshot
pub(crate) struct MockSnapshotProvider {
    snapshot: Vec<ProcessInfo>,
}

impl MockSnapshotProvider {
    pub(crate) fn new(snapshot: Vec<ProcessInfo>) -> Self {
        Self { snapshot }
    }

    /// A root (pid 100) with two descendants, hanging off init
    pub(crate) fn family_of_three() -> Self {
        Self::new(vec![
            ProcessInfo::new(1, 0, "init"),
            ProcessInfo::new(100, 1, "suite-root"),
            ProcessInfo::new(200, 100, "worker"),
            ProcessInfo::new(300, 200, "helper"),
        ])
    }
}

#[async_trait]
impl ProcessSnapshotProvider for MockSnapshotProvider {
    async fn snapshot(&mut self) -> Result<Vec<ProcessInfo>> {
        Ok(self.snapshot.clone())
    }
}

/// Deterministic sample source. `sample_machine` is called first on every
/// tick (the sampler's tick order), so the per-tick counter is bumped
/// there and reused by `sample`.
pub(crate) struct MockSampleSource {
    tick: u64,
    fail_every: Option<u64>,
}

impl MockSampleSource {
    pub(crate) fn new() -> Self {
        Self {
            tick: 0,
            fail_every: None,
        }
    }

    /// Fails every n-th tick, starting with the n-th
    pub(crate) fn failing_every(n: u64) -> Self {
        Self {
            tick: 0,
            fail_every: Some(n),
        }
    }

    fn sample_for(&self, pid: i32) -> CounterSample {
        CounterSample {
            pid,
            parent_pid: 1,
            cpu_percent: self.tick as f64,
            memory_bytes: pid as u64 * 10 + self.tick,
            cumulative_time_ms: Some(self.tick * 5),
            elapsed_ms: self.tick * 100,
            timestamp_ms: self.tick as i64 * 1000,
        }
    }
}

#[async_trait]
impl SampleSource for MockSampleSource {
    async fn sample(&mut self, pids: &[i32]) -> Result<Vec<CounterSample>> {
        Ok(pids
            .iter()
            .filter(|pid| **pid > 0)
            .map(|pid| self.sample_for(*pid))
            .collect())
    }

    async fn sample_machine(&mut self) -> Result<CounterSample> {
        self.tick += 1;
        if let Some(n) = self.fail_every {
            if self.tick % n == 0 {
                return Err(HarnessError::Sampling(format!(
                    "synthetic failure on tick {}",
                    self.tick
                )));
            }
        }
        Ok(CounterSample {
            cumulative_time_ms: None,
            ..self.sample_for(WHOLE_COMPUTER_PID)
        })
    }
}

/// In-memory artifact sink recording every write by name
#[derive(Default)]
pub(crate) struct MemorySink {
    writes: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl MemorySink {
    pub(crate) fn names(&self) -> Vec<String> {
        self.writes.lock().keys().cloned().collect()
    }

    pub(crate) fn get(&self, name: &str) -> Option<serde_json::Value> {
        self.writes.lock().get(name).cloned()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        self.writes.lock().insert(name.to_string(), value.clone());
        Ok(())
    }
}

/// Chart sink recording every request
#[derive(Default)]
pub(crate) struct RecordingChartSink {
    specs: Mutex<Vec<ChartSpec>>,
}

impl RecordingChartSink {
    pub(crate) fn specs(&self) -> Vec<ChartSpec> {
        self.specs.lock().clone()
    }
}

#[async_trait]
impl ChartSink for RecordingChartSink {
    async fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        self.specs.lock().push(spec.clone());
        Ok(Vec::new())
    }
}
