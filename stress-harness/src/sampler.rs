// stress-harness/src/sampler.rs
// Counter sampling state machine: two periodic loops (process-tree
// refresh and counter sampling) feeding one CounterStore, with derived
// computations and artifact dumps at stop time

use crate::artifacts::{ArtifactSink, ChartSink, ChartSpec, FileArtifactSink, ImageFormat, LabeledSeries, NullChartSink};
use crate::config::SamplerOptions;
use crate::counters::{ComputedStatistics, CounterStore, Series};
use crate::error::{HarnessError, Result};
use crate::process_tree::{resolve_tree, ProcessInfo, ProcessSnapshotProvider, SysinfoSnapshotProvider, TOTALS_PID, WHOLE_COMPUTER_PID};
use crate::sample_source::{SampleSource, SysinfoSampleSource};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Samples CPU/memory counters for a process tree on a fixed interval.
///
/// Lifecycle: Stopped -> start() -> Running -> stop() -> Stopped. The
/// tracked-set refresh and the sampling tick run as independent loops;
/// each awaits its tick body before polling the next tick, so at most
/// one refresh/sample is ever in flight and stop() never tears a tick.
pub struct CounterSampler {
    options: SamplerOptions,
    snapshots: Arc<Mutex<Box<dyn ProcessSnapshotProvider>>>,
    source: Arc<Mutex<Box<dyn SampleSource>>>,
    store: Arc<Mutex<CounterStore>>,
    tracked: Arc<RwLock<Vec<ProcessInfo>>>,
    artifact_sink: Arc<dyn ArtifactSink>,
    chart_sink: Arc<dyn ChartSink>,
    shutdown: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    refresh_task: Option<JoinHandle<()>>,
    sample_task: Option<JoinHandle<()>>,
}

impl CounterSampler {
    /// Sampler against the live system, dumping JSON under the configured
    /// output directory
    pub fn new(options: SamplerOptions) -> Self {
        let artifact_sink = Arc::new(FileArtifactSink::new(options.output_directory.clone()));
        Self::with_parts(
            options,
            Box::new(SysinfoSnapshotProvider::new()),
            Box::new(SysinfoSampleSource::new()),
            artifact_sink,
            Arc::new(NullChartSink),
        )
    }

    /// Dependency-injected construction for alternate sources and sinks
    pub fn with_parts(
        options: SamplerOptions,
        snapshots: Box<dyn ProcessSnapshotProvider>,
        source: Box<dyn SampleSource>,
        artifact_sink: Arc<dyn ArtifactSink>,
        chart_sink: Arc<dyn ChartSink>,
    ) -> Self {
        Self {
            options,
            snapshots: Arc::new(Mutex::new(snapshots)),
            source: Arc::new(Mutex::new(source)),
            store: Arc::new(Mutex::new(CounterStore::new())),
            tracked: Arc::new(RwLock::new(Vec::new())),
            artifact_sink,
            chart_sink,
            shutdown: Arc::new(Notify::new()),
            stopping: Arc::new(AtomicBool::new(false)),
            refresh_task: None,
            sample_task: None,
        }
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.refresh_task.is_some() || self.sample_task.is_some()
    }

    /// Start both loops. The tracked set is refreshed and one sample is
    /// recorded before the timers are armed, so the store is never empty
    /// while Running. Calling start() on a running sampler is a contract
    /// violation and errors.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(HarnessError::SamplerAlreadyRunning);
        }
        self.stopping.store(false, Ordering::SeqCst);
        info!(
            root_pid = self.options.root_pid,
            interval_ms = self.options.collection_interval.as_millis() as u64,
            "starting counter sampler"
        );

        Self::refresh_tracked(&self.options, &self.snapshots, &self.tracked).await?;
        self.refresh_task = Some(tokio::spawn(Self::refresh_loop(
            self.options.clone(),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.tracked),
            Arc::clone(&self.shutdown),
            Arc::clone(&self.stopping),
        )));

        if let Err(err) = Self::sample_once(&self.source, &self.tracked, &self.store).await {
            self.halt_loops().await;
            return Err(err);
        }
        self.sample_task = Some(tokio::spawn(Self::sample_loop(
            self.options.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.tracked),
            Arc::clone(&self.store),
            Arc::clone(&self.shutdown),
            Arc::clone(&self.stopping),
        )));

        Ok(())
    }

    /// Stop both loops, run the derived computations and hand the enabled
    /// outputs to the sinks. Tolerates being called when the loops are
    /// already gone.
    pub async fn stop(&mut self) -> Result<()> {
        self.halt_loops().await;

        {
            let mut store = self.store.lock().await;
            store.compute_totals(self.options.root_pid);
            if self.options.include_moving_averages {
                store.compute_moving_averages();
            }
            store.compute_statistics();
        }

        self.dump_artifacts().await?;
        info!("counter sampler stopped");
        Ok(())
    }

    /// Clone of the current aggregation state
    pub async fn snapshot(&self) -> CounterStore {
        self.store.lock().await.clone()
    }

    pub async fn statistics(&self) -> Option<ComputedStatistics> {
        self.store.lock().await.statistics.clone()
    }

    pub async fn tracked_processes(&self) -> Vec<ProcessInfo> {
        self.tracked.read().await.clone()
    }

    /// Drop all recorded and derived series. Never happens implicitly
    /// between runs.
    pub async fn reset(&mut self) {
        self.store.lock().await.reset();
    }

    async fn halt_loops(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if let Some(task) = self.refresh_task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "process refresh loop ended abnormally");
            }
        }
        if let Some(task) = self.sample_task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "sampling loop ended abnormally");
            }
        }
    }

    async fn refresh_loop(
        options: SamplerOptions,
        snapshots: Arc<Mutex<Box<dyn ProcessSnapshotProvider>>>,
        tracked: Arc<RwLock<Vec<ProcessInfo>>>,
        shutdown: Arc<Notify>,
        stopping: Arc<AtomicBool>,
    ) {
        let shutdown_signal = shutdown.notified();
        tokio::pin!(shutdown_signal);
        let mut ticks = interval(options.process_info_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticks.tick().await; // start() already refreshed once

        loop {
            if stopping.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = ticks.tick() => {
                    if let Err(err) = Self::refresh_tracked(&options, &snapshots, &tracked).await {
                        warn!(error = %err, "process tree refresh failed, keeping previous tracked set");
                    }
                }
                _ = &mut shutdown_signal => break,
            }
        }
        debug!("process refresh loop stopped");
    }

    async fn sample_loop(
        options: SamplerOptions,
        source: Arc<Mutex<Box<dyn SampleSource>>>,
        tracked: Arc<RwLock<Vec<ProcessInfo>>>,
        store: Arc<Mutex<CounterStore>>,
        shutdown: Arc<Notify>,
        stopping: Arc<AtomicBool>,
    ) {
        let shutdown_signal = shutdown.notified();
        tokio::pin!(shutdown_signal);
        let mut ticks = interval(options.collection_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticks.tick().await; // start() already sampled once

        loop {
            if stopping.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = ticks.tick() => {
                    if let Err(err) = Self::sample_once(&source, &tracked, &store).await {
                        warn!(error = %err, "sampling tick failed, skipping");
                    }
                }
                _ = &mut shutdown_signal => break,
            }
        }
        debug!("sampling loop stopped");
    }

    /// Replace the tracked set wholesale with the current subtree. Stale
    /// pids simply stop receiving samples; their recorded series stay.
    async fn refresh_tracked(
        options: &SamplerOptions,
        snapshots: &Arc<Mutex<Box<dyn ProcessSnapshotProvider>>>,
        tracked: &Arc<RwLock<Vec<ProcessInfo>>>,
    ) -> Result<()> {
        let snapshot = snapshots.lock().await.snapshot().await?;
        let tree = resolve_tree(&snapshot, options.root_pid, options.include_parent_subtree)?;
        debug!(processes = tree.len(), "refreshed tracked process set");
        *tracked.write().await = tree;
        Ok(())
    }

    /// One sampling tick: machine row plus one sample per tracked pid,
    /// folded into the store under a single lock hold so readers never
    /// observe a partial tick.
    async fn sample_once(
        source: &Arc<Mutex<Box<dyn SampleSource>>>,
        tracked: &Arc<RwLock<Vec<ProcessInfo>>>,
        store: &Arc<Mutex<CounterStore>>,
    ) -> Result<()> {
        let pids: Vec<i32> = tracked.read().await.iter().map(|p| p.pid).collect();
        let samples = {
            let mut source = source.lock().await;
            let machine = source.sample_machine().await?;
            let mut samples = source.sample(&pids).await?;
            samples.push(machine);
            samples
        };

        let mut store = store.lock().await;
        store.record_tick(&samples);
        debug!(samples = samples.len(), "recorded sampling tick");
        Ok(())
    }

    /// Hand the enabled outputs to the sinks, file and chart dumps in
    /// parallel rather than sequenced
    async fn dump_artifacts(&self) -> Result<()> {
        if !self.options.dump_to_file && !self.options.dump_to_chart {
            return Ok(());
        }
        let store = self.store.lock().await.clone();
        let tracked = self.tracked.read().await.clone();
        let name = self.options.counter_name.as_str();

        let files = async {
            if !self.options.dump_to_file {
                return Ok(());
            }
            let collection = to_json(name, &store.collection)?;
            let sma = to_json(name, &store.sma_over4)?;
            let ema = to_json(name, &store.ema_over4)?;
            let statistics = to_json(name, &store.statistics)?;
            let processes = to_json(name, &tracked)?;
            let data_name = format!("{name}_data");
            let sma_name = format!("{name}_sma_data");
            let ema_name = format!("{name}_ema_data");
            let statistics_name = format!("{name}_statistics");
            let processes_name = format!("{name}_processes");
            futures::try_join!(
                self.artifact_sink.write_json(&data_name, &collection),
                self.artifact_sink.write_json(&sma_name, &sma),
                self.artifact_sink.write_json(&ema_name, &ema),
                self.artifact_sink.write_json(&statistics_name, &statistics),
                self.artifact_sink.write_json(&processes_name, &processes),
            )?;
            Ok::<(), HarnessError>(())
        };

        let charts = async {
            if !self.options.dump_to_chart {
                return Ok(());
            }
            let names: HashMap<i32, String> =
                tracked.iter().map(|p| (p.pid, p.name.clone())).collect();
            for (pid, series) in &store.collection {
                self.chart_sink
                    .render(&chart_spec(name, *pid, &names, series, ""))
                    .await?;
            }
            for (pid, series) in &store.sma_over4 {
                self.chart_sink
                    .render(&chart_spec(name, *pid, &names, series, "_sma"))
                    .await?;
            }
            for (pid, series) in &store.ema_over4 {
                self.chart_sink
                    .render(&chart_spec(name, *pid, &names, series, "_ema"))
                    .await?;
            }
            Ok::<(), HarnessError>(())
        };

        let (files_result, charts_result) = futures::join!(files, charts);
        files_result?;
        charts_result?;
        Ok(())
    }
}

fn to_json<T: Serialize>(context: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| HarnessError::serialization(context.to_string(), e))
}

fn chart_spec(
    counter: &str,
    pid: i32,
    names: &HashMap<i32, String>,
    series: &Series,
    variant: &str,
) -> ChartSpec {
    let process = match pid {
        TOTALS_PID => "totals".to_string(),
        WHOLE_COMPUTER_PID => "machine".to_string(),
        _ => names
            .get(&pid)
            .cloned()
            .unwrap_or_else(|| pid.to_string()),
    };
    ChartSpec {
        title: format!("{counter}{variant} {process} ({pid})"),
        x_label: "timestamp_ms".to_string(),
        started_at_ms: series.timestamp.first().copied().unwrap_or(0),
        x: series.timestamp.clone(),
        series: vec![
            LabeledSeries {
                label: "cpu".to_string(),
                values: series.cpu.clone(),
            },
            LabeledSeries {
                label: "memory".to_string(),
                values: series.memory.clone(),
            },
        ],
        format: ImageFormat::Png,
    }
}
