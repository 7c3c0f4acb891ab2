// stress-harness/src/orchestrator.rs
// Composes the stress engine with an optional counter sampler scoped to
// exactly the run's duration

use crate::config::{SamplerOptions, StressOverrides};
use crate::engine::{StressEngine, StressReport, UnitOfWork};
use crate::error::Result;
use crate::sampler::CounterSampler;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::warn;

/// Runs stress executions, starting and stopping a counter sampler
/// around each run when counter collection is enabled. Construct one per
/// test suite and pass it around explicitly.
pub struct StressOrchestrator {
    engine: StressEngine,
    sampler_options: Option<SamplerOptions>,
}

impl StressOrchestrator {
    /// Orchestrator without counter collection
    pub fn new(engine: StressEngine) -> Self {
        Self {
            engine,
            sampler_options: None,
        }
    }

    /// Orchestrator that samples counters for the duration of every run.
    /// The options carry the resolved root pid (explicit override, else
    /// environment, else the current process).
    pub fn with_counters(engine: StressEngine, sampler_options: SamplerOptions) -> Self {
        Self {
            engine,
            sampler_options: Some(sampler_options),
        }
    }

    pub fn engine(&self) -> &StressEngine {
        &self.engine
    }

    pub async fn run(
        &self,
        name: &str,
        work: Arc<dyn UnitOfWork>,
        overrides: StressOverrides,
    ) -> Result<StressReport> {
        match &self.sampler_options {
            None => self.engine.run(name, work, overrides).await,
            Some(options) => {
                let mut sampler = CounterSampler::new(options.clone());
                self.run_with_sampler(&mut sampler, name, work, overrides)
                    .await
            }
        }
    }

    /// Run with a caller-supplied sampler (alternate sources or sinks).
    /// The sampler is stopped even when the engine fails, so counters are
    /// collected for exactly the run's duration.
    pub async fn run_with_sampler(
        &self,
        sampler: &mut CounterSampler,
        name: &str,
        work: Arc<dyn UnitOfWork>,
        overrides: StressOverrides,
    ) -> Result<StressReport> {
        sampler.start().await?;
        let outcome = self.engine.run(name, work, overrides).await;
        if let Err(err) = sampler.stop().await {
            warn!(error = %err, "failed to stop counter sampler cleanly");
        }
        outcome
    }
}

/// Explicit higher-order wrapping in place of decorator sugar: returns a
/// new async closure that runs `work` through the orchestrator with the
/// given options.
pub fn stressed(
    orchestrator: Arc<StressOrchestrator>,
    name: impl Into<String>,
    work: Arc<dyn UnitOfWork>,
    overrides: StressOverrides,
) -> impl Fn() -> BoxFuture<'static, Result<StressReport>> {
    let name = name.into();
    move || {
        let orchestrator = Arc::clone(&orchestrator);
        let work = Arc::clone(&work);
        let name = name.clone();
        let overrides = overrides.clone();
        Box::pin(async move { orchestrator.run(&name, work, overrides).await })
    }
}
