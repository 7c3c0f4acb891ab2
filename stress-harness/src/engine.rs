// stress-harness/src/engine.rs
// Concurrent stress-execution engine: fan out dop iteration loops over an
// async unit of work, bounded by iteration count and a cooperative
// wall-clock deadline, and judge the tally against a pass threshold

use crate::config::{StressOptions, StressOverrides};
use crate::error::{AssertionFailure, HarnessError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifies one invocation of the unit of work within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    pub worker: usize,
    pub iteration: u64,
}

/// The asynchronous unit of work a stress run exercises. Return `Ok` for
/// a pass, an [`AssertionFailure`] for an expected policy-level failure,
/// and any other error for an unexpected one.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn run(&self, cx: IterationContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> UnitOfWork for F
where
    F: Fn(IterationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, cx: IterationContext) -> anyhow::Result<()> {
        (self)(cx).await
    }
}

/// One recorded iteration failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationFailure {
    pub worker: usize,
    pub iteration: u64,
    pub message: String,
}

/// Final tally of a stress run
#[derive(Debug, Clone, Default, Serialize)]
pub struct StressReport {
    pub passes: u64,
    pub fails: Vec<IterationFailure>,
    pub errors: Vec<IterationFailure>,
}

impl StressReport {
    /// Iterations actually attempted across all workers
    pub fn total(&self) -> u64 {
        self.passes + self.fails.len() as u64 + self.errors.len() as u64
    }

    /// Observed pass fraction; a zero-total run counts as fully passing
    pub fn pass_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            1.0
        } else {
            self.passes as f64 / total as f64
        }
    }
}

/// The stress-execution engine. Defaults are fixed at construction; each
/// run may override them per call. Construct one per orchestrator and
/// pass it around explicitly.
pub struct StressEngine {
    defaults: StressOptions,
}

impl StressEngine {
    pub fn new(defaults: StressOptions) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &StressOptions {
        &self.defaults
    }

    /// Run `work` under the effective options. Individual iteration
    /// failures are recorded and never abort the run; only the final
    /// threshold check or a worker panic can fail the call.
    pub async fn run(
        &self,
        name: &str,
        work: Arc<dyn UnitOfWork>,
        overrides: StressOverrides,
    ) -> Result<StressReport> {
        let options = overrides.merge_over(&self.defaults)?;
        let run_id = Uuid::new_v4();
        debug!(
            %run_id,
            name,
            runtime_secs = options.runtime_secs,
            dop = options.dop,
            iterations = options.iterations,
            pass_threshold = options.pass_threshold,
            "starting stress run"
        );

        // Cooperative deadline: workers observe the flag at their next
        // loop-top check or post-success yield, never mid-iteration.
        let timed_out = Arc::new(AtomicBool::new(options.runtime_secs <= 0.0));
        let deadline = if options.runtime_secs > 0.0 {
            let flag = Arc::clone(&timed_out);
            let runtime = Duration::from_secs_f64(options.runtime_secs);
            Some(tokio::spawn(async move {
                tokio::time::sleep(runtime).await;
                flag.store(true, Ordering::SeqCst);
            }))
        } else {
            None
        };

        let passes = Arc::new(AtomicU64::new(0));
        let fails: Arc<Mutex<Vec<IterationFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let errors: Arc<Mutex<Vec<IterationFailure>>> = Arc::new(Mutex::new(Vec::new()));

        let mut workers = Vec::with_capacity(options.dop);
        for worker in 0..options.dop {
            let work = Arc::clone(&work);
            let timed_out = Arc::clone(&timed_out);
            let passes = Arc::clone(&passes);
            let fails = Arc::clone(&fails);
            let errors = Arc::clone(&errors);
            let iterations = options.iterations;

            workers.push(tokio::spawn(async move {
                for iteration in 0..iterations {
                    if timed_out.load(Ordering::SeqCst) {
                        debug!(worker, iteration, "deadline reached, stopping worker");
                        break;
                    }
                    match work.run(IterationContext { worker, iteration }).await {
                        Ok(()) => {
                            passes.fetch_add(1, Ordering::SeqCst);
                            // Give siblings and the deadline a scheduling
                            // opportunity before committing to the next
                            // iteration.
                            tokio::task::yield_now().await;
                            if timed_out.load(Ordering::SeqCst) {
                                debug!(worker, iteration, "deadline reached, stopping worker");
                                break;
                            }
                        }
                        Err(err) => {
                            let record = IterationFailure {
                                worker,
                                iteration,
                                message: format!("{err:#}"),
                            };
                            if err.downcast_ref::<AssertionFailure>().is_some() {
                                debug!(worker, iteration, "iteration failed assertion");
                                fails.lock().push(record);
                            } else {
                                debug!(worker, iteration, error = %err, "iteration errored");
                                errors.lock().push(record);
                            }
                        }
                    }
                }
            }));
        }

        let joined = try_join_all(workers).await;
        if let Some(handle) = deadline {
            handle.abort();
        }
        // A worker dying outside the per-iteration handling is fatal to
        // the whole run and is not folded into the tally.
        joined.map_err(|err| HarnessError::WorkerAborted {
            message: err.to_string(),
        })?;

        let report = StressReport {
            passes: passes.load(Ordering::SeqCst),
            fails: std::mem::take(&mut *fails.lock()),
            errors: std::mem::take(&mut *errors.lock()),
        };

        let total = report.total();
        if total > 0 {
            let observed = report.passes as f64 / total as f64;
            if observed < options.pass_threshold {
                warn!(
                    %run_id,
                    name,
                    observed_percent = observed * 100.0,
                    expected_percent = options.pass_threshold * 100.0,
                    "stress run below pass threshold"
                );
                return Err(HarnessError::ThresholdNotMet {
                    function: name.to_string(),
                    expected_percent: options.pass_threshold * 100.0,
                    observed_percent: observed * 100.0,
                    passes: report.passes,
                    total,
                });
            }
        }

        info!(
            %run_id,
            name,
            passes = report.passes,
            fails = report.fails.len(),
            errors = report.errors.len(),
            "stress run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StressOptionsBuilder;
    use anyhow::anyhow;
    use proptest::prelude::*;
    use std::time::Instant;

    fn engine(runtime: f64, dop: usize, iterations: u64, threshold: f64) -> StressEngine {
        StressEngine::new(StressOptions {
            runtime_secs: runtime,
            dop,
            iterations,
            pass_threshold: threshold,
        })
    }

    fn always_ok() -> Arc<dyn UnitOfWork> {
        Arc::new(|_cx: IterationContext| async move { Ok(()) })
    }

    /// Fails every `fail_every`-th and errors every `error_every`-th
    /// invocation, counted across workers on a shared counter. A
    /// multiple of both counts as a fail.
    fn patterned(fail_every: u64, error_every: u64) -> (Arc<dyn UnitOfWork>, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        let shared = Arc::clone(&counter);
        let work: Arc<dyn UnitOfWork> = Arc::new(move |_cx: IterationContext| {
            let n = shared.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n % fail_every == 0 {
                    Err(anyhow::Error::new(AssertionFailure::new(format!(
                        "invocation {n} failed"
                    ))))
                } else if n % error_every == 0 {
                    Err(anyhow!("invocation {n} exploded"))
                } else {
                    Ok(())
                }
            }
        });
        (work, counter)
    }

    #[tokio::test]
    async fn all_passing_run_matches_the_example_tally() {
        let engine = engine(30.0, 5, 6, 1.0);
        let report = engine
            .run("example", always_ok(), StressOverrides::none())
            .await
            .unwrap();
        assert_eq!(report.passes, 30);
        assert!(report.fails.is_empty());
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn zero_threshold_never_fails_regardless_of_outcome() {
        let engine = engine(30.0, 2, 50, 0.0);
        let (work, _) = patterned(2, 3);
        let report = engine
            .run("chaotic", work, StressOverrides::none())
            .await
            .unwrap();
        assert_eq!(report.total(), 100);
    }

    #[tokio::test]
    async fn failure_pattern_counts_are_exact() {
        let engine = engine(30.0, 2, 50, 0.0);
        let (work, counter) = patterned(7, 11);
        let report = engine
            .run("patterned", work, StressOverrides::none())
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        // Multiples of 7 up to 100: 14. Multiples of 11 not divisible by
        // 7 (77 excluded): 8.
        assert_eq!(report.fails.len(), 14);
        assert_eq!(report.errors.len(), 8);
        assert_eq!(report.passes, 78);
        assert_eq!(report.total(), 100);
    }

    #[tokio::test]
    async fn threshold_above_achievable_rate_fails_the_run() {
        let engine = engine(30.0, 2, 50, 0.9);
        let (work, _) = patterned(7, 11);
        let err = engine
            .run("patterned", work, StressOverrides::none())
            .await
            .unwrap_err();
        match err {
            HarnessError::ThresholdNotMet {
                function,
                passes,
                total,
                ..
            } => {
                assert_eq!(function, "patterned");
                assert_eq!(passes, 78);
                assert_eq!(total, 100);
            }
            other => panic!("expected ThresholdNotMet, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn threshold_at_achievable_rate_passes() {
        let engine = engine(30.0, 2, 50, 0.78);
        let (work, _) = patterned(7, 11);
        assert!(engine
            .run("patterned", work, StressOverrides::none())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn recorded_failures_keep_worker_and_iteration() {
        let engine = engine(30.0, 1, 5, 0.0);
        let work: Arc<dyn UnitOfWork> = Arc::new(|cx: IterationContext| async move {
            if cx.iteration == 2 {
                Err(anyhow::Error::new(AssertionFailure::new("third time hurts")))
            } else {
                Ok(())
            }
        });
        let report = engine
            .run("indexed", work, StressOverrides::none())
            .await
            .unwrap();
        assert_eq!(report.fails.len(), 1);
        assert_eq!(report.fails[0].worker, 0);
        assert_eq!(report.fails[0].iteration, 2);
        assert!(report.fails[0].message.contains("third time hurts"));
    }

    #[tokio::test]
    async fn zero_iteration_run_passes_vacuously() {
        let engine = engine(30.0, 4, 0, 1.0);
        let counter = Arc::new(AtomicU64::new(0));
        let shared = Arc::clone(&counter);
        let work: Arc<dyn UnitOfWork> = Arc::new(move |_cx: IterationContext| {
            shared.fetch_add(1, Ordering::SeqCst);
            async move { Ok(()) }
        });
        let report = engine
            .run("empty", work, StressOverrides::none())
            .await
            .unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(report.pass_rate(), 1.0);
    }

    #[tokio::test]
    async fn zero_runtime_attempts_no_iterations() {
        let engine = engine(0.0, 4, 100, 1.0);
        let report = engine
            .run("instant", always_ok(), StressOverrides::none())
            .await
            .unwrap();
        assert_eq!(report.total(), 0);
    }

    #[tokio::test]
    async fn deadline_stops_the_run_close_to_the_configured_runtime() {
        let engine = engine(0.3, 2, 10_000, 0.0);
        let work: Arc<dyn UnitOfWork> = Arc::new(|_cx: IterationContext| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        });

        let started = Instant::now();
        let report = engine
            .run("deadline", work, StressOverrides::none())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(report.passes > 0);
        assert!(report.total() < 20_000);
        assert!(
            elapsed < Duration::from_secs(2),
            "run overshot the deadline: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn worker_panic_aborts_the_whole_run() {
        let engine = engine(30.0, 2, 10, 0.0);
        let work: Arc<dyn UnitOfWork> = Arc::new(|cx: IterationContext| async move {
            if cx.worker == 1 && cx.iteration == 3 {
                panic!("scheduler-level failure");
            }
            Ok(())
        });
        let err = engine
            .run("fatal", work, StressOverrides::none())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::WorkerAborted { .. }));
    }

    #[tokio::test]
    async fn per_call_overrides_win_over_engine_defaults() {
        let engine = engine(30.0, 1, 1, 1.0);
        let report = engine
            .run(
                "overridden",
                always_ok(),
                StressOverrides::none().dop(3).iterations(4),
            )
            .await
            .unwrap();
        assert_eq!(report.passes, 12);
    }

    #[tokio::test]
    async fn invalid_overrides_are_rejected_in_aggregate() {
        let engine = engine(30.0, 1, 1, 1.0);
        let err = engine
            .run(
                "invalid",
                always_ok(),
                StressOverrides::none().dop(0).pass_threshold(7.0),
            )
            .await
            .unwrap_err();
        match err {
            HarnessError::InvalidOptions { violations } => assert_eq!(violations.len(), 2),
            other => panic!("expected InvalidOptions, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn engine_defaults_resolve_from_builder() {
        let options = StressOptionsBuilder::new()
            .runtime_secs(1.0)
            .dop(2)
            .iterations(3)
            .pass_threshold(0.5)
            .resolve_with(&|_| None)
            .unwrap();
        let engine = StressEngine::new(options);
        assert_eq!(engine.defaults().dop, 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn totals_are_conserved_without_a_deadline(dop in 1usize..4, iterations in 0u64..20) {
            tokio_test::block_on(async move {
                let engine = StressEngine::new(StressOptions {
                    runtime_secs: 30.0,
                    dop,
                    iterations,
                    pass_threshold: 0.0,
                });
                let (work, _) = patterned(3, 5);
                let report = engine
                    .run("conservation", work, StressOverrides::none())
                    .await
                    .unwrap();
                assert_eq!(report.total(), dop as u64 * iterations);
            });
        }
    }
}
