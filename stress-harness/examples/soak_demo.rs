// stress-harness/examples/soak_demo.rs
// Stress a jittered in-process workload while sampling counters for the
// current process tree.
// Run with: cargo run --example soak_demo

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use stress_harness::{
    AssertionFailure, IterationContext, SamplerOptionsBuilder, StressEngine,
    StressOptionsBuilder, StressOrchestrator, StressOverrides, UnitOfWork,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    info!("🚀 Starting stress harness soak demo");

    let stress_options = StressOptionsBuilder::new()
        .runtime_secs(5.0)
        .dop(4)
        .iterations(200)
        .pass_threshold(0.9)
        .resolve()?;
    let sampler_options = SamplerOptionsBuilder::new()
        .collection_interval_ms(250)
        .counter_name("soak_demo")
        .output_directory("target/soak-demo-counters")
        .dump_to_chart(false)
        .resolve()?;

    println!("⚙️  Demo configuration:");
    println!("   • Runtime: {}s", stress_options.runtime_secs);
    println!("   • Workers: {}", stress_options.dop);
    println!("   • Iterations per worker: {}", stress_options.iterations);
    println!("   • Pass threshold: {:.0}%", stress_options.pass_threshold * 100.0);

    let orchestrator = Arc::new(StressOrchestrator::with_counters(
        StressEngine::new(stress_options),
        sampler_options,
    ));

    // Jittered workload that occasionally misses its latency budget.
    let work: Arc<dyn UnitOfWork> = Arc::new(|cx: IterationContext| async move {
        let delay = Duration::from_millis(fastrand::u64(1..8));
        tokio::time::sleep(delay).await;
        if delay > Duration::from_millis(6) {
            return Err(anyhow::Error::new(AssertionFailure::new(format!(
                "worker {} iteration {} blew its latency budget",
                cx.worker, cx.iteration
            ))));
        }
        Ok(())
    });

    let report = orchestrator
        .run("soak_demo", work, StressOverrides::none())
        .await?;

    println!("\n📈 Soak Demo Summary:");
    println!("   • Passes: {}", report.passes);
    println!("   • Assertion failures: {}", report.fails.len());
    println!("   • Unexpected errors: {}", report.errors.len());
    println!("   • Pass rate: {:.1}%", report.pass_rate() * 100.0);
    println!("   • Counter artifacts: target/soak-demo-counters/");
    println!("\n✅ Soak demo completed!");

    Ok(())
}
