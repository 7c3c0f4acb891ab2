// stress-runner/src/main.rs
// Stress Runner - drives a demo workload through the stress harness

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use std::time::Duration;
use stress_harness::{
    AssertionFailure, HarnessError, IterationContext, SamplerOptionsBuilder, StressEngine,
    StressOptionsBuilder, StressOrchestrator, StressOverrides, UnitOfWork,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let matches = Command::new("stress-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a demo workload under the stress harness with optional counter collection")
        .arg(
            Arg::new("runtime")
                .long("runtime")
                .help("Wall-clock deadline in seconds")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("dop")
                .long("dop")
                .help("Degree of parallelism; 0 means one worker per CPU core")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .help("Iteration cap per worker")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("pass-threshold")
                .long("pass-threshold")
                .help("Required pass fraction in [0, 1]")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("collect-counters")
                .long("collect-counters")
                .help("Sample CPU/memory counters for the process tree during the run")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("collection-interval-ms")
                .long("collection-interval-ms")
                .help("Counter sampling interval in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for counter artifacts"),
        )
        .arg(
            Arg::new("fail-every")
                .long("fail-every")
                .help("Make every n-th invocation of the demo workload fail")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run report as JSON instead of a summary")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // CLI arguments are the explicit layer; anything left unset falls
    // through to the environment and then the built-in defaults.
    let mut stress_builder = StressOptionsBuilder::new();
    if let Some(runtime) = matches.get_one::<f64>("runtime") {
        stress_builder = stress_builder.runtime_secs(*runtime);
    }
    if let Some(dop) = matches.get_one::<usize>("dop") {
        let dop = if *dop == 0 { num_cpus::get() } else { *dop };
        stress_builder = stress_builder.dop(dop);
    }
    if let Some(iterations) = matches.get_one::<u64>("iterations") {
        stress_builder = stress_builder.iterations(*iterations);
    }
    if let Some(threshold) = matches.get_one::<f64>("pass-threshold") {
        stress_builder = stress_builder.pass_threshold(*threshold);
    }
    let stress_options = stress_builder.resolve()?;

    let engine = StressEngine::new(stress_options.clone());
    let orchestrator = if matches.get_flag("collect-counters") {
        let mut sampler_builder = SamplerOptionsBuilder::new().counter_name("stress_runner");
        if let Some(interval) = matches.get_one::<u64>("collection-interval-ms") {
            sampler_builder = sampler_builder.collection_interval_ms(*interval);
        }
        if let Some(dir) = matches.get_one::<String>("output-dir") {
            sampler_builder = sampler_builder.output_directory(dir.as_str());
        }
        let sampler_options = sampler_builder.resolve()?;
        info!(
            root_pid = sampler_options.root_pid,
            output_dir = %sampler_options.output_directory.display(),
            "counter collection enabled"
        );
        StressOrchestrator::with_counters(engine, sampler_options)
    } else {
        StressOrchestrator::new(engine)
    };

    info!(
        runtime_secs = stress_options.runtime_secs,
        dop = stress_options.dop,
        iterations = stress_options.iterations,
        "starting demo stress run"
    );

    let fail_every = matches.get_one::<u64>("fail-every").copied();
    let work = demo_workload(fail_every);

    match orchestrator
        .run("stress_runner_demo", work, StressOverrides::none())
        .await
    {
        Ok(report) => {
            if matches.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n📈 Run Summary:");
                println!("   • Passes: {}", report.passes);
                println!("   • Assertion failures: {}", report.fails.len());
                println!("   • Unexpected errors: {}", report.errors.len());
                println!("   • Pass rate: {:.1}%", report.pass_rate() * 100.0);
                println!("\n✅ Stress run passed");
            }
            Ok(())
        }
        Err(err @ HarnessError::ThresholdNotMet { .. }) => {
            eprintln!("\n❌ {err}");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

/// Demo workload: a short jittered sleep, optionally failing every n-th
/// invocation on a shared counter
fn demo_workload(fail_every: Option<u64>) -> Arc<dyn UnitOfWork> {
    use std::sync::atomic::{AtomicU64, Ordering};

    let counter = Arc::new(AtomicU64::new(0));
    Arc::new(move |_cx: IterationContext| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            tokio::time::sleep(Duration::from_millis(fastrand::u64(1..5))).await;
            match fail_every {
                Some(every) if every > 0 && n % every == 0 => Err(anyhow::Error::new(
                    AssertionFailure::new(format!("synthetic failure on invocation {n}")),
                )),
                _ => Ok(()),
            }
        }
    })
}
