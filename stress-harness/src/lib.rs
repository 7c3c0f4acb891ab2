// stress-harness/src/lib.rs
// Concurrent stress-execution engine with process-tree performance
// counter sampling

pub mod artifacts;
pub mod config;
pub mod counters;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod process_tree;
pub mod sample_source;
pub mod sampler;

#[cfg(test)]
pub(crate) mod testutil;

pub use artifacts::{
    ArtifactSink, ChartSink, ChartSpec, FileArtifactSink, ImageFormat, LabeledSeries,
    NullChartSink,
};
pub use config::{
    SamplerOptions, SamplerOptionsBuilder, StressOptions, StressOptionsBuilder, StressOverrides,
};
pub use counters::{ComputedStatistics, CounterStore, Series, MOVING_AVERAGE_WINDOW};
pub use engine::{IterationContext, IterationFailure, StressEngine, StressReport, UnitOfWork};
pub use error::{AssertionFailure, HarnessError, OptionViolation, Result};
pub use process_tree::{
    resolve_tree, ProcessInfo, ProcessSnapshotProvider, SysinfoSnapshotProvider, TOTALS_PID,
    WHOLE_COMPUTER_PID,
};
pub use orchestrator::{stressed, StressOrchestrator};
pub use sample_source::{CounterSample, SampleSource, SysinfoSampleSource};
pub use sampler::CounterSampler;
