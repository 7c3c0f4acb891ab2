// stress-harness/src/config.rs
// Option resolution: explicit argument -> environment variable -> default,
// with range validation collected into an aggregate error

use crate::error::{HarnessError, OptionViolation, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const MAX_RUNTIME_SECS: f64 = 3600.0;
pub const MAX_DOP: usize = 1024;
pub const MAX_ITERATIONS: u64 = 10_000_000;

pub const MIN_COLLECTION_INTERVAL_MS: u64 = 10;
pub const MAX_COLLECTION_INTERVAL_MS: u64 = 3_600_000;
pub const MIN_PROCESS_INFO_INTERVAL_SECS: u64 = 1;
pub const MAX_PROCESS_INFO_INTERVAL_SECS: u64 = 3600;

pub const ENV_STRESS_RUNTIME: &str = "StressRuntime";
pub const ENV_STRESS_DOP: &str = "StressDop";
pub const ENV_STRESS_ITERATIONS: &str = "StressIterations";
pub const ENV_STRESS_PASS_THRESHOLD: &str = "StressPassThreshold";
pub const ENV_COLLECTION_INTERVAL_MS: &str = "CountersCollectionIntervalMs";
pub const ENV_INCLUDE_MOVING_AVERAGES: &str = "CountersIncludeMovingAverages";
pub const ENV_DUMP_TO_FILE: &str = "CountersDumpToFile";
pub const ENV_DUMP_TO_CHART: &str = "CountersDumpToChart";
pub const ENV_OUTPUT_DIRECTORY: &str = "CountersOutputDirectory";
pub const ENV_PERF_PID: &str = "PerfPidForCollection";
pub const ENV_SUITE_TYPE: &str = "SuiteType";

const DEFAULT_RUNTIME_SECS: f64 = 30.0;
const DEFAULT_DOP: usize = 4;
const DEFAULT_ITERATIONS: u64 = 100;
const DEFAULT_PASS_THRESHOLD: f64 = 1.0;
const DEFAULT_COLLECTION_INTERVAL_MS: u64 = 1000;
const DEFAULT_PROCESS_INFO_INTERVAL_SECS: u64 = 10;
const DEFAULT_OUTPUT_DIRECTORY: &str = "perf-counters";
const DEFAULT_COUNTER_NAME: &str = "counters";

/// Environment lookup used by the resolvers. Injectable so precedence is
/// testable without mutating process-wide state.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Effective stress-run parameters, immutable once an engine is built
#[derive(Debug, Clone, PartialEq)]
pub struct StressOptions {
    pub runtime_secs: f64,
    pub dop: usize,
    pub iterations: u64,
    pub pass_threshold: f64,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self {
            runtime_secs: DEFAULT_RUNTIME_SECS,
            dop: DEFAULT_DOP,
            iterations: DEFAULT_ITERATIONS,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

/// Per-call overrides merged over an engine's defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StressOverrides {
    pub runtime_secs: Option<f64>,
    pub dop: Option<usize>,
    pub iterations: Option<u64>,
    pub pass_threshold: Option<f64>,
}

impl StressOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn runtime_secs(mut self, v: f64) -> Self {
        self.runtime_secs = Some(v);
        self
    }

    pub fn dop(mut self, v: usize) -> Self {
        self.dop = Some(v);
        self
    }

    pub fn iterations(mut self, v: u64) -> Self {
        self.iterations = Some(v);
        self
    }

    pub fn pass_threshold(mut self, v: f64) -> Self {
        self.pass_threshold = Some(v);
        self
    }

    /// Overlay these overrides on already-resolved defaults. The
    /// environment does not participate again; it was consulted when the
    /// defaults were constructed.
    pub fn merge_over(&self, defaults: &StressOptions) -> Result<StressOptions> {
        let merged = StressOptions {
            runtime_secs: self.runtime_secs.unwrap_or(defaults.runtime_secs),
            dop: self.dop.unwrap_or(defaults.dop),
            iterations: self.iterations.unwrap_or(defaults.iterations),
            pass_threshold: self.pass_threshold.unwrap_or(defaults.pass_threshold),
        };
        validate_stress_options(&merged)?;
        Ok(merged)
    }
}

/// Builder resolving each stress field with explicit -> env -> default
/// precedence
#[derive(Debug, Clone, Default)]
pub struct StressOptionsBuilder {
    runtime_secs: Option<f64>,
    dop: Option<usize>,
    iterations: Option<u64>,
    pass_threshold: Option<f64>,
}

impl StressOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime_secs(mut self, v: f64) -> Self {
        self.runtime_secs = Some(v);
        self
    }

    pub fn dop(mut self, v: usize) -> Self {
        self.dop = Some(v);
        self
    }

    pub fn iterations(mut self, v: u64) -> Self {
        self.iterations = Some(v);
        self
    }

    pub fn pass_threshold(mut self, v: f64) -> Self {
        self.pass_threshold = Some(v);
        self
    }

    pub fn resolve(self) -> Result<StressOptions> {
        self.resolve_with(&process_env)
    }

    pub fn resolve_with(self, env: EnvLookup<'_>) -> Result<StressOptions> {
        let mut violations = Vec::new();

        let runtime_secs = resolve_numeric(
            "runtime_secs",
            self.runtime_secs,
            ENV_STRESS_RUNTIME,
            DEFAULT_RUNTIME_SECS,
            env,
            parse_f64,
            runtime_in_range,
            RUNTIME_RANGE_MESSAGE,
            &mut violations,
        );
        let dop = resolve_numeric(
            "dop",
            self.dop,
            ENV_STRESS_DOP,
            DEFAULT_DOP,
            env,
            parse_usize,
            dop_in_range,
            DOP_RANGE_MESSAGE,
            &mut violations,
        );
        let iterations = resolve_numeric(
            "iterations",
            self.iterations,
            ENV_STRESS_ITERATIONS,
            DEFAULT_ITERATIONS,
            env,
            parse_u64,
            iterations_in_range,
            ITERATIONS_RANGE_MESSAGE,
            &mut violations,
        );
        let pass_threshold = resolve_numeric(
            "pass_threshold",
            self.pass_threshold,
            ENV_STRESS_PASS_THRESHOLD,
            DEFAULT_PASS_THRESHOLD,
            env,
            parse_f64,
            threshold_in_range,
            THRESHOLD_RANGE_MESSAGE,
            &mut violations,
        );

        if !violations.is_empty() {
            return Err(HarnessError::InvalidOptions { violations });
        }

        Ok(StressOptions {
            runtime_secs,
            dop,
            iterations,
            pass_threshold,
        })
    }
}

/// Effective counter-sampler parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerOptions {
    pub collection_interval: Duration,
    pub process_info_interval: Duration,
    pub include_moving_averages: bool,
    pub dump_to_file: bool,
    pub dump_to_chart: bool,
    pub output_directory: PathBuf,
    pub counter_name: String,
    pub root_pid: i32,
    pub include_parent_subtree: bool,
}

/// Builder resolving each sampler field with explicit -> env -> default
/// precedence
#[derive(Debug, Clone, Default)]
pub struct SamplerOptionsBuilder {
    collection_interval_ms: Option<u64>,
    process_info_interval_secs: Option<u64>,
    include_moving_averages: Option<bool>,
    dump_to_file: Option<bool>,
    dump_to_chart: Option<bool>,
    output_directory: Option<PathBuf>,
    counter_name: Option<String>,
    root_pid: Option<i32>,
    include_parent_subtree: Option<bool>,
    suite_type: Option<String>,
}

impl SamplerOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_interval_ms(mut self, v: u64) -> Self {
        self.collection_interval_ms = Some(v);
        self
    }

    pub fn process_info_interval_secs(mut self, v: u64) -> Self {
        self.process_info_interval_secs = Some(v);
        self
    }

    pub fn include_moving_averages(mut self, v: bool) -> Self {
        self.include_moving_averages = Some(v);
        self
    }

    pub fn dump_to_file(mut self, v: bool) -> Self {
        self.dump_to_file = Some(v);
        self
    }

    pub fn dump_to_chart(mut self, v: bool) -> Self {
        self.dump_to_chart = Some(v);
        self
    }

    pub fn output_directory(mut self, v: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(v.into());
        self
    }

    pub fn counter_name(mut self, v: impl Into<String>) -> Self {
        self.counter_name = Some(v.into());
        self
    }

    pub fn root_pid(mut self, v: i32) -> Self {
        self.root_pid = Some(v);
        self
    }

    pub fn include_parent_subtree(mut self, v: bool) -> Self {
        self.include_parent_subtree = Some(v);
        self
    }

    pub fn suite_type(mut self, v: impl Into<String>) -> Self {
        self.suite_type = Some(v.into());
        self
    }

    pub fn resolve(self) -> Result<SamplerOptions> {
        self.resolve_with(&process_env)
    }

    pub fn resolve_with(self, env: EnvLookup<'_>) -> Result<SamplerOptions> {
        let mut violations = Vec::new();

        let collection_interval_ms = resolve_numeric(
            "collection_interval_ms",
            self.collection_interval_ms,
            ENV_COLLECTION_INTERVAL_MS,
            DEFAULT_COLLECTION_INTERVAL_MS,
            env,
            parse_u64,
            collection_interval_in_range,
            COLLECTION_INTERVAL_RANGE_MESSAGE,
            &mut violations,
        );
        let process_info_interval_secs = match self.process_info_interval_secs {
            Some(v) if process_info_interval_in_range(&v) => v,
            Some(v) => {
                violations.push(OptionViolation::new(
                    "process_info_interval_secs",
                    v,
                    PROCESS_INFO_INTERVAL_RANGE_MESSAGE,
                ));
                DEFAULT_PROCESS_INFO_INTERVAL_SECS
            }
            None => DEFAULT_PROCESS_INFO_INTERVAL_SECS,
        };
        let include_moving_averages = resolve_bool(
            "include_moving_averages",
            self.include_moving_averages,
            ENV_INCLUDE_MOVING_AVERAGES,
            true,
            env,
            &mut violations,
        );
        let dump_to_file = resolve_bool(
            "dump_to_file",
            self.dump_to_file,
            ENV_DUMP_TO_FILE,
            true,
            env,
            &mut violations,
        );
        let dump_to_chart = resolve_bool(
            "dump_to_chart",
            self.dump_to_chart,
            ENV_DUMP_TO_CHART,
            false,
            env,
            &mut violations,
        );
        let output_directory = self
            .output_directory
            .or_else(|| env(ENV_OUTPUT_DIRECTORY).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY));
        let counter_name = self
            .counter_name
            .unwrap_or_else(|| DEFAULT_COUNTER_NAME.to_string());
        let root_pid = resolve_numeric(
            "root_pid",
            self.root_pid,
            ENV_PERF_PID,
            std::process::id() as i32,
            env,
            parse_i32,
            pid_in_range,
            PID_RANGE_MESSAGE,
            &mut violations,
        );
        let suite_type = self.suite_type.or_else(|| env(ENV_SUITE_TYPE));
        let include_parent_subtree = match self.include_parent_subtree {
            Some(v) => v,
            None => suite_type
                .as_deref()
                .map(is_child_process_suite)
                .unwrap_or(false),
        };

        if !violations.is_empty() {
            return Err(HarnessError::InvalidOptions { violations });
        }

        Ok(SamplerOptions {
            collection_interval: Duration::from_millis(collection_interval_ms),
            process_info_interval: Duration::from_secs(process_info_interval_secs),
            include_moving_averages,
            dump_to_file,
            dump_to_chart,
            output_directory,
            counter_name,
            root_pid,
            include_parent_subtree,
        })
    }
}

const RUNTIME_RANGE_MESSAGE: &str = "must be a finite number of seconds within [0, 3600]";
const DOP_RANGE_MESSAGE: &str = "must be within [1, 1024]";
const ITERATIONS_RANGE_MESSAGE: &str = "must be within [0, 10000000]";
const THRESHOLD_RANGE_MESSAGE: &str = "must be a fraction within [0, 1]";
const COLLECTION_INTERVAL_RANGE_MESSAGE: &str = "must be within [10, 3600000] milliseconds";
const PROCESS_INFO_INTERVAL_RANGE_MESSAGE: &str = "must be within [1, 3600] seconds";
const PID_RANGE_MESSAGE: &str = "must be a positive process id";

fn runtime_in_range(v: &f64) -> bool {
    v.is_finite() && (0.0..=MAX_RUNTIME_SECS).contains(v)
}

fn dop_in_range(v: &usize) -> bool {
    (1..=MAX_DOP).contains(v)
}

fn iterations_in_range(v: &u64) -> bool {
    *v <= MAX_ITERATIONS
}

fn threshold_in_range(v: &f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(v)
}

fn collection_interval_in_range(v: &u64) -> bool {
    (MIN_COLLECTION_INTERVAL_MS..=MAX_COLLECTION_INTERVAL_MS).contains(v)
}

fn process_info_interval_in_range(v: &u64) -> bool {
    (MIN_PROCESS_INFO_INTERVAL_SECS..=MAX_PROCESS_INFO_INTERVAL_SECS).contains(v)
}

fn pid_in_range(v: &i32) -> bool {
    *v > 0
}

fn is_child_process_suite(suite: &str) -> bool {
    matches!(
        suite.trim().to_ascii_lowercase().as_str(),
        "childprocess" | "child-process" | "out-of-proc"
    )
}

pub(crate) fn validate_stress_options(options: &StressOptions) -> Result<()> {
    let mut violations = Vec::new();
    if !runtime_in_range(&options.runtime_secs) {
        violations.push(OptionViolation::new(
            "runtime_secs",
            options.runtime_secs,
            RUNTIME_RANGE_MESSAGE,
        ));
    }
    if !dop_in_range(&options.dop) {
        violations.push(OptionViolation::new("dop", options.dop, DOP_RANGE_MESSAGE));
    }
    if !iterations_in_range(&options.iterations) {
        violations.push(OptionViolation::new(
            "iterations",
            options.iterations,
            ITERATIONS_RANGE_MESSAGE,
        ));
    }
    if !threshold_in_range(&options.pass_threshold) {
        violations.push(OptionViolation::new(
            "pass_threshold",
            options.pass_threshold,
            THRESHOLD_RANGE_MESSAGE,
        ));
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::InvalidOptions { violations })
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.parse().ok()
}

fn parse_usize(raw: &str) -> Option<usize> {
    raw.parse().ok()
}

fn parse_u64(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

fn parse_i32(raw: &str) -> Option<i32> {
    raw.parse().ok()
}

/// Boolean coercion from the accepted token sets, case-insensitively
pub(crate) fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn resolve_numeric<T>(
    field: &'static str,
    explicit: Option<T>,
    env_name: &str,
    default: T,
    env: EnvLookup<'_>,
    parse: fn(&str) -> Option<T>,
    in_range: fn(&T) -> bool,
    range_message: &str,
    violations: &mut Vec<OptionViolation>,
) -> T
where
    T: Copy + fmt::Display,
{
    match explicit {
        Some(v) if in_range(&v) => v,
        Some(v) => {
            violations.push(OptionViolation::new(field, v, range_message));
            default
        }
        None => match env(env_name) {
            Some(raw) => match parse(raw.trim()) {
                Some(v) if in_range(&v) => v,
                Some(v) => {
                    violations.push(OptionViolation::new(field, v, range_message));
                    default
                }
                None => {
                    violations.push(OptionViolation::new(field, &raw, "not a valid number"));
                    default
                }
            },
            None => default,
        },
    }
}

fn resolve_bool(
    field: &'static str,
    explicit: Option<bool>,
    env_name: &str,
    default: bool,
    env: EnvLookup<'_>,
    violations: &mut Vec<OptionViolation>,
) -> bool {
    match explicit {
        Some(v) => v,
        None => match env(env_name) {
            Some(raw) => match parse_bool_token(&raw) {
                Some(v) => v,
                None => {
                    violations.push(OptionViolation::new(
                        field,
                        &raw,
                        "not a recognized boolean token",
                    ));
                    default
                }
            },
            None => default,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: Vec<(&'static str, &'static str)>) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let options = StressOptionsBuilder::new().resolve_with(&no_env).unwrap();
        assert_eq!(options, StressOptions::default());
    }

    #[test]
    fn env_overrides_defaults_per_field() {
        let env = env_of(vec![
            (ENV_STRESS_RUNTIME, "12.5"),
            (ENV_STRESS_DOP, "8"),
            (ENV_STRESS_ITERATIONS, "250"),
            (ENV_STRESS_PASS_THRESHOLD, "0.75"),
        ]);
        let options = StressOptionsBuilder::new().resolve_with(&env).unwrap();
        assert_eq!(options.runtime_secs, 12.5);
        assert_eq!(options.dop, 8);
        assert_eq!(options.iterations, 250);
        assert_eq!(options.pass_threshold, 0.75);
    }

    #[test]
    fn explicit_arguments_override_env() {
        let env = env_of(vec![
            (ENV_STRESS_RUNTIME, "99"),
            (ENV_STRESS_DOP, "99"),
            (ENV_STRESS_ITERATIONS, "99"),
            (ENV_STRESS_PASS_THRESHOLD, "0.1"),
        ]);
        let options = StressOptionsBuilder::new()
            .runtime_secs(1.0)
            .dop(2)
            .iterations(3)
            .pass_threshold(0.5)
            .resolve_with(&env)
            .unwrap();
        assert_eq!(options.runtime_secs, 1.0);
        assert_eq!(options.dop, 2);
        assert_eq!(options.iterations, 3);
        assert_eq!(options.pass_threshold, 0.5);
    }

    #[test]
    fn violations_are_aggregated_not_fail_fast() {
        let env = env_of(vec![(ENV_STRESS_ITERATIONS, "not-a-number")]);
        let err = StressOptionsBuilder::new()
            .dop(0)
            .pass_threshold(1.5)
            .resolve_with(&env)
            .unwrap_err();

        match err {
            HarnessError::InvalidOptions { violations } => {
                let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
                assert_eq!(violations.len(), 3);
                assert!(fields.contains(&"dop"));
                assert!(fields.contains(&"pass_threshold"));
                assert!(fields.contains(&"iterations"));
            }
            other => panic!("expected InvalidOptions, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_env_values_are_violations_too() {
        let env = env_of(vec![(ENV_STRESS_DOP, "100000")]);
        let err = StressOptionsBuilder::new()
            .resolve_with(&env)
            .unwrap_err();
        match err {
            HarnessError::InvalidOptions { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "dop");
            }
            other => panic!("expected InvalidOptions, got {other:?}"),
        }
    }

    #[test]
    fn bool_tokens_coerce_case_insensitively() {
        for token in ["true", "TRUE", "1", "on", "Yes"] {
            assert_eq!(parse_bool_token(token), Some(true), "token {token}");
        }
        for token in ["false", "0", "OFF", "no"] {
            assert_eq!(parse_bool_token(token), Some(false), "token {token}");
        }
        assert_eq!(parse_bool_token("maybe"), None);
    }

    #[test]
    fn unrecognized_bool_env_token_is_a_violation() {
        let env = env_of(vec![(ENV_DUMP_TO_FILE, "definitely")]);
        let err = SamplerOptionsBuilder::new()
            .root_pid(1234)
            .resolve_with(&env)
            .unwrap_err();
        match err {
            HarnessError::InvalidOptions { violations } => {
                assert_eq!(violations[0].field, "dump_to_file");
            }
            other => panic!("expected InvalidOptions, got {other:?}"),
        }
    }

    #[test]
    fn sampler_env_resolution_covers_every_tunable() {
        let env = env_of(vec![
            (ENV_COLLECTION_INTERVAL_MS, "200"),
            (ENV_INCLUDE_MOVING_AVERAGES, "off"),
            (ENV_DUMP_TO_FILE, "no"),
            (ENV_DUMP_TO_CHART, "yes"),
            (ENV_OUTPUT_DIRECTORY, "/tmp/perf-out"),
            (ENV_PERF_PID, "4321"),
        ]);
        let options = SamplerOptionsBuilder::new().resolve_with(&env).unwrap();
        assert_eq!(options.collection_interval, Duration::from_millis(200));
        assert!(!options.include_moving_averages);
        assert!(!options.dump_to_file);
        assert!(options.dump_to_chart);
        assert_eq!(options.output_directory, PathBuf::from("/tmp/perf-out"));
        assert_eq!(options.root_pid, 4321);
    }

    #[test]
    fn explicit_sampler_arguments_override_env() {
        let env = env_of(vec![
            (ENV_COLLECTION_INTERVAL_MS, "5000"),
            (ENV_INCLUDE_MOVING_AVERAGES, "false"),
            (ENV_DUMP_TO_FILE, "false"),
            (ENV_DUMP_TO_CHART, "false"),
            (ENV_OUTPUT_DIRECTORY, "/tmp/from-env"),
            (ENV_PERF_PID, "1"),
        ]);
        let options = SamplerOptionsBuilder::new()
            .collection_interval_ms(50)
            .include_moving_averages(true)
            .dump_to_file(true)
            .dump_to_chart(true)
            .output_directory("/tmp/explicit")
            .root_pid(777)
            .resolve_with(&env)
            .unwrap();
        assert_eq!(options.collection_interval, Duration::from_millis(50));
        assert!(options.include_moving_averages);
        assert!(options.dump_to_file);
        assert!(options.dump_to_chart);
        assert_eq!(options.output_directory, PathBuf::from("/tmp/explicit"));
        assert_eq!(options.root_pid, 777);
    }

    #[test]
    fn root_pid_falls_back_to_current_process() {
        let options = SamplerOptionsBuilder::new().resolve_with(&no_env).unwrap();
        assert_eq!(options.root_pid, std::process::id() as i32);
    }

    #[test]
    fn suite_type_toggles_parent_subtree_tracking() {
        let env = env_of(vec![(ENV_SUITE_TYPE, "ChildProcess")]);
        let options = SamplerOptionsBuilder::new().resolve_with(&env).unwrap();
        assert!(options.include_parent_subtree);

        let options = SamplerOptionsBuilder::new()
            .include_parent_subtree(false)
            .resolve_with(&env)
            .unwrap();
        assert!(!options.include_parent_subtree);

        let options = SamplerOptionsBuilder::new().resolve_with(&no_env).unwrap();
        assert!(!options.include_parent_subtree);
    }

    #[test]
    fn merge_keeps_defaults_where_overrides_are_absent() {
        let defaults = StressOptions::default();
        let merged = StressOverrides::none()
            .dop(9)
            .merge_over(&defaults)
            .unwrap();
        assert_eq!(merged.dop, 9);
        assert_eq!(merged.runtime_secs, defaults.runtime_secs);
        assert_eq!(merged.iterations, defaults.iterations);
        assert_eq!(merged.pass_threshold, defaults.pass_threshold);
    }

    #[test]
    fn merge_validates_the_combined_options() {
        let defaults = StressOptions::default();
        let err = StressOverrides::none()
            .dop(0)
            .pass_threshold(2.0)
            .merge_over(&defaults)
            .unwrap_err();
        match err {
            HarnessError::InvalidOptions { violations } => assert_eq!(violations.len(), 2),
            other => panic!("expected InvalidOptions, got {other:?}"),
        }
    }
}
