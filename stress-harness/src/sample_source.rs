// stress-harness/src/sample_source.rs
// Instantaneous per-pid and whole-machine counter samples

use crate::error::Result;
use crate::process_tree::WHOLE_COMPUTER_PID;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// One instantaneous counter reading for a process (or the whole machine
/// under the WholeComputer pseudo-pid)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSample {
    pub pid: i32,
    pub parent_pid: i32,
    /// Percentage, 0..100 x cores
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    /// Cumulative user+system cpu time; absent for the machine row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_time_ms: Option<u64>,
    /// Wall-clock time the process (or machine) has been up
    pub elapsed_ms: u64,
    pub timestamp_ms: i64,
}

/// Source of counter samples for a set of pids plus the machine row.
/// Entries for pids that exited between listing and sampling are omitted;
/// callers must tolerate missing pids.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn sample(&mut self, pids: &[i32]) -> Result<Vec<CounterSample>>;
    async fn sample_machine(&mut self) -> Result<CounterSample>;
}

/// sysinfo-backed sample source
pub struct SysinfoSampleSource {
    system: System,
}

impl SysinfoSampleSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoSampleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for SysinfoSampleSource {
    async fn sample(&mut self, pids: &[i32]) -> Result<Vec<CounterSample>> {
        let wanted: Vec<Pid> = pids
            .iter()
            .filter(|pid| **pid > 0)
            .map(|pid| Pid::from_u32(*pid as u32))
            .collect();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&wanted),
            true,
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );

        let now = Utc::now().timestamp_millis();
        Ok(wanted
            .iter()
            .filter_map(|pid| {
                self.system.process(*pid).map(|process| CounterSample {
                    pid: pid.as_u32() as i32,
                    parent_pid: process.parent().map(|p| p.as_u32() as i32).unwrap_or(0),
                    cpu_percent: process.cpu_usage() as f64,
                    memory_bytes: process.memory(),
                    cumulative_time_ms: cumulative_cpu_time_ms(pid.as_u32()),
                    elapsed_ms: process.run_time() * 1000,
                    timestamp_ms: now,
                })
            })
            .collect())
    }

    async fn sample_machine(&mut self) -> Result<CounterSample> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        Ok(CounterSample {
            pid: WHOLE_COMPUTER_PID,
            parent_pid: WHOLE_COMPUTER_PID,
            cpu_percent: self.system.global_cpu_usage() as f64,
            memory_bytes: self.system.used_memory(),
            cumulative_time_ms: None,
            elapsed_ms: System::uptime() * 1000,
            timestamp_ms: Utc::now().timestamp_millis(),
        })
    }
}

/// Cumulative user+system cpu time from `/proc/{pid}/stat`, in
/// milliseconds. Fields 14 (utime) and 15 (stime) are in clock ticks.
#[cfg(target_os = "linux")]
fn cumulative_cpu_time_ms(pid: u32) -> Option<u64> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // The comm field is parenthesized and may contain spaces; split after
    // the closing paren.
    let rest = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // After "(comm)" the next field is state (index 0), so utime/stime
    // land at indices 11 and 12.
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    let ticks_per_sec = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks_per_sec <= 0 {
        return None;
    }
    Some((utime + stime) * 1000 / ticks_per_sec as u64)
}

#[cfg(not(target_os = "linux"))]
fn cumulative_cpu_time_ms(_pid: u32) -> Option<u64> {
    None
}
