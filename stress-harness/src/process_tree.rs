// stress-harness/src/process_tree.rs
// Process snapshot provider and subtree resolution

use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use sysinfo::{ProcessesToUpdate, System};

/// Pseudo-pid for the synthetic series summing all tracked real processes
pub const TOTALS_PID: i32 = -1;
/// Pseudo-pid for system-wide counters
pub const WHOLE_COMPUTER_PID: i32 = 0;

/// One process as seen in a flat system snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: i32,
    pub parent_pid: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
}

impl ProcessInfo {
    pub fn new(pid: i32, parent_pid: i32, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent_pid,
            name: name.into(),
            bin: None,
            cmd: None,
        }
    }

    /// Synthetic row summing every tracked real process
    pub fn totals() -> Self {
        Self::new(TOTALS_PID, TOTALS_PID, "Totals")
    }

    /// Synthetic row for system-wide counters
    pub fn whole_computer() -> Self {
        Self::new(WHOLE_COMPUTER_PID, WHOLE_COMPUTER_PID, "WholeComputer")
    }
}

/// Source of a full flat process list covering all OS processes
#[async_trait]
pub trait ProcessSnapshotProvider: Send + Sync {
    async fn snapshot(&mut self) -> Result<Vec<ProcessInfo>>;
}

/// sysinfo-backed snapshot provider
pub struct SysinfoSnapshotProvider {
    system: System,
}

impl SysinfoSnapshotProvider {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoSnapshotProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSnapshotProvider for SysinfoSnapshotProvider {
    async fn snapshot(&mut self) -> Result<Vec<ProcessInfo>> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        Ok(self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let cmd = process.cmd();
                ProcessInfo {
                    pid: pid.as_u32() as i32,
                    parent_pid: process.parent().map(|p| p.as_u32() as i32).unwrap_or(0),
                    name: process.name().to_string_lossy().into_owned(),
                    bin: process.exe().map(|p| p.to_path_buf()),
                    cmd: if cmd.is_empty() {
                        None
                    } else {
                        Some(
                            cmd.iter()
                                .map(|arg| arg.to_string_lossy())
                                .collect::<Vec<_>>()
                                .join(" "),
                        )
                    },
                }
            })
            .collect())
    }
}

/// Collect the subtree rooted at `root_pid` from a flat snapshot. With
/// `include_parent_subtree` the traversal is retargeted at the root's
/// parent, pulling in the root's siblings and their descendants. Callers
/// treat the result as a set; traversal order is unspecified.
pub fn resolve_tree(
    snapshot: &[ProcessInfo],
    root_pid: i32,
    include_parent_subtree: bool,
) -> Result<Vec<ProcessInfo>> {
    if root_pid <= 0 {
        return Err(HarnessError::InvalidPid { pid: root_pid });
    }

    let by_pid: HashMap<i32, &ProcessInfo> = snapshot.iter().map(|p| (p.pid, p)).collect();
    let root = by_pid
        .get(&root_pid)
        .ok_or(HarnessError::ProcessNotFound { pid: root_pid })?;

    let mut target = root_pid;
    if include_parent_subtree && root.parent_pid != 0 {
        if !by_pid.contains_key(&root.parent_pid) {
            return Err(HarnessError::ProcessNotFound {
                pid: root.parent_pid,
            });
        }
        target = root.parent_pid;
    }

    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for process in snapshot {
        children.entry(process.parent_pid).or_default().push(process.pid);
    }

    // Iterative traversal; the seen set guards against pid reuse cycles
    // in a torn snapshot.
    let mut collected = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![target];
    while let Some(pid) = stack.pop() {
        if !seen.insert(pid) {
            continue;
        }
        if let Some(info) = by_pid.get(&pid) {
            collected.push((*info).clone());
        }
        if let Some(kids) = children.get(&pid) {
            stack.extend(kids.iter().copied());
        }
    }

    Ok(collected)
}
