// src/process/sampler.rs

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use sysinfo::{ProcessesToUpdate, System};

/// Resource usage of one process over the last sample interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

/// Live process table backed by `sysinfo`.
///
/// CPU usage is measured between two refreshes, so the first call after
/// construction reports 0 % for every process.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Refresh the process list and total memory, then report each process.
    #[allow(clippy::cast_precision_loss)]
    pub fn usage(&mut self) -> Vec<ProcessUsage> {
        self.system.refresh_memory();
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let total_memory = self.system.total_memory();

        self.system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessUsage {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: f64::from(process.cpu_usage()),
                mem_percent: if total_memory > 0 {
                    process.memory() as f64 / total_memory as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSampler")
            .field("processes", &self.system.processes().len())
            .finish()
    }
}

/// Tracks how long each process has been above both thresholds.
///
/// Fires once per continuous overuse streak; dropping below either threshold
/// re-arms the alert.
#[derive(Debug, Clone)]
pub struct AlertTracker {
    alert_after: Duration,
    over_since: HashMap<u32, Instant>,
    alerted: HashSet<u32>,
}

impl AlertTracker {
    pub fn new(alert_after: Duration) -> Self {
        Self {
            alert_after,
            over_since: HashMap::new(),
            alerted: HashSet::new(),
        }
    }

    /// Record one observation. Returns `true` exactly when an alert should
    /// be raised now.
    pub fn observe(&mut self, pid: u32, over: bool, now: Instant) -> bool {
        if !over {
            self.over_since.remove(&pid);
            self.alerted.remove(&pid);
            return false;
        }

        let since = *self.over_since.entry(pid).or_insert(now);
        if now.duration_since(since) >= self.alert_after && !self.alerted.contains(&pid) {
            self.alerted.insert(pid);
            return true;
        }
        false
    }

    pub fn is_alerted(&self, pid: u32) -> bool {
        self.alerted.contains(&pid)
    }

    /// Forget processes that no longer exist.
    pub fn retain(&mut self, alive: &HashSet<u32>) {
        self.over_since.retain(|pid, _| alive.contains(pid));
        self.alerted.retain(|pid| alive.contains(pid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_sample_includes_this_process() {
        let mut sampler = SystemSampler::new();
        let usage = sampler.usage();

        let me = std::process::id();
        let row = usage
            .iter()
            .find(|u| u.pid == me)
            .expect("current process missing from sample");
        assert!(!row.name.is_empty());
        assert!(row.mem_percent > 0.0 && row.mem_percent <= 100.0);
        assert!(row.cpu_percent >= 0.0);
    }

    #[test]
    fn alert_fires_once_per_streak_and_rearms() {
        let start = Instant::now();
        let mut tracker = AlertTracker::new(Duration::from_secs(10));

        assert!(!tracker.observe(1, true, start));
        assert!(!tracker.observe(1, true, start + Duration::from_secs(5)));
        assert!(tracker.observe(1, true, start + Duration::from_secs(10)));
        assert!(tracker.is_alerted(1));
        assert!(!tracker.observe(1, true, start + Duration::from_secs(11)));

        assert!(!tracker.observe(1, false, start + Duration::from_secs(12)));
        assert!(!tracker.is_alerted(1));
        assert!(!tracker.observe(1, true, start + Duration::from_secs(13)));
        assert!(tracker.observe(1, true, start + Duration::from_secs(23)));
    }

    #[test]
    fn retain_drops_exited_processes() {
        let now = Instant::now();
        let mut tracker = AlertTracker::new(Duration::ZERO);
        assert!(tracker.observe(3, true, now));

        tracker.retain(&HashSet::new());
        assert!(!tracker.is_alerted(3));
        assert!(tracker.observe(3, true, now));
    }
}
