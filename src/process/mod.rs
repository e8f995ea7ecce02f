// src/process/mod.rs

//! Process resource monitor.
//!
//! Samples the live process table every interval, prints a usage table, and
//! raises a `Process` notification for any process that stays above both the
//! CPU and memory thresholds for long enough.

pub mod sampler;

pub use sampler::{AlertTracker, ProcessUsage, SystemSampler};

use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::ProcessSection;
use crate::errors::Result;
use crate::notifier::{Category, SharedNotifier};
use crate::session::CancelToken;
use crate::terminal::{self, QuitListener};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// How one table row should be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMark {
    None,
    OverThreshold,
    Alerted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub usage: ProcessUsage,
    pub mark: RowMark,
}

/// One sampling round's output.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub rows: Vec<Row>,
    /// Processes that crossed the alert duration in this round.
    pub new_alerts: Vec<ProcessUsage>,
}

/// Threshold classification plus every process's overuse streak.
#[derive(Debug)]
pub struct ProcessMonitor {
    cpu_threshold: f64,
    mem_threshold: f64,
    tracker: AlertTracker,
}

impl ProcessMonitor {
    pub fn new(cfg: &ProcessSection) -> Self {
        Self {
            cpu_threshold: cfg.cpu_threshold,
            mem_threshold: cfg.mem_threshold,
            tracker: AlertTracker::new(cfg.alert_after()),
        }
    }

    /// Classify one round of usage figures against the thresholds.
    ///
    /// Rows are sorted by CPU usage, highest first.
    pub fn classify(&mut self, usage: Vec<ProcessUsage>, now: Instant) -> Sample {
        let alive: HashSet<u32> = usage.iter().map(|u| u.pid).collect();
        self.tracker.retain(&alive);

        let mut sample = Sample::default();
        for u in usage {
            let cpu_over = u.cpu_percent > self.cpu_threshold;
            let mem_over = u.mem_percent > self.mem_threshold;

            if self.tracker.observe(u.pid, cpu_over && mem_over, now) {
                sample.new_alerts.push(u.clone());
            }

            let mark = if self.tracker.is_alerted(u.pid) {
                RowMark::Alerted
            } else if cpu_over || mem_over {
                RowMark::OverThreshold
            } else {
                RowMark::None
            };
            sample.rows.push(Row { usage: u, mark });
        }

        sample.rows.sort_by(|a, b| {
            b.usage
                .cpu_percent
                .total_cmp(&a.usage.cpu_percent)
                .then(a.usage.pid.cmp(&b.usage.pid))
        });

        sample
    }

    pub fn cpu_threshold(&self) -> f64 {
        self.cpu_threshold
    }

    pub fn mem_threshold(&self) -> f64 {
        self.mem_threshold
    }
}

/// Format the usage table.
pub fn render_table(rows: &[Row], cpu_threshold: f64, mem_threshold: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<25} {:<10} {:<10}", "PID", "NAME", "CPU(%)", "MEM(%)");

    for row in rows {
        let u = &row.usage;
        let _ = write!(
            out,
            "{:<8} {:<25} {:<10.2} {:<10.2}",
            u.pid, u.name, u.cpu_percent, u.mem_percent
        );
        match row.mark {
            RowMark::None => {}
            RowMark::OverThreshold => out.push_str(" <-- over threshold"),
            RowMark::Alerted => {
                let _ = write!(
                    out,
                    " <-- ALERT: >{cpu_threshold}% CPU and >{mem_threshold}% MEM"
                );
            }
        }
        out.push('\n');
    }
    out
}

/// Run the monitor until `quit` is cancelled or the user presses `q`.
///
/// Blocks the calling thread.
pub fn run_until_quit(
    cfg: &ProcessSection,
    notifier: SharedNotifier,
    quit: CancelToken,
) -> Result<()> {
    let mut sampler = SystemSampler::new();
    let mut monitor = ProcessMonitor::new(cfg);

    let _listener = match QuitListener::spawn(quit.clone()) {
        Ok(listener) => Some(listener),
        Err(err) => {
            warn!(error = %err, "quit listener unavailable; use Ctrl+C to stop");
            None
        }
    };

    info!(
        cpu = cfg.cpu_threshold,
        mem = cfg.mem_threshold,
        interval = ?cfg.sample_interval(),
        "process monitor started"
    );

    // First refresh only establishes the CPU baseline.
    sampler.usage();

    while !quit.sleep(cfg.sample_interval()) {
        let sample = monitor.classify(sampler.usage(), Instant::now());

        for u in &sample.new_alerts {
            notifier.notify(
                Category::Process,
                &format!(
                    "{} (PID {}) above {}% CPU and {}% memory for {}s (CPU {:.2}%, MEM {:.2}%)",
                    u.name,
                    u.pid,
                    monitor.cpu_threshold(),
                    monitor.mem_threshold(),
                    cfg.alert_after_secs,
                    u.cpu_percent,
                    u.mem_percent
                ),
            );
        }

        let table = render_table(&sample.rows, monitor.cpu_threshold(), monitor.mem_threshold());
        let screen = format!(
            "{CLEAR_SCREEN}Monitoring processes in real time. Press 'q' to return to the menu.\n\n{table}"
        );
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "{}", screen.replace('\n', terminal::newline()));
        let _ = stdout.flush();
    }

    debug!("process monitor finished");
    Ok(())
}
