// src/lib.rs

pub mod cli;
pub mod config;
pub mod device;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod menu;
pub mod notifier;
pub mod ports;
pub mod process;
pub mod session;
pub mod terminal;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::ConfigFile;
use crate::errors::GuardError;
use crate::notifier::{ConsoleNotifier, DesktopNotifier, FanoutNotifier, SharedNotifier};
use crate::session::CancelToken;
use crate::terminal::Interrupts;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + CLI overrides
/// - notifier construction (console, optionally desktop)
/// - Ctrl-C routing
/// - dispatch to the menu or a single feature
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = config::resolve(args.config.as_deref().map(Path::new))?;
    apply_overrides(&mut cfg, &args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let notifier = build_notifier(&cfg);
    let app = App {
        cfg,
        notifier,
        interrupts: Interrupts::install(),
        runtime: Handle::current(),
    };

    // Features block on terminal input and OS threads; keep them off the
    // async workers.
    let command = args.command;
    tokio::task::spawn_blocking(move || match command {
        None => menu::run_menu(&app),
        Some(Command::Usb) => app.usb(),
        Some(Command::Processes) => app.processes(),
        Some(Command::Ports { start, end }) => app.ports(start, end).map(|_| ()),
    })
    .await??;

    Ok(())
}

/// Everything a feature needs to run.
pub struct App {
    pub cfg: ConfigFile,
    pub notifier: SharedNotifier,
    pub interrupts: Interrupts,
    pub runtime: Handle,
}

impl App {
    /// USB monitor. Returns once the user quits and every session stopped.
    pub fn usb(&self) -> errors::Result<()> {
        let quit = CancelToken::new();
        let _scope = self.interrupts.scope(&quit);
        engine::run_usb_monitor(&self.cfg, self.notifier.clone(), quit)
    }

    /// Process monitor. Returns once the user quits.
    pub fn processes(&self) -> errors::Result<()> {
        let quit = CancelToken::new();
        let _scope = self.interrupts.scope(&quit);
        process::run_until_quit(&self.cfg.process, self.notifier.clone(), quit)
    }

    /// Port scan over `start..=end`.
    pub fn ports(&self, start: u32, end: u32) -> errors::Result<Vec<ports::PortReport>> {
        self.runtime
            .block_on(ports::run_port_scan(&self.cfg.ports, start, end))
    }
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> errors::Result<()> {
    if let Some(ref root) = args.media_root {
        if root.trim().is_empty() {
            return Err(GuardError::ConfigError(
                "--media-root must not be empty".to_string(),
            ));
        }
        cfg.usb.media_root = PathBuf::from(root);
    }
    if args.desktop_notify {
        cfg.notify.desktop = true;
    }
    Ok(())
}

fn build_notifier(cfg: &ConfigFile) -> SharedNotifier {
    let mut fanout = FanoutNotifier::new().with(Arc::new(ConsoleNotifier));
    if cfg.notify.desktop {
        info!("desktop notifications enabled");
        fanout = fanout.with(Arc::new(DesktopNotifier::spawn(&Handle::current())));
    }
    Arc::new(fanout)
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("mediaguard dry-run");
    println!();

    println!("[usb]");
    println!("  media_root = {}", cfg.usb.media_root.display());
    println!("  poll_interval_ms = {}", cfg.usb.poll_interval_ms);
    println!("  event_backoff_ms = {}", cfg.usb.event_backoff_ms);
    println!("  pending_move_ttl_ms = {}", cfg.usb.pending_move_ttl_ms);
    if !cfg.usb.ignore.is_empty() {
        println!("  ignore = {:?}", cfg.usb.ignore);
    }

    println!("[process]");
    println!("  cpu_threshold = {}", cfg.process.cpu_threshold);
    println!("  mem_threshold = {}", cfg.process.mem_threshold);
    println!("  alert_after_secs = {}", cfg.process.alert_after_secs);
    println!("  sample_interval_ms = {}", cfg.process.sample_interval_ms);

    println!("[ports]");
    println!("  target = {}", cfg.ports.target);
    println!("  connect_timeout_ms = {}", cfg.ports.connect_timeout_ms);
    println!("  concurrency = {}", cfg.ports.concurrency);

    println!("[notify]");
    println!("  desktop = {}", cfg.notify.desktop);

    debug!("dry-run complete (nothing started)");
}
