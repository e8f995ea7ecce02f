// src/ports.rs

//! TCP port-range scanner.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::config::PortsSection;
use crate::errors::{GuardError, Result};

const WELL_KNOWN_SERVICES: &[(u16, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8080, "HTTP-Alt"),
];

pub fn service_name(port: u16) -> Option<&'static str> {
    WELL_KNOWN_SERVICES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Result of probing one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortReport {
    pub port: u16,
    pub open: bool,
    pub service: Option<&'static str>,
}

impl PortReport {
    /// One line for the console, or `None` for closed ports.
    pub fn describe(&self) -> Option<String> {
        if !self.open {
            return None;
        }
        Some(match self.service {
            Some(service) => format!(" [+] Port {} open ({service})", self.port),
            None => format!(
                " [+] Port {} open (uncommon service, possible backdoor!)",
                self.port
            ),
        })
    }
}

/// Check `1 <= start <= end <= 65535`.
pub fn validate_range(start: u32, end: u32) -> Result<(u16, u16)> {
    let invalid = || GuardError::InvalidPortRange { start, end };
    let s = u16::try_from(start).map_err(|_| invalid())?;
    let e = u16::try_from(end).map_err(|_| invalid())?;
    if s == 0 || s > e {
        return Err(invalid());
    }
    Ok((s, e))
}

async fn try_connect(addr: SocketAddr, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(err)) => {
            trace!(%addr, error = %err, "closed");
            false
        }
        Err(_) => {
            trace!(%addr, "timed out");
            false
        }
    }
}

/// Try to connect to every port in `start..=end` on `target`.
///
/// At most `concurrency` connects are in flight; each is bounded by
/// `timeout`. The result has one report per port, ordered by port.
pub async fn scan(
    target: IpAddr,
    start: u32,
    end: u32,
    timeout: Duration,
    concurrency: usize,
) -> Result<Vec<PortReport>> {
    let (start, end) = validate_range(start, end)?;
    debug!(%target, start, end, ?timeout, concurrency, "port scan started");

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for port in start..=end {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|e| anyhow::anyhow!("port scan semaphore closed: {e}"))?;

        set.spawn(async move {
            let open = try_connect(SocketAddr::new(target, port), timeout).await;
            drop(permit);
            PortReport {
                port,
                open,
                service: service_name(port),
            }
        });
    }

    let mut reports = Vec::with_capacity(usize::from(end - start) + 1);
    while let Some(joined) = set.join_next().await {
        let report = joined.map_err(|e| anyhow::anyhow!("port scan task failed: {e}"))?;
        reports.push(report);
    }
    reports.sort_by_key(|r| r.port);

    debug!(open = reports.iter().filter(|r| r.open).count(), "port scan finished");
    Ok(reports)
}

/// Scan with the `[ports]` settings and print the open ports.
pub async fn run_port_scan(cfg: &PortsSection, start: u32, end: u32) -> Result<Vec<PortReport>> {
    let target: IpAddr = cfg.target.parse().map_err(|e| {
        GuardError::ConfigError(format!("invalid [ports].target {:?}: {e}", cfg.target))
    })?;
    validate_range(start, end)?;

    println!("\nScanning TCP ports on {target} from {start} to {end}...\n");

    let reports = scan(target, start, end, cfg.connect_timeout(), cfg.concurrency).await?;
    for line in reports.iter().filter_map(PortReport::describe) {
        println!("{line}");
    }

    println!("\nScan finished.");
    Ok(reports)
}
