// src/terminal.rs

//! Controlling-terminal plumbing for the interactive features.
//!
//! - [`RawModeGuard`] puts the terminal in raw mode and restores it on drop.
//! - [`QuitListener`] reads key events on its own thread and cancels a
//!   [`CancelToken`] on `q`, `Q` or Ctrl+C.
//! - [`Interrupts`] routes SIGINT to whichever feature is currently running.

use std::io::{self, IsTerminal};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};
use tracing::{debug, trace, warn};

use crate::session::CancelToken;

/// How long one `event::poll` may block before the listener re-checks its
/// tokens.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// `q`, `Q`, or Ctrl+C. Raw mode swallows SIGINT, so Ctrl+C arrives here as
/// a key.
pub fn is_quit_event(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') | KeyCode::Char('C') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Line terminator for text printed while a feature runs.
///
/// Raw mode turns off output post-processing, so a bare `\n` would not
/// return the cursor to column 0.
pub fn newline() -> &'static str {
    if is_raw_mode_enabled().unwrap_or(false) {
        "\r\n"
    } else {
        "\n"
    }
}

/// Raw mode for the guard's lifetime.
///
/// A no-op when STDIN is not a terminal.
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    pub fn new() -> Self {
        if !io::stdin().is_terminal() {
            debug!("stdin is not a terminal; leaving its mode alone");
            return Self { enabled: false };
        }

        match enable_raw_mode() {
            Ok(()) => Self { enabled: true },
            Err(err) => {
                warn!(error = %err, "failed to enable raw mode");
                Self { enabled: false }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for RawModeGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(err) = disable_raw_mode() {
                warn!(error = %err, "could not restore terminal mode");
            }
        }
    }
}

/// Background thread cancelling `quit` once the user presses a quit key.
///
/// Dropping the listener stops and joins the thread, then restores the
/// terminal.
pub struct QuitListener {
    done: CancelToken,
    handle: Option<JoinHandle<()>>,
    _mode: RawModeGuard,
}

impl QuitListener {
    pub fn spawn(quit: CancelToken) -> io::Result<Self> {
        let mode = RawModeGuard::new();
        let done = CancelToken::new();

        // Without a terminal there are no key events to wait for.
        let handle = if mode.is_enabled() {
            let done = done.clone();
            Some(
                thread::Builder::new()
                    .name("quit-listener".to_string())
                    .spawn(move || listen(quit, done))?,
            )
        } else {
            None
        };

        Ok(Self {
            done,
            handle,
            _mode: mode,
        })
    }
}

impl Drop for QuitListener {
    fn drop(&mut self) {
        self.done.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("quit listener thread panicked");
            }
        }
    }
}

fn listen(quit: CancelToken, done: CancelToken) {
    debug!("quit listener started");
    while !quit.is_cancelled() && !done.is_cancelled() {
        match event::poll(POLL_TIMEOUT) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                warn!(error = %err, "polling terminal events failed; quit key disabled");
                return;
            }
        }

        match event::read() {
            Ok(Event::Key(key)) if is_quit_event(&key) => {
                debug!(code = ?key.code, "quit key pressed");
                quit.cancel();
                return;
            }
            Ok(other) => trace!(event = ?other, "ignoring terminal event"),
            Err(err) => {
                warn!(error = %err, "reading terminal events failed; quit key disabled");
                return;
            }
        }
    }
}

/// Routes SIGINT to the feature currently running.
///
/// While a feature holds an [`InterruptScope`], SIGINT cancels its token so
/// it can shut down cleanly (sessions joined, terminal restored). Outside a
/// scope, SIGINT exits the process.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    current: Arc<Mutex<Option<CancelToken>>>,
}

impl Interrupts {
    /// Install the SIGINT handler on the current tokio runtime.
    pub fn install() -> Self {
        let interrupts = Self::default();
        let current = Arc::clone(&interrupts.current);

        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                let token = current.lock().ok().and_then(|guard| guard.clone());
                match token {
                    Some(token) => {
                        debug!("Ctrl+C: cancelling running feature");
                        token.cancel();
                    }
                    None => {
                        eprintln!();
                        std::process::exit(130);
                    }
                }
            }
        });

        interrupts
    }

    /// Route SIGINT to `token` until the returned scope is dropped.
    pub fn scope(&self, token: &CancelToken) -> InterruptScope {
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(token.clone());
        }
        InterruptScope {
            current: Arc::clone(&self.current),
        }
    }
}

pub struct InterruptScope {
    current: Arc<Mutex<Option<CancelToken>>>,
}

impl Drop for InterruptScope {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn q_in_either_case_quits() {
        assert!(is_quit_event(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_event(&key(KeyCode::Char('Q'), KeyModifiers::SHIFT)));
    }

    #[test]
    fn ctrl_c_quits_in_raw_mode() {
        assert!(is_quit_event(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(is_quit_event(&key(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT
        )));
    }

    #[test]
    fn other_keys_do_not_quit() {
        assert!(!is_quit_event(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_event(&key(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert!(!is_quit_event(&key(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!is_quit_event(&key(KeyCode::Esc, KeyModifiers::NONE)));
    }

    #[test]
    fn key_release_is_ignored() {
        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!is_quit_event(&release));
    }

    #[test]
    fn scope_routes_and_clears() {
        let interrupts = Interrupts::default();
        let token = CancelToken::new();
        {
            let _scope = interrupts.scope(&token);
            assert!(interrupts.current.lock().unwrap().is_some());
        }
        assert!(interrupts.current.lock().unwrap().is_none());
    }
}
