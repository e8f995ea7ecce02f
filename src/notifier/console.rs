// src/notifier/console.rs

use std::io::{self, Write};

use super::{Category, Notifier};
use crate::terminal;

/// Prints `"<category>: <message>"` lines on STDOUT.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, category: Category, message: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout must not take a session down with it.
        let _ = write!(out, "{category}: {message}{}", terminal::newline());
        let _ = out.flush();
    }
}
