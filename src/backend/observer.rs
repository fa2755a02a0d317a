//! Diagnostic hooks around every call of a [`Server`](crate::backend::rest::Server).

use crate::{api::error::Error, backend::config::Operation};
use std::{io::Write, sync::Mutex};

/// Sees the raw outcome of each call. Both hooks default to doing nothing.
pub trait Observer: Send + Sync {
    /// Called with the body of every successful response.
    fn on_response(&self, _operation: Operation, _body: &[u8]) {}

    /// Called with every failed call.
    fn on_error(&self, _operation: Operation, _error: &Error) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Writes every response as indented JSON.
pub struct PrettyPrinter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> PrettyPrinter<W> {
    pub fn new(out: W) -> Self {
        PrettyPrinter {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn print(&self, text: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(out, "{}", text) {
            tracing::warn!(%err, "pretty printer could not write");
        }
    }
}

impl PrettyPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        PrettyPrinter::new(std::io::stdout())
    }
}

impl<W: Write + Send> Observer for PrettyPrinter<W> {
    fn on_response(&self, _operation: Operation, body: &[u8]) {
        let text = serde_json::from_slice::<serde_json::Value>(body)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
        self.print(&text);
    }

    fn on_error(&self, operation: Operation, error: &Error) {
        self.print(&format!("{:?} failed: {}", operation, error));
    }
}
