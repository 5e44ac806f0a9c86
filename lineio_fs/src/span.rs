//! Optional timing hooks bracketing an operation.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

/// Receiver of span markers. Calls are fire-and-forget.
pub trait SpanHooks: Send + Sync {
    /// The operation is about to issue its main I/O.
    fn async_start(&self, id: &str);
    /// The main I/O finished successfully.
    fn async_end(&self, id: &str);
    /// The operation is about to resolve, successfully or not.
    fn async_done(&self, id: &str);
}

/// A span id bound to the hooks that receive it.
#[derive(Clone, Copy)]
pub struct Span<'a> {
    hooks: &'a dyn SpanHooks,
    id: &'a str,
}

impl<'a> Span<'a> {
    pub fn new(hooks: &'a dyn SpanHooks, id: &'a str) -> Self {
        Span { hooks, id }
    }

    pub fn id(&self) -> &str {
        self.id
    }
}

impl std::fmt::Debug for Span<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({})", self.id)
    }
}

pub(crate) trait SpanExt {
    fn start(&self);
    fn end(&self);
    fn done(&self);
}

impl SpanExt for Option<Span<'_>> {
    fn start(&self) {
        if let Some(span) = self {
            span.hooks.async_start(span.id);
        }
    }

    fn end(&self) {
        if let Some(span) = self {
            span.hooks.async_end(span.id);
        }
    }

    fn done(&self) {
        if let Some(span) = self {
            span.hooks.async_done(span.id);
        }
    }
}

/// [`SpanHooks`] that reports elapsed times as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingSpans {
    started: Mutex<HashMap<String, Instant>>,
}

impl TracingSpans {
    pub fn new() -> Self {
        Self::default()
    }

    fn elapsed_ms(&self, id: &str) -> Option<u128> {
        self.started
            .lock()
            .get(id)
            .map(|start| start.elapsed().as_millis())
    }
}

impl SpanHooks for TracingSpans {
    fn async_start(&self, id: &str) {
        self.started.lock().insert(id.to_string(), Instant::now());
        tracing::trace!(span = id, "async start");
    }

    fn async_end(&self, id: &str) {
        tracing::debug!(span = id, elapsed_ms = ?self.elapsed_ms(id), "async io finished");
    }

    fn async_done(&self, id: &str) {
        let elapsed = self
            .started
            .lock()
            .remove(id)
            .map(|start| start.elapsed().as_millis());
        tracing::debug!(span = id, elapsed_ms = ?elapsed, "async done");
    }
}
