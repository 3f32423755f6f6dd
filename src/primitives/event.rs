//! A simple "auto reset event" (e.g a locked gate whose ticket count is capped to 1). This
//! construct can typically be used to wake a thread up when work is available. An additional
//! guard is also provided to allow for signaling the event when the guard drops (very handy to
//! wait for a group of threads to complete work).
use super::gate::*;
use std::sync::Arc;

/// Trivial auto-reset event wrapping a locked gate.
#[derive(Debug)]
pub struct Event {
    gate: Arc<Gate>,
}

/// Guard shared as an `Arc<Guard>`. Dropping the last reference banks one ticket on the
/// event's gate, waking up whoever waits on the event.
#[derive(Debug)]
pub struct Guard(Arc<Gate>);

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Event {
    #[inline]
    pub fn new() -> Self {
        Event { gate: Arc::new(Gate::new(true)) }
    }

    #[inline]
    pub fn signal(&self) -> () {
        self.gate.unlock_one_under(1);
    }

    #[inline]
    pub fn wait(&self) -> () {
        self.gate.wait();
    }

    #[inline]
    pub fn guard(&self) -> Arc<Guard> {
        Arc::new(Guard(self.gate.clone()))
    }
}

impl Drop for Guard {
    fn drop(&mut self) -> () {
        self.0.unlock_one();
    }
}
