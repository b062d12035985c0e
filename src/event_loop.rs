//! Event loop.
//!
//! A single FIFO with an insertion cursor: events posted while dispatching
//! the current event are spliced in immediately after it, ahead of whatever
//! was already queued, so an event handler that posts further events sees
//! them drained before the loop returns to events queued earlier. Owned by
//! [`crate::driver::Runtime`] rather than kept as a global or thread-local,
//! the same way every piece of mutable state in `harel` is a field on an
//! owned struct instead of a static.

use std::collections::VecDeque;

/// Names that never appear in the `called_events` trace because they are
/// loop-internal signals rather than observable device calls.
const SYSTEM_EVENTS: &[&str] = &["Q_INIT_SIG", "entry", "exit", "noconditionTransition", "break"];

pub fn is_system_event(name: &str) -> bool {
    SYSTEM_EVENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub is_called: bool,
}

#[derive(Debug, Default)]
pub struct EventLoop {
    queue: VecDeque<Event>,
    /// Index right after the event currently being dispatched; new posts are
    /// inserted here, not at the back of the queue.
    cursor: usize,
    called_events: Vec<String>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `name` for dispatch. `is_called` marks it as an observable
    /// "called" event, recorded in [`EventLoop::called_events`] unless it is
    /// a system event.
    pub fn post(&mut self, name: impl Into<String>, is_called: bool) {
        let name = name.into();
        if is_called && !is_system_event(&name) {
            self.called_events.push(name.clone());
        }
        self.queue.insert(self.cursor, Event { name, is_called });
        self.cursor += 1;
    }

    /// Pops the next event to dispatch and resets the insertion cursor to
    /// just past it, so events it posts during dispatch jump the line ahead
    /// of anything queued before this call.
    pub fn next(&mut self) -> Option<Event> {
        let event = self.queue.pop_front()?;
        self.cursor = 0;
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.cursor = 0;
    }

    pub fn called_events(&self) -> &[String] {
        &self.called_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_for_independently_posted_events() {
        let mut loop_ = EventLoop::new();
        loop_.post("a", false);
        loop_.post("b", false);
        assert_eq!(loop_.next().unwrap().name, "a");
        assert_eq!(loop_.next().unwrap().name, "b");
        assert!(loop_.next().is_none());
    }

    #[test]
    fn events_posted_mid_dispatch_jump_ahead_of_older_queued_events() {
        let mut loop_ = EventLoop::new();
        loop_.post("a", false);
        loop_.post("b", false);
        loop_.post("c", false);

        let first = loop_.next().unwrap();
        assert_eq!(first.name, "a");
        // Dispatching "a" posts "x" and "y" — they should run before "b"/"c".
        loop_.post("x", false);
        loop_.post("y", false);

        let order: Vec<String> = std::iter::from_fn(|| loop_.next()).map(|e| e.name).collect();
        assert_eq!(order, vec!["x", "y", "b", "c"]);
    }

    #[test]
    fn called_events_trace_excludes_system_events() {
        let mut loop_ = EventLoop::new();
        loop_.post("entry", true);
        loop_.post("impulseA", true);
        assert_eq!(loop_.called_events(), &["impulseA".to_string()]);
    }
}
