/// A queued event with its emission sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<E> {
    pub seq: u64,
    pub event: E,
}

/// Single-threaded, in-order event queue.
///
/// Producers `emit`; the owner of the event loop `drain`s once per turn. Sequence
/// numbers keep increasing across drains so consumers can detect ordering.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Stamped<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Stamped { seq, event });
        seq
    }

    pub fn pending(&self) -> &[Stamped<E>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Stamped<E>> {
        std::mem::take(&mut self.events)
    }

    /// Drops queued events without delivering them.
    pub fn clear(&mut self) {
        if !self.events.is_empty() {
            tracing::trace!(dropped = self.events.len(), "event bus cleared");
        }
        self.events.clear();
    }
}
