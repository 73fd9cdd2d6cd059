use std::sync::mpsc;

/// Broadcast when a record set changes. Carries no payload: observers
/// re-read the store they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    TasksChanged,
    LeadsChanged,
}

/// In-process fan-out of change events to any number of subscribers.
#[derive(Debug, Default)]
pub struct ChangeBus {
    subscribers: Vec<mpsc::Sender<ChangeEvent>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Send `event` to every live subscriber, pruning dropped ones
    pub fn publish(&mut self, event: ChangeEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Drain all pending events from a receiver without blocking
pub fn drain(rx: &mpsc::Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    rx.try_iter().collect()
}
