use crate::{BusError, Event, Publisher};
use std::sync::Mutex;

/// Publisher that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MockPublisher {
    events: Mutex<Vec<Event>>,
    fail: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose bus is gone: every publish fails, nothing is kept.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Publisher for MockPublisher {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        if self.fail {
            return Err(BusError::Disconnected);
        }

        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);

        Ok(())
    }
}
