use crate::{BusError, Event, Publisher};

/// Publisher for stations running without a broker: every event becomes an
/// `info` log line tagged with its component.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    component: String,
}

impl LogPublisher {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Publisher for LogPublisher {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        log::info!("[{}] {} {}", self.component, event.topic(), event.payload());
        Ok(())
    }
}
