use crate::{BusError, Event, Publisher};
use std::sync::Arc;

/// Publishes every event to several downstream publishers, in order.
///
/// All of them receive the event even if an earlier one fails; the first
/// error is returned.
#[derive(Default, Clone)]
pub struct Fanout {
    targets: Vec<Arc<dyn Publisher>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Publisher>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Publisher for Fanout {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        let mut result = Ok(());

        for target in &self.targets {
            if let Err(e) = target.publish(event.clone()) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }
}
