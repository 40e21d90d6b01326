use crate::{BusError, Event, Publisher};
use std::sync::mpsc::Sender;

/// Publisher that hands events to the host through a channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: Sender<Event>,
}

impl ChannelPublisher {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        self.tx.send(event).map_err(|_| BusError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn events_arrive_in_order() {
        let (tx, rx) = mpsc::channel();
        let publisher = ChannelPublisher::new(tx);

        publisher.publish(Event::Frequency(100.0)).unwrap();
        publisher.publish(Event::State(true)).unwrap();

        assert_eq!(rx.recv().unwrap(), Event::Frequency(100.0));
        assert_eq!(rx.recv().unwrap(), Event::State(true));
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let publisher = ChannelPublisher::new(tx);
        assert!(matches!(
            publisher.publish(Event::State(false)),
            Err(BusError::Disconnected)
        ));
    }
}
