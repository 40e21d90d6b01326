use crate::{BusError, Event, Inbound, Publisher, Value};

/// Publishes a host variable as a `(pair_name, value)` message every time it
/// changes.
pub struct VarToMsgPair<P> {
    pair_name: String,
    publisher: P,
}

impl<P: Publisher> VarToMsgPair<P> {
    pub fn new(pair_name: impl Into<String>, publisher: P) -> Self {
        Self {
            pair_name: pair_name.into(),
            publisher,
        }
    }

    pub fn variable_changed(&self, value: impl Into<Value>) -> Result<(), BusError> {
        self.publisher.publish(Event::Variable {
            name: self.pair_name.clone(),
            value: value.into(),
        })
    }
}

/// Applies inbound `(name, value)` messages to a host variable through a
/// callback. The pair name is informative only.
pub struct MsgPairToVar<F> {
    callback: F,
}

impl<F: FnMut(Value)> MsgPairToVar<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }

    /// Feeds a decoded inbound message. Anything but a pair is logged and
    /// dropped.
    pub fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Pair { name, value } => {
                log::debug!("variable pair {} = {}", name, value);
                (self.callback)(value);
            }
            other => log::error!("error with message conversion: not a pair: {:?}", other),
        }
    }

    /// Decodes and feeds a raw `inpair` payload.
    pub fn handle_payload(&mut self, payload: &[u8]) {
        match Inbound::decode("inpair", payload) {
            Ok(message) => self.handle(message),
            Err(e) => log::error!("error with message conversion: {}", e),
        }
    }
}
