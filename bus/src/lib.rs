mod channel;
mod event;
mod fanout;
mod logging;
pub mod mock;
mod value;
mod variable;

pub use channel::ChannelPublisher;
pub use event::{Event, Inbound};
pub use fanout::Fanout;
pub use logging::LogPublisher;
pub use value::Value;
pub use variable::{MsgPairToVar, VarToMsgPair};

use std::sync::Arc;

/// Outbound side of the message bus.
///
/// Implementations are called from the controller worker threads, so they
/// must be shareable between threads and own whatever synchronization they
/// need.
pub trait Publisher: Send + Sync {
    /// Publishes an event on its topic.
    fn publish(&self, event: Event) -> Result<(), BusError>;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        (**self).publish(event)
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        (**self).publish(event)
    }
}

/// Errors raised while moving messages across the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Nobody is listening on the other end anymore.
    #[error("bus receiver disconnected")]
    Disconnected,

    /// The transport refused or lost the message.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound message could not be understood.
    #[error("malformed message on `{topic}`: {reason}")]
    Malformed { topic: String, reason: String },

    #[error("no handler for topic `{0}`")]
    UnknownTopic(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
