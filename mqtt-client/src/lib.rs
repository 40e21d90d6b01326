//! MQTT transport for the bus: outbound events through [`MqttSender`],
//! inbound messages through [`MqttReceiver`].
//!
//! Topics live under a per-station prefix such as `gs/<station>`. Outbound
//! events go to `<prefix>/<component>/<topic>`, inbound messages are read
//! from `<prefix>/<component>/in/<topic>`.

pub mod receiver;
pub mod sender;

pub use receiver::{Delivery, MqttReceiver};
pub use sender::{MqttSender, REQUEST_CAPACITY};
