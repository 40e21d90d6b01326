use bus::{BusError, Event, Publisher};
use rumqttc::{Client, ClientError, Connection, MqttOptions, QoS};
use std::time::Duration;
use uuid::Uuid;

/// Requests that may wait in the client queue. Once it is full, publishes
/// fail instead of waiting for the connection to drain it.
pub const REQUEST_CAPACITY: usize = 64;

/// Publishes bus events as JSON on MQTT.
///
/// The returned [`Connection`] must be driven (see
/// [`MqttReceiver`](crate::MqttReceiver)) for anything to leave the process.
#[derive(Clone)]
pub struct MqttSender {
    client: Client,
    prefix: String,
}

impl MqttSender {
    pub fn new(
        host: &str,
        port: u16,
        keep_alive: Duration,
        prefix: impl Into<String>,
    ) -> (Self, Connection) {
        let client_id = format!("gpredict-bridge-{}", Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(keep_alive);

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);

        (Self::from_client(client, prefix), connection)
    }

    pub fn from_client(client: Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    /// Sender for one component, publishing under `<prefix>/<component>`.
    pub fn scoped(&self, component: &str) -> Self {
        Self {
            client: self.client.clone(),
            prefix: format!("{}/{}", self.prefix, component),
        }
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn topic(&self, event: &Event) -> String {
        format!("{}/{}", self.prefix, event.topic())
    }

    /// Queues a disconnect without waiting for room in the request queue.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.client.try_disconnect()
    }
}

impl Publisher for MqttSender {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        let topic = self.topic(&event);
        let payload = serde_json::to_vec(&event.payload())?;

        // Never block: the caller is a server worker, and nothing drains the
        // queue while the broker is unreachable.
        self.client
            .try_publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
            .map_err(|e| BusError::Transport(e.to_string()))?;

        log::debug!("published {:?} to {}", event, topic);
        Ok(())
    }
}
