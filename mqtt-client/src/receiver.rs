use bus::{BusError, Inbound};
use rumqttc::{Client, ClientError, Connection, Event, Packet, QoS};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

/// Pause after a connection error before polling again.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// An inbound message and the component it is addressed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub component: String,
    pub message: Inbound,
}

/// Drives the MQTT connection and yields decoded inbound messages.
///
/// Iteration ends once the client disconnects or [`stop_flag`] is raised.
/// Connection errors are logged and retried, undecodable messages are logged
/// and skipped.
///
/// [`stop_flag`]: MqttReceiver::stop_flag
pub struct MqttReceiver {
    connection: Connection,
    prefix: String,
    stop: Arc<AtomicBool>,
}

impl MqttReceiver {
    /// Subscribes `client` to every component's inbound topics under
    /// `prefix` and wraps the matching `connection`.
    pub fn subscribe(
        client: &Client,
        connection: Connection,
        prefix: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let prefix = prefix.into();
        client.subscribe(format!("{}/+/in/#", prefix), QoS::AtLeastOnce)?;

        Ok(Self {
            connection,
            prefix,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

impl Iterator for MqttReceiver {
    type Item = Delivery;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stop.load(Ordering::SeqCst) {
            let event = self.connection.iter().next()?;

            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match decode(&self.prefix, &publish.topic, &publish.payload) {
                        Ok(delivery) => return Some(delivery),
                        Err(e) => log::warn!("dropping message on {}: {}", publish.topic, e),
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => log::info!("connected to broker"),
                Ok(other) => log::trace!("mqtt event: {:?}", other),
                Err(e) => {
                    log::error!("mqtt connection error: {}", e);
                    thread::sleep(RECONNECT_DELAY);
                }
            }
        }

        None
    }
}

/// Maps `<prefix>/<component>/in/<topic>` and its JSON body to a
/// [`Delivery`].
pub fn decode(prefix: &str, topic: &str, payload: &[u8]) -> Result<Delivery, BusError> {
    let unknown = || BusError::UnknownTopic(topic.to_string());

    let rest = topic
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(unknown)?;

    let (component, inbound) = rest.split_once("/in/").ok_or_else(unknown)?;
    if component.is_empty() || component.contains('/') {
        return Err(unknown());
    }

    Ok(Delivery {
        component: component.to_string(),
        message: Inbound::decode(inbound, payload)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::Value;

    #[test]
    fn decodes_component_and_topic() {
        assert_eq!(
            decode("gs/station-1", "gs/station-1/velocity/in/velocity", b"-1200.5").unwrap(),
            Delivery {
                component: "velocity".to_string(),
                message: Inbound::Velocity(-1200.5),
            }
        );

        assert_eq!(
            decode(
                "gs/station-1",
                "gs/station-1/vars/in/inpair",
                br#"{"name": "gain", "value": 30}"#
            )
            .unwrap()
            .message,
            Inbound::Pair {
                name: "gain".to_string(),
                value: Value::Int(30),
            }
        );
    }

    #[test]
    fn rejects_foreign_topics() {
        for topic in [
            "gs/station-2/velocity/in/velocity",
            "gs/station-1velocity/in/velocity",
            "gs/station-1/velocity/velocity",
            "gs/station-1//in/velocity",
            "gs/station-1/a/b/in/velocity",
        ] {
            assert!(
                matches!(
                    decode("gs/station-1", topic, b"1.0"),
                    Err(BusError::UnknownTopic(_))
                ),
                "{} should be rejected",
                topic
            );
        }
    }

    #[test]
    fn bad_payload_is_malformed() {
        assert!(matches!(
            decode("gs/x", "gs/x/velocity/in/velocity", b"{"),
            Err(BusError::Malformed { .. })
        ));
    }
}
