use crate::{BusError, Value};
use serde_json::json;
use tracking::{Degrees, Hertz, MetersPerSecond};

/// Message published by the controllers.
///
/// Every event carries only the new value, never the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Frequency(Hertz),
    TxFrequency(Hertz),
    FrequencyShift(Hertz),
    Azimuth(Degrees),
    Elevation(Degrees),
    AzEl {
        azimuth: Degrees,
        elevation: Degrees,
    },
    Velocity(MetersPerSecond),
    /// Track state (AOS/LOS, elevation threshold or az/el zone).
    State(bool),
    /// A host variable forwarded as a `(name, value)` pair.
    Variable {
        name: String,
        value: Value,
    },
}

impl Event {
    /// Bus topic the event belongs to.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::Frequency(_) => "frequency",
            Event::TxFrequency(_) => "tx_frequency",
            Event::FrequencyShift(_) => "freqshift",
            Event::Azimuth(_) => "az",
            Event::Elevation(_) => "el",
            Event::AzEl { .. } => "az_el",
            Event::Velocity(_) => "velocity",
            Event::State(_) => "state",
            Event::Variable { .. } => "msgout",
        }
    }

    /// JSON body of the event. States travel as `0`/`1`.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Event::Frequency(freq) | Event::TxFrequency(freq) | Event::FrequencyShift(freq) => {
                json!({ "freq": freq })
            }
            Event::Azimuth(az) => json!({ "az": az }),
            Event::Elevation(el) => json!({ "el": el }),
            Event::AzEl { azimuth, elevation } => json!({ "az": azimuth, "el": elevation }),
            Event::Velocity(velocity) => json!({ "velocity": velocity }),
            Event::State(state) => json!({ "state": u8::from(*state) }),
            Event::Variable { name, value } => json!({ "name": name, "value": value }),
        }
    }
}

/// Message received from the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// New relative velocity for the velocity-Doppler controller.
    Velocity(MetersPerSecond),
    /// `(name, value)` pair destined to a host variable.
    Pair { name: String, value: Value },
    /// Raw az/el body for the window gate. Its fields are validated there.
    AzEl(serde_json::Value),
}

impl Inbound {
    /// Decodes the JSON `payload` received on `topic`.
    ///
    /// Velocities may be sent bare (`-1234.5`) or wrapped
    /// (`{"velocity": -1234.5}`); pairs as `{"name": .., "value": ..}` or as a
    /// two element array.
    pub fn decode(topic: &str, payload: &[u8]) -> Result<Self, BusError> {
        let body: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| malformed(topic, e.to_string()))?;

        match topic {
            "velocity" => {
                let velocity = match &body {
                    serde_json::Value::Object(map) => map.get("velocity").and_then(|v| v.as_f64()),
                    other => other.as_f64(),
                };

                velocity
                    .map(Inbound::Velocity)
                    .ok_or_else(|| malformed(topic, "expected a number".to_string()))
            }
            "inpair" => {
                let (name, value) = match body {
                    serde_json::Value::Object(mut map) => (map.remove("name"), map.remove("value")),
                    serde_json::Value::Array(mut items) if items.len() == 2 => {
                        let value = items.pop();
                        (items.pop(), value)
                    }
                    _ => (None, None),
                };

                match (name, value) {
                    (Some(serde_json::Value::String(name)), Some(value)) => {
                        let value = serde_json::from_value(value)
                            .map_err(|e| malformed(topic, e.to_string()))?;
                        Ok(Inbound::Pair { name, value })
                    }
                    _ => Err(malformed(topic, "expected a (name, value) pair".to_string())),
                }
            }
            "az_el" => Ok(Inbound::AzEl(body)),
            other => Err(BusError::UnknownTopic(other.to_string())),
        }
    }
}

fn malformed(topic: &str, reason: String) -> BusError {
    BusError::Malformed {
        topic: topic.to_string(),
        reason,
    }
}
