use crate::config::AzElLimitConfig;
use bus::{BusError, Event, Publisher};
use std::sync::Mutex;
use tracking::{AzElLimit, AzElWindow, Degrees};

/// Raises a track state while the antenna points inside an az/el zone.
///
/// The gate sits on the bus rather than on a socket: it is either handed the
/// rotor's events directly (it is itself a [`Publisher`]) or fed raw
/// `{"az": .., "el": ..}` bodies received from the bus. Only the resulting
/// state transitions go downstream.
pub struct AzElGate<P> {
    limit: Mutex<AzElLimit>,
    downstream: P,
    verbose: bool,
}

impl<P: Publisher> AzElGate<P> {
    pub fn new(window: AzElWindow, downstream: P) -> Self {
        Self {
            limit: Mutex::new(AzElLimit::new(window)),
            downstream,
            verbose: false,
        }
    }

    pub fn from_config(config: &AzElLimitConfig, downstream: P) -> Self {
        Self {
            verbose: config.verbose,
            ..Self::new(config.window(), downstream)
        }
    }

    pub fn is_in_track(&self) -> bool {
        self.limit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_in_track()
    }

    /// Feeds one position and publishes the new state if the zone was entered
    /// or left.
    pub fn update(&self, azimuth: Degrees, elevation: Degrees) -> Result<Option<bool>, BusError> {
        let transition = self
            .limit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .update(azimuth, elevation);

        if let Some(in_zone) = transition {
            if self.verbose {
                log::info!(
                    "[azel_limit] az {} el {}: {} zone",
                    azimuth,
                    elevation,
                    if in_zone { "entered" } else { "left" }
                );
            }
            self.downstream.publish(Event::State(in_zone))?;
        }

        Ok(transition)
    }

    /// Feeds a raw bus body. Bodies without numeric `az` and `el` are logged
    /// and dropped.
    pub fn handle_payload(&self, body: &serde_json::Value) {
        let (Some(azimuth), Some(elevation)) = (angle(body, "az"), angle(body, "el")) else {
            log::warn!("[azel_limit] error with az/el message: {}", body);
            return;
        };

        if let Err(e) = self.update(azimuth, elevation) {
            log::warn!("[azel_limit] failed to publish state: {}", e);
        }
    }
}

/// Reads a finite angle from a number or a numeric string.
fn angle(body: &serde_json::Value, key: &str) -> Option<Degrees> {
    let value = match body.get(key)? {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;

    value.is_finite().then_some(value)
}

impl<P: Publisher> Publisher for AzElGate<P> {
    fn publish(&self, event: Event) -> Result<(), BusError> {
        if let Event::AzEl { azimuth, elevation } = event {
            self.update(azimuth, elevation)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::mock::MockPublisher;
    use serde_json::json;
    use std::sync::Arc;

    fn gate(az_min: f64, az_max: f64) -> (AzElGate<Arc<MockPublisher>>, Arc<MockPublisher>) {
        let downstream = Arc::new(MockPublisher::new());
        let gate = AzElGate::new(
            AzElWindow::new(az_min, az_max, 0.0, 90.0),
            downstream.clone(),
        );
        (gate, downstream)
    }

    #[test]
    fn wrapped_window_sequence() {
        let (gate, downstream) = gate(300.0, 40.0);

        for azimuth in [250.0, 310.0, 350.0, 0.0, 20.0, 40.0, 41.0, 100.0, 299.0, 305.0] {
            gate.update(azimuth, 10.0).unwrap();
        }

        assert_eq!(
            downstream.events(),
            vec![Event::State(true), Event::State(false), Event::State(true)]
        );
    }

    #[test]
    fn only_azel_events_drive_the_gate() {
        let (gate, downstream) = gate(90.0, 180.0);

        gate.publish(Event::Azimuth(120.0)).unwrap();
        gate.publish(Event::Elevation(30.0)).unwrap();
        assert!(downstream.events().is_empty());

        gate.publish(Event::AzEl {
            azimuth: 120.0,
            elevation: 30.0,
        })
        .unwrap();
        gate.publish(Event::AzEl {
            azimuth: 121.0,
            elevation: 31.0,
        })
        .unwrap();

        assert_eq!(downstream.events(), vec![Event::State(true)]);
        assert!(gate.is_in_track());
    }

    #[test]
    fn raw_bodies_accept_numbers_and_numeric_strings() {
        let (gate, downstream) = gate(90.0, 180.0);

        gate.handle_payload(&json!({ "az": 95.5, "el": "12" }));
        gate.handle_payload(&json!({ "az": "200", "el": 12 }));

        assert_eq!(
            downstream.events(),
            vec![Event::State(true), Event::State(false)]
        );
    }

    #[test]
    fn malformed_bodies_leave_state_alone() {
        let (gate, downstream) = gate(0.0, 360.0);

        gate.handle_payload(&json!({ "az": 10.0 }));
        gate.handle_payload(&json!({ "az": "north", "el": 10.0 }));
        gate.handle_payload(&json!({ "az": null, "el": 10.0 }));
        gate.handle_payload(&json!([10.0, 10.0]));

        assert!(downstream.events().is_empty());
        assert!(!gate.is_in_track());
    }

    #[test]
    fn failed_publish_still_records_transition() {
        let gate = AzElGate::new(
            AzElWindow::new(0.0, 360.0, 0.0, 90.0),
            MockPublisher::failing(),
        );

        assert!(gate.update(10.0, 10.0).is_err());
        assert!(gate.is_in_track());
        assert_eq!(gate.update(11.0, 11.0).unwrap(), None);
    }
}
