use crate::{Error, Result, config::Config};
use bus::{Fanout, Inbound, LogPublisher, MsgPairToVar, Publisher, Value, VarToMsgPair};
use gpredict_bridge::{
    AzElGate, DopplerController, RotorController, Server, VelocityController, VelocityHandle,
};
use mqtt_client::{Delivery, MqttReceiver, MqttSender};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

type Gate = AzElGate<Arc<dyn Publisher>>;
type HostVariable = MsgPairToVar<Box<dyn FnMut(Value) + Send>>;

/// The running controllers of one ground station and their bus wiring.
pub struct Station {
    servers: Vec<Server>,
    mqtt: Option<MqttLink>,
}

struct MqttLink {
    sender: MqttSender,
    stop: Arc<AtomicBool>,
    inbound: Option<JoinHandle<()>>,
}

impl Station {
    /// Starts every configured component. If one fails, the ones already
    /// running are stopped again.
    pub fn start(config: &Config) -> Result<Self> {
        let (sender, connection) = match &config.mqtt {
            Some(mqtt) => {
                log::info!("MQTT: {}:{}", mqtt.host, mqtt.port);
                let (sender, connection) =
                    MqttSender::new(&mqtt.host, mqtt.port, mqtt.timeout(), config.topic_prefix());
                (Some(sender), Some(connection))
            }
            None => {
                log::info!("no MQTT broker configured, events are only logged");
                (None, None)
            }
        };

        let publisher_for = |component: &str| -> Arc<dyn Publisher> {
            match &sender {
                Some(sender) => Arc::new(sender.scoped(component)),
                None => Arc::new(LogPublisher::new(component)),
            }
        };

        let mut router = Router::default();
        let mut servers = Vec::new();

        let gate = config.azel_limit.as_ref().map(|azel_limit| {
            log::info!("az/el limit: {:?}", azel_limit.window());
            Arc::new(Gate::from_config(azel_limit, publisher_for("azel_limit")))
        });
        router.gate = gate.clone();

        if let Some(doppler) = &config.doppler {
            servers.push(Server::start(
                &doppler.listen,
                DopplerController::new(),
                publisher_for("doppler"),
            )?);
        }

        if let Some(rotor) = &config.rotor {
            let publisher: Arc<dyn Publisher> = match &gate {
                Some(gate) => Arc::new(
                    Fanout::new()
                        .with(publisher_for("rotor"))
                        .with(gate.clone()),
                ),
                None => publisher_for("rotor"),
            };

            servers.push(Server::start(
                &rotor.listen,
                RotorController::new(rotor.min_elevation),
                publisher,
            )?);
        }

        if let Some(velocity) = &config.velocity {
            let controller = VelocityController::from_config(velocity);
            router.velocity = Some((controller.handle(), publisher_for("velocity")));

            servers.push(Server::start(
                &velocity.listen,
                controller,
                publisher_for("velocity"),
            )?);
        }

        for name in &config.variables {
            router
                .variables
                .insert(name.clone(), host_variable(name, publisher_for(name)));
        }

        let mqtt = match (sender, connection) {
            (Some(sender), Some(connection)) => {
                let receiver =
                    MqttReceiver::subscribe(&sender.client(), connection, config.topic_prefix())?;
                let stop = receiver.stop_flag();

                let inbound = thread::Builder::new()
                    .name("mqtt-inbound".to_string())
                    .spawn(move || {
                        for delivery in receiver {
                            router.route(delivery);
                        }
                        log::debug!("inbound MQTT loop finished");
                    })
                    .map_err(|source| Error::Spawn {
                        name: "mqtt-inbound",
                        source,
                    })?;

                Some(MqttLink {
                    sender,
                    stop,
                    inbound: Some(inbound),
                })
            }
            _ => None,
        };

        if servers.is_empty() && gate.is_none() {
            log::warn!("no component enabled");
        }

        Ok(Self { servers, mqtt })
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Leaves the broker, stops every server, then waits for the inbound
    /// loop.
    pub fn stop(&mut self) {
        if let Some(mqtt) = &self.mqtt {
            mqtt.stop.store(true, Ordering::SeqCst);
            if let Err(e) = mqtt.sender.disconnect() {
                log::debug!("MQTT disconnect failed: {}", e);
            }
        }

        for server in &mut self.servers {
            server.stop();
        }

        if let Some(mqtt) = &mut self.mqtt {
            if let Some(inbound) = mqtt.inbound.take() {
                if inbound.join().is_err() {
                    log::error!("inbound MQTT thread panicked");
                }
            }
        }
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A host variable: inbound pairs set it, and every new value is published
/// back as a pair under the same name.
fn host_variable(name: &str, publisher: Arc<dyn Publisher>) -> HostVariable {
    let outbound = VarToMsgPair::new(name, publisher);
    let name = name.to_string();

    let callback: Box<dyn FnMut(Value) + Send> = Box::new(move |value| {
        log::info!("variable {} set to {}", name, value);
        if let Err(e) = outbound.variable_changed(value) {
            log::warn!("failed to publish variable {}: {}", name, e);
        }
    });

    MsgPairToVar::new(callback)
}

/// Hands inbound bus messages to the component they are addressed to.
#[derive(Default)]
struct Router {
    velocity: Option<(VelocityHandle, Arc<dyn Publisher>)>,
    gate: Option<Arc<Gate>>,
    variables: HashMap<String, HostVariable>,
}

impl Router {
    fn route(&mut self, delivery: Delivery) {
        let Delivery { component, message } = delivery;

        match (component.as_str(), message) {
            ("velocity", Inbound::Velocity(velocity)) => match &self.velocity {
                Some((handle, publisher)) => {
                    if let Err(e) = handle.apply(velocity, &**publisher) {
                        log::warn!("[velocity] failed to publish bus velocity: {}", e);
                    }
                }
                None => log::warn!("velocity received but the controller is disabled"),
            },
            ("azel_limit", Inbound::AzEl(body)) => match &self.gate {
                Some(gate) => gate.handle_payload(&body),
                None => log::warn!("az/el received but the limit is disabled"),
            },
            (name, message @ Inbound::Pair { .. }) => match self.variables.get_mut(name) {
                Some(variable) => variable.handle(message),
                None => log::warn!("no variable named {}", name),
            },
            (component, message) => {
                log::warn!("no handler for {:?} on {}", message, component)
            }
        }
    }
}
