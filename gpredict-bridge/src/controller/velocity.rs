use super::{Controller, ignore};
use crate::{
    command::{Command, Grammar, VELOCITY_GRAMMAR},
    config::VelocityConfig,
    session::Context,
};
use bus::{BusError, Event, Publisher};
use std::sync::{Arc, Mutex, MutexGuard};
use tracking::{Hertz, MetersPerSecond, doppler_shift};

#[derive(Debug)]
struct Shift {
    known_frequency: Hertz,
    initial_velocity: MetersPerSecond,
    velocity: MetersPerSecond,
    frequency: Hertz,
}

impl Shift {
    fn new(known_frequency: Hertz, initial_velocity: MetersPerSecond) -> Self {
        Self {
            known_frequency,
            initial_velocity,
            velocity: initial_velocity,
            frequency: doppler_shift(known_frequency, initial_velocity),
        }
    }

    fn reset(&mut self) {
        self.apply(self.initial_velocity);
    }

    /// Stores `velocity` and returns the shifted frequency and the shift.
    fn apply(&mut self, velocity: MetersPerSecond) -> (Hertz, Hertz) {
        self.velocity = velocity;
        self.frequency = doppler_shift(self.known_frequency, velocity);
        self.current()
    }

    fn current(&self) -> (Hertz, Hertz) {
        (self.frequency, self.frequency - self.known_frequency)
    }
}

fn lock(shift: &Mutex<Shift>) -> MutexGuard<'_, Shift> {
    shift.lock().unwrap_or_else(|e| e.into_inner())
}

/// Turns a relative velocity into a Doppler-shifted beacon frequency.
///
/// The velocity can come from the tracking client (`V`) or from the bus
/// through a [`VelocityHandle`]; both update the same value.
#[derive(Debug)]
pub struct VelocityController {
    shift: Arc<Mutex<Shift>>,
}

impl VelocityController {
    pub fn new(known_frequency: Hertz, initial_velocity: MetersPerSecond) -> Self {
        Self {
            shift: Arc::new(Mutex::new(Shift::new(known_frequency, initial_velocity))),
        }
    }

    pub fn from_config(config: &VelocityConfig) -> Self {
        Self::new(config.known_frequency, config.initial_velocity)
    }

    /// Handle for feeding velocities received outside the TCP session.
    pub fn handle(&self) -> VelocityHandle {
        VelocityHandle {
            shift: Arc::clone(&self.shift),
        }
    }
}

impl Controller for VelocityController {
    fn grammar(&self) -> &'static Grammar {
        &VELOCITY_GRAMMAR
    }

    fn on_start(&mut self, publisher: &dyn Publisher) {
        let (frequency, shift) = lock(&self.shift).current();

        for event in [Event::Frequency(frequency), Event::FrequencyShift(shift)] {
            if let Err(e) = publisher.publish(event) {
                log::warn!("[velocity] failed to publish initial frequency: {}", e);
            }
        }
    }

    /// A new client starts from the configured initial velocity. Nothing is
    /// published: the next differing `V` does that.
    fn on_connect(&mut self) {
        lock(&self.shift).reset();
    }

    fn handle(&mut self, command: Command, context: &mut Context<'_>) {
        match command {
            Command::SetVelocity(velocity) => {
                let changed = {
                    let mut state = lock(&self.shift);
                    (velocity != state.velocity).then(|| state.apply(velocity))
                };

                if let Some((frequency, shift)) = changed {
                    log::log!(context.level(), "[velocity] new velocity: {}", velocity);
                    context.publish(Event::Velocity(velocity));
                    context.publish(Event::Frequency(frequency));
                    context.publish(Event::FrequencyShift(shift));
                }
                context.ack();
            }
            Command::GetVelocity => {
                let reply = {
                    let state = lock(&self.shift);
                    format!("v: {:.1} {:.1}\n", state.velocity, state.frequency)
                };
                context.reply(&reply);
            }
            Command::Quit => context.ack(),
            other => ignore(other, context),
        }
    }
}

/// Shared access to a [`VelocityController`] for bus-side updates.
#[derive(Debug, Clone)]
pub struct VelocityHandle {
    shift: Arc<Mutex<Shift>>,
}

impl VelocityHandle {
    /// Applies a velocity received from the bus.
    ///
    /// Unlike `V`, this always publishes, even if the velocity did not change.
    pub fn apply(
        &self,
        velocity: MetersPerSecond,
        publisher: &dyn Publisher,
    ) -> Result<(), BusError> {
        let (frequency, shift) = lock(&self.shift).apply(velocity);

        publisher.publish(Event::Velocity(velocity))?;
        publisher.publish(Event::Frequency(frequency))?;
        publisher.publish(Event::FrequencyShift(shift))
    }

    pub fn velocity(&self) -> MetersPerSecond {
        lock(&self.shift).velocity
    }

    pub fn frequency(&self) -> Hertz {
        lock(&self.shift).frequency
    }
}
