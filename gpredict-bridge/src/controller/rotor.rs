use super::{Controller, ignore};
use crate::{
    command::{Command, Grammar, ROTOR_GRAMMAR},
    session::Context,
};
use bus::Event;
use tracking::{Degrees, ElevationThreshold, UNKNOWN_ANGLE};

/// Antenna side of the tracking client.
///
/// Position is forgotten on every new connection. The elevation-derived
/// track state is not, so a reconnect mid-pass does not emit a second AOS.
#[derive(Debug)]
pub struct RotorController {
    azimuth: Degrees,
    elevation: Degrees,
    threshold: ElevationThreshold,
}

impl RotorController {
    pub fn new(min_elevation: Degrees) -> Self {
        Self {
            azimuth: UNKNOWN_ANGLE,
            elevation: UNKNOWN_ANGLE,
            threshold: ElevationThreshold::new(min_elevation),
        }
    }

    pub fn position(&self) -> (Degrees, Degrees) {
        (self.azimuth, self.elevation)
    }

    pub fn is_in_track(&self) -> bool {
        self.threshold.is_in_track()
    }

    fn set_position(&mut self, azimuth: Degrees, elevation: Degrees, context: &mut Context<'_>) {
        let azimuth_changed = azimuth != self.azimuth;
        let elevation_changed = elevation != self.elevation;

        if azimuth_changed {
            log::log!(context.level(), "[rotor] new azimuth: {}", azimuth);
            self.azimuth = azimuth;
            context.publish(Event::Azimuth(azimuth));
        }

        if elevation_changed {
            log::log!(context.level(), "[rotor] new elevation: {}", elevation);
            self.elevation = elevation;
            context.publish(Event::Elevation(elevation));
        }

        if azimuth_changed || elevation_changed {
            context.publish(Event::AzEl { azimuth, elevation });
        }

        if elevation_changed {
            if let Some(in_track) = self.threshold.update(elevation) {
                log::info!(
                    "[rotor] elevation {} crossed {}, in track: {}",
                    elevation,
                    self.threshold.minimum(),
                    in_track
                );
                context.publish(Event::State(in_track));
            }
        }
    }
}

impl Controller for RotorController {
    fn grammar(&self) -> &'static Grammar {
        &ROTOR_GRAMMAR
    }

    fn on_connect(&mut self) {
        self.azimuth = UNKNOWN_ANGLE;
        self.elevation = UNKNOWN_ANGLE;
    }

    fn handle(&mut self, command: Command, context: &mut Context<'_>) {
        match command {
            Command::SetPosition { azimuth, elevation } => {
                self.set_position(azimuth, elevation, context);
                context.ack();
            }
            Command::GetPosition => {
                context.reply(&format!("p: {:.1} {:.1}\n", self.azimuth, self.elevation))
            }
            Command::Split => context.ack(),
            Command::Quit => {}
            other => ignore(other, context),
        }
    }
}
