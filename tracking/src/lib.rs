mod state;
mod window;

pub use state::{AzElLimit, ElevationThreshold, TrackState};
pub use window::{AzElWindow, AzimuthWindow, ElevationRange};

pub type Degrees = f64;
pub type Hertz = f64;
pub type MetersPerSecond = f64;

/// Speed of light used by the Doppler correction, in m/s.
pub const SPEED_OF_LIGHT: MetersPerSecond = 3e8;

/// Angle reported before the tracking software sent a position.
pub const UNKNOWN_ANGLE: Degrees = -9999.0;

/// Frequency received from a transmitter at `frequency` moving at
/// `relative_velocity` along the line of sight.
///
/// The velocity is positive when the satellite moves away from the observer
/// and negative when it approaches, so an approaching satellite is heard
/// above its nominal frequency.
pub fn doppler_shift(frequency: Hertz, relative_velocity: MetersPerSecond) -> Hertz {
    frequency - frequency * (relative_velocity / SPEED_OF_LIGHT)
}
