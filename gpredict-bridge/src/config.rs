use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracking::{AzElWindow, Degrees, Hertz, MetersPerSecond};

pub const DOPPLER_PORT: u16 = 4532;
pub const ROTOR_PORT: u16 = 4533;
pub const VELOCITY_PORT: u16 = 4534;

/// Where a controller listens for the tracking client.
///
/// Port `0` lets the operating system pick one, which is only useful in
/// tests; the bound address is available from the running server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Log every command at `info` instead of `debug`.
    pub verbose: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("empty listen host".to_string()));
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", DOPPLER_PORT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DopplerConfig {
    pub listen: ServerConfig,
}

impl Default for DopplerConfig {
    fn default() -> Self {
        Self {
            listen: ServerConfig::new("127.0.0.1", DOPPLER_PORT),
        }
    }
}

impl DopplerConfig {
    pub fn validate(&self) -> Result<()> {
        self.listen.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotorConfig {
    pub listen: ServerConfig,
    /// Elevation at or above which the target counts as in track.
    pub min_elevation: Degrees,
}

impl Default for RotorConfig {
    fn default() -> Self {
        Self {
            listen: ServerConfig::new("127.0.0.1", ROTOR_PORT),
            min_elevation: 0.0,
        }
    }
}

impl RotorConfig {
    pub fn validate(&self) -> Result<()> {
        self.listen.validate()?;

        if !self.min_elevation.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "minimum elevation must be finite, got {}",
                self.min_elevation
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    pub listen: ServerConfig,
    /// Beacon frequency at zero relative velocity.
    pub known_frequency: Hertz,
    pub initial_velocity: MetersPerSecond,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            listen: ServerConfig::new("127.0.0.1", VELOCITY_PORT),
            known_frequency: 0.0,
            initial_velocity: 0.0,
        }
    }
}

impl VelocityConfig {
    pub fn validate(&self) -> Result<()> {
        self.listen.validate()?;

        if !self.known_frequency.is_finite() || !self.initial_velocity.is_finite() {
            return Err(Error::InvalidConfig(
                "known frequency and initial velocity must be finite".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzElLimitConfig {
    pub az_min: Degrees,
    pub az_max: Degrees,
    pub el_min: Degrees,
    pub el_max: Degrees,
    pub verbose: bool,
}

impl Default for AzElLimitConfig {
    fn default() -> Self {
        Self {
            az_min: 0.0,
            az_max: 360.0,
            el_min: 0.0,
            el_max: 90.0,
            verbose: false,
        }
    }
}

impl AzElLimitConfig {
    pub fn window(&self) -> AzElWindow {
        AzElWindow::new(self.az_min, self.az_max, self.el_min, self.el_max)
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [self.az_min, self.az_max, self.el_min, self.el_max];
        if bounds.iter().any(|bound| !bound.is_finite()) {
            return Err(Error::InvalidConfig(
                "az/el window bounds must be finite".to_string(),
            ));
        }

        if self.el_min > self.el_max {
            return Err(Error::InvalidConfig(format!(
                "elevation minimum {} is above maximum {}",
                self.el_min, self.el_max
            )));
        }

        Ok(())
    }
}
