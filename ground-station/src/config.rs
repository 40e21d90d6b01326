use crate::Result;
use gpredict_bridge::{AzElLimitConfig, DopplerConfig, RotorConfig, VelocityConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Daemon configuration. A missing component section disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ground_station: GroundStationConfig,
    pub mqtt: Option<MqttConfig>,
    /// Host variables mirrored to and from the bus as `(name, value)` pairs.
    #[serde(default)]
    pub variables: Vec<String>,
    pub doppler: Option<DopplerConfig>,
    pub rotor: Option<RotorConfig>,
    pub velocity: Option<VelocityConfig>,
    pub azel_limit: Option<AzElLimitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundStationConfig {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

impl Config {
    /// Loads `path` (any format the `config` crate knows, extension optional)
    /// and overrides it with `GS_` environment variables, using `__` between
    /// nested keys: `GS_MQTT__HOST`, `GS_ROTOR__MIN_ELEVATION`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("GS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ground_station.id.trim().is_empty() {
            return Err(invalid("ground station id is empty"));
        }

        if let Some(doppler) = &self.doppler {
            doppler.validate()?;
        }
        if let Some(rotor) = &self.rotor {
            rotor.validate()?;
        }
        if let Some(velocity) = &self.velocity {
            velocity.validate()?;
        }
        if let Some(azel_limit) = &self.azel_limit {
            azel_limit.validate()?;
        }

        let listeners = [
            self.doppler.as_ref().map(|doppler| &doppler.listen),
            self.rotor.as_ref().map(|rotor| &rotor.listen),
            self.velocity.as_ref().map(|velocity| &velocity.listen),
        ];
        if listeners.into_iter().flatten().any(|listen| listen.port == 0) {
            return Err(invalid("listen ports must be between 1 and 65535"));
        }

        if self.variables.iter().any(|name| name.is_empty() || name.contains('/')) {
            return Err(invalid("variable names must be non-empty and contain no '/'"));
        }

        Ok(())
    }

    /// Topic prefix of this station.
    pub fn topic_prefix(&self) -> String {
        format!("gs/{}", self.ground_station.id)
    }
}

impl MqttConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn invalid(reason: &str) -> crate::Error {
    gpredict_bridge::Error::InvalidConfig(reason.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn load(contents: &str) -> Result<Config> {
        let file = write_config(contents);
        Config::load(file.path().to_str().unwrap())
    }

    #[test]
    fn loads_enabled_sections_only() {
        let config = load(
            r#"
            variables = ["gain"]

            [ground_station]
            id = "lu1esy"

            [mqtt]
            host = "localhost"
            port = 1883
            timeout_seconds = 30

            [rotor]
            min_elevation = 5.0

            [rotor.listen]
            host = "0.0.0.0"
            port = 4533
            verbose = true

            [azel_limit]
            az_min = 300.0
            az_max = 40.0
            el_min = 10.0
            el_max = 80.0
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.topic_prefix(), "gs/lu1esy");
        assert_eq!(config.mqtt.as_ref().unwrap().timeout(), Duration::from_secs(30));
        assert!(config.doppler.is_none());
        assert!(config.velocity.is_none());
        assert_eq!(config.variables, vec!["gain".to_string()]);

        let rotor = config.rotor.unwrap();
        assert_eq!(rotor.min_elevation, 5.0);
        assert_eq!(rotor.listen.address(), "0.0.0.0:4533");
        assert!(rotor.listen.verbose);

        assert!(config.azel_limit.unwrap().window().azimuth.is_wrapped());
    }

    #[test]
    fn empty_section_uses_component_defaults() {
        let config = load(
            r#"
            [ground_station]
            id = "test"

            [velocity]
            known_frequency = 437500000.0
            "#,
        )
        .unwrap();

        let velocity = config.velocity.unwrap();
        assert_eq!(velocity.listen.port, 4534);
        assert_eq!(velocity.initial_velocity, 0.0);
        assert!(config.mqtt.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = load(
            r#"
            [ground_station]
            id = "test"

            [azel_limit]
            el_min = 50.0
            el_max = 20.0
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn port_zero_is_rejected() {
        let config = load(
            r#"
            [ground_station]
            id = "test"

            [doppler.listen]
            port = 0
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            Config::load("/nonexistent/ground-station"),
            Err(crate::Error::Config(_))
        ));
    }
}
