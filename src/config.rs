use log::info;
use std::env;
use std::time::Duration;

use crate::sensor::registers::{CycleInterval, ParticleSensor, SensorAddress};
use crate::sensor::session::{SessionOptions, SessionPins};

// BCM numbers of board pins 11, 7 and 8 on the Raspberry Pi header
const DEFAULT_READY_PIN: u8 = 17;
const DEFAULT_LIGHT_INT_PIN: u8 = 4;
const DEFAULT_SOUND_INT_PIN: u8 = 14;
const DEFAULT_I2C_BUS: u8 = 1;

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub database_url: String,
    pub address: SensorAddress,
    pub i2c_bus: u8,
    pub pins: SessionPins,
    pub cycle_interval: CycleInterval,
    pub particle_sensor: Option<ParticleSensor>,
    pub ready_timeout: Option<Duration>,
}

impl SensorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or("DATABASE_URL environment variable not set")?;

        let address = match lookup("METRIFUL_ADDRESS") {
            Some(value) => parse_address(&value)?,
            None => SensorAddress::Open,
        };

        let i2c_bus = match lookup("METRIFUL_I2C_BUS") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| format!("Invalid METRIFUL_I2C_BUS '{}'", value))?,
            None => DEFAULT_I2C_BUS,
        };

        let ready = match lookup("METRIFUL_READY_PIN") {
            Some(value) => parse_pin(&value)?.ok_or("METRIFUL_READY_PIN cannot be disabled")?,
            None => DEFAULT_READY_PIN,
        };
        let light_interrupt = match lookup("METRIFUL_LIGHT_INT_PIN") {
            Some(value) => parse_pin(&value)?,
            None => Some(DEFAULT_LIGHT_INT_PIN),
        };
        let sound_interrupt = match lookup("METRIFUL_SOUND_INT_PIN") {
            Some(value) => parse_pin(&value)?,
            None => Some(DEFAULT_SOUND_INT_PIN),
        };

        let cycle_interval = match lookup("METRIFUL_CYCLE_INTERVAL") {
            Some(value) => parse_cycle_interval(&value)?,
            None => CycleInterval::T3s,
        };

        let particle_sensor = match lookup("METRIFUL_PARTICLE_SENSOR") {
            Some(value) => parse_particle_sensor(&value)?,
            None => None,
        };

        let ready_timeout = match lookup("METRIFUL_READY_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(
                value
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid METRIFUL_READY_TIMEOUT_SECS '{}'", value))?,
            )),
            None => None,
        };

        let config = SensorConfig {
            database_url,
            address,
            i2c_bus,
            pins: SessionPins {
                ready,
                light_interrupt,
                sound_interrupt,
            },
            cycle_interval,
            particle_sensor,
            ready_timeout,
        };

        info!(
            "Sensor at {} on I2C bus {}, READY on GPIO {}",
            config.address, config.i2c_bus, config.pins.ready
        );
        info!(
            "Cycle interval {}, particle sensor {}",
            config.cycle_interval,
            config
                .particle_sensor
                .map(|sensor| sensor.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(config)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ready_timeout: self.ready_timeout,
            ..SessionOptions::default()
        }
    }
}

pub fn parse_address(value: &str) -> Result<SensorAddress, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "open" | "0x71" => Ok(SensorAddress::Open),
        "closed" | "0x70" => Ok(SensorAddress::Closed),
        _ => Err(format!(
            "Invalid METRIFUL_ADDRESS '{}': expected open, closed, 0x70 or 0x71",
            value
        )),
    }
}

/// Parse a BCM pin number; `none` or an empty value means not connected
pub fn parse_pin(value: &str) -> Result<Option<u8>, String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("Invalid GPIO pin '{}'", value))
}

pub fn parse_cycle_interval(value: &str) -> Result<CycleInterval, String> {
    value
        .trim()
        .parse()
        .ok()
        .and_then(CycleInterval::from_secs)
        .ok_or_else(|| format!("Invalid cycle interval '{}': expected 3, 100 or 300", value))
}

pub fn parse_particle_sensor(value: &str) -> Result<Option<ParticleSensor>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "none" => Ok(None),
        "ppd42" => Ok(Some(ParticleSensor::Ppd42)),
        "sds011" => Ok(Some(ParticleSensor::Sds011)),
        _ => Err(format!(
            "Invalid particle sensor '{}': expected none, ppd42 or sds011",
            value
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<SensorConfig, Box<dyn std::error::Error>> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SensorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_only_database_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgresql://localhost/metriful")]).unwrap();

        assert_eq!(config.address, SensorAddress::Open);
        assert_eq!(config.i2c_bus, 1);
        assert_eq!(
            config.pins,
            SessionPins {
                ready: 17,
                light_interrupt: Some(4),
                sound_interrupt: Some(14),
            }
        );
        assert_eq!(config.cycle_interval, CycleInterval::T3s);
        assert_eq!(config.particle_sensor, None);
        assert_eq!(config.session_options().ready_timeout, None);
    }

    #[test]
    fn database_url_is_required() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn reads_all_settings() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/metriful"),
            ("METRIFUL_ADDRESS", "closed"),
            ("METRIFUL_I2C_BUS", "3"),
            ("METRIFUL_READY_PIN", "22"),
            ("METRIFUL_LIGHT_INT_PIN", "none"),
            ("METRIFUL_SOUND_INT_PIN", "27"),
            ("METRIFUL_CYCLE_INTERVAL", "300"),
            ("METRIFUL_PARTICLE_SENSOR", "SDS011"),
            ("METRIFUL_READY_TIMEOUT_SECS", "600"),
        ])
        .unwrap();

        assert_eq!(config.address, SensorAddress::Closed);
        assert_eq!(config.i2c_bus, 3);
        assert_eq!(config.pins.ready, 22);
        assert_eq!(config.pins.light_interrupt, None);
        assert_eq!(config.pins.sound_interrupt, Some(27));
        assert_eq!(config.cycle_interval, CycleInterval::T300s);
        assert_eq!(config.particle_sensor, Some(ParticleSensor::Sds011));
        assert_eq!(
            config.session_options().ready_timeout,
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn ready_pin_cannot_be_disabled() {
        let result = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/metriful"),
            ("METRIFUL_READY_PIN", "none"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(parse_address("0x70"), Ok(SensorAddress::Closed));
        assert_eq!(parse_address(" Open "), Ok(SensorAddress::Open));
        assert!(parse_address("0x72").is_err());
    }

    #[test]
    fn rejects_unsupported_interval() {
        assert_eq!(parse_cycle_interval("100"), Ok(CycleInterval::T100s));
        assert!(parse_cycle_interval("60").is_err());
        assert!(parse_cycle_interval("fast").is_err());
    }

    #[test]
    fn parses_pins() {
        assert_eq!(parse_pin("17"), Ok(Some(17)));
        assert_eq!(parse_pin(""), Ok(None));
        assert!(parse_pin("300").is_err());
    }
}
