/// Register map and wire-level enumerations of the Metriful MS430
use std::fmt;

use crate::sensor::format::FixedPointFormat;
use crate::sensor::frame::WireEnum;

/// I2C address, selected by the solder bridge on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorAddress {
    /// Solder bridge open (factory default)
    Open,
    /// Solder bridge closed
    Closed,
}

impl SensorAddress {
    pub const fn value(self) -> u8 {
        match self {
            SensorAddress::Open => 0x71,
            SensorAddress::Closed => 0x70,
        }
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.value())
    }
}

// Settings registers
pub const PARTICLE_SENSOR_SELECT_REG: u8 = 0x07;
pub const LIGHT_INTERRUPT_ENABLE_REG: u8 = 0x81;
pub const LIGHT_INTERRUPT_THRESHOLD_REG: u8 = 0x82;
pub const LIGHT_INTERRUPT_TYPE_REG: u8 = 0x83;
pub const LIGHT_INTERRUPT_POLARITY_REG: u8 = 0x84;
pub const SOUND_INTERRUPT_ENABLE_REG: u8 = 0x85;
pub const SOUND_INTERRUPT_THRESHOLD_REG: u8 = 0x86;
pub const SOUND_INTERRUPT_TYPE_REG: u8 = 0x87;
pub const CYCLE_TIME_PERIOD_REG: u8 = 0x89;

// Executable commands
pub const ON_DEMAND_MEASURE_CMD: u8 = 0xE1;
pub const RESET_CMD: u8 = 0xE2;
pub const CYCLE_MODE_CMD: u8 = 0xE4;
pub const STANDBY_MODE_CMD: u8 = 0xE5;
pub const LIGHT_INTERRUPT_CLR_CMD: u8 = 0xE6;
pub const SOUND_INTERRUPT_CLR_CMD: u8 = 0xE7;

// Whole-category data reads
pub const AIR_DATA_READ: u8 = 0x10;
pub const AIR_DATA_BYTES: usize = 12;
pub const AIR_QUALITY_DATA_READ: u8 = 0x11;
pub const AIR_QUALITY_DATA_BYTES: usize = 10;
pub const LIGHT_DATA_READ: u8 = 0x12;
pub const LIGHT_DATA_BYTES: usize = 5;
pub const SOUND_DATA_READ: u8 = 0x13;
pub const SOUND_DATA_BYTES: usize = 18;
pub const SOUND_FREQ_BANDS: usize = 6;
pub const PARTICLE_DATA_READ: u8 = 0x14;
pub const PARTICLE_DATA_BYTES: usize = 6;

// Setting value formats
pub const LIGHT_THRESHOLD_FORMAT: FixedPointFormat = FixedPointFormat::unsigned(2, 2);
pub const SOUND_THRESHOLD_FORMAT: FixedPointFormat = FixedPointFormat::unsigned(2, 0);

pub const INTERRUPT_DISABLED: u8 = 0;
pub const INTERRUPT_ENABLED: u8 = 1;
pub const PARTICLE_SENSOR_OFF: u8 = 0;

/// Declares a fieldless enum together with its byte encoding and the
/// symbolic name used when it is logged or persisted.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $($(#[$vmeta:meta])* $variant:ident = $byte:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl WireEnum for $name {
            const KIND: &'static str = $kind;

            fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn to_byte(self) -> u8 {
                match self {
                    $($name::$variant => $byte,)+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

wire_enum! {
    /// Sampling period used in cycle mode.
    pub enum CycleInterval ("cycle interval") {
        T3s = 0 => "T_3_S",
        T100s = 1 => "T_100_S",
        T300s = 2 => "T_300_S",
    }
}

impl CycleInterval {
    pub fn from_secs(secs: u64) -> Option<Self> {
        match secs {
            3 => Some(CycleInterval::T3s),
            100 => Some(CycleInterval::T100s),
            300 => Some(CycleInterval::T300s),
            _ => None,
        }
    }
}

wire_enum! {
    /// Interrupt output behaviour.
    pub enum InterruptType ("interrupt type") {
        /// Stays asserted until cleared with a command.
        Latch = 0 => "LATCH",
        /// Follows the comparison and clears itself.
        Comparator = 1 => "COMPARATOR",
    }
}

wire_enum! {
    /// Light interrupt trigger direction.
    pub enum InterruptPolarity ("interrupt polarity") {
        /// Trigger when illuminance rises above the threshold.
        Positive = 0 => "POSITIVE",
        /// Trigger when illuminance falls below the threshold.
        Negative = 1 => "NEGATIVE",
    }
}

wire_enum! {
    /// External particle sensor attached to the board.
    pub enum ParticleSensor ("particle sensor") {
        Ppd42 = 1 => "PPD42",
        Sds011 = 2 => "SDS011",
    }
}

impl ParticleSensor {
    /// Unit of the concentration reported for this sensor.
    pub const fn unit(self) -> &'static str {
        match self {
            ParticleSensor::Ppd42 => "ppL",
            ParticleSensor::Sds011 => "ug/m3",
        }
    }
}

wire_enum! {
    pub enum AqiAccuracy ("AQI accuracy") {
        Invalid = 0 => "INVALID",
        Low = 1 => "LOW",
        Medium = 2 => "MEDIUM",
        High = 3 => "HIGH",
    }
}

wire_enum! {
    pub enum SoundStability ("sound stability") {
        Unstable = 0 => "UNSTABLE",
        Stable = 1 => "STABLE",
    }
}

wire_enum! {
    pub enum ParticleValidity ("particle validity") {
        Invalid = 0 => "INVALID",
        Valid = 1 => "VALID",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_match_solder_bridge() {
        assert_eq!(SensorAddress::Open.value(), 0x71);
        assert_eq!(SensorAddress::Closed.value(), 0x70);
        assert_eq!(SensorAddress::Closed.to_string(), "0x70");
    }

    #[test]
    fn wire_enums_map_bytes_both_ways() {
        assert_eq!(CycleInterval::from_byte(2), Some(CycleInterval::T300s));
        assert_eq!(CycleInterval::T100s.to_byte(), 1);
        assert_eq!(ParticleSensor::from_byte(0), None);
        assert_eq!(ParticleSensor::Sds011.to_byte(), 2);
        assert_eq!(AqiAccuracy::from_byte(4), None);
        assert_eq!(InterruptType::Comparator.name(), "COMPARATOR");
        assert_eq!(SoundStability::Stable.to_string(), "STABLE");
    }

    #[test]
    fn particle_sensor_units() {
        assert_eq!(ParticleSensor::Ppd42.unit(), "ppL");
        assert_eq!(ParticleSensor::Sds011.unit(), "ug/m3");
    }

    #[test]
    fn cycle_interval_from_seconds() {
        assert_eq!(CycleInterval::from_secs(100), Some(CycleInterval::T100s));
        assert_eq!(CycleInterval::from_secs(60), None);
    }

    #[test]
    fn block_lengths_cover_their_fields() {
        assert_eq!(AIR_DATA_BYTES, 2 + 4 + 2 + 4);
        assert_eq!(AIR_QUALITY_DATA_BYTES, 3 + 3 + 3 + 1);
        assert_eq!(LIGHT_DATA_BYTES, 3 + 2);
        assert_eq!(SOUND_DATA_BYTES, 2 + SOUND_FREQ_BANDS * 2 + 3 + 1);
        assert_eq!(PARTICLE_DATA_BYTES, 2 + 3 + 1);
    }
}
