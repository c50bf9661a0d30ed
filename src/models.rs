use std::fmt;

use crate::sensor::error::CodecError;
use crate::sensor::format::FixedPointFormat;
use crate::sensor::frame::{Frame, WireEnum};
use crate::sensor::registers::{
    AqiAccuracy, ParticleSensor, ParticleValidity, SoundStability, SOUND_FREQ_BANDS,
};

/// A single decoded field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Integer(i64),
    /// Enumerated state or unit, by its symbolic name
    Name(&'static str),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Name(name) => f.write_str(name),
        }
    }
}

/// Ordered field name to value mapping of a record.
pub type Fields = Vec<(&'static str, Value)>;

/// Coarse air quality classification derived from the AQI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiTier {
    Good,
    Acceptable,
    Substandard,
    Poor,
    Bad,
    VeryBad,
}

// Upper bound (inclusive) of each tier, in ascending order.
const AQI_TIERS: [(f64, AqiTier); 6] = [
    (49.0, AqiTier::Good),
    (99.0, AqiTier::Acceptable),
    (149.0, AqiTier::Substandard),
    (199.0, AqiTier::Poor),
    (299.0, AqiTier::Bad),
    (499.0, AqiTier::VeryBad),
];

impl AqiTier {
    /// Tier with the smallest threshold at or above `aqi`.
    ///
    /// Values above the last threshold are clamped to `VeryBad`.
    pub fn from_index(aqi: f64) -> Self {
        AQI_TIERS
            .iter()
            .find(|(threshold, _)| aqi <= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(AqiTier::VeryBad)
    }

    pub fn name(self) -> &'static str {
        match self {
            AqiTier::Good => "GOOD",
            AqiTier::Acceptable => "ACCEPTABLE",
            AqiTier::Substandard => "SUBSTANDARD",
            AqiTier::Poor => "POOR",
            AqiTier::Bad => "BAD",
            AqiTier::VeryBad => "VERY_BAD",
        }
    }
}

/// Temperature, pressure, humidity and gas sensor resistance.
#[derive(Debug, Clone, PartialEq)]
pub struct AirData {
    pub temperature_c: f64,
    pub pressure_pa: u32,
    pub humidity_pc: f64,
    pub gas_resistance_ohm: u32,
}

impl AirData {
    pub fn decode(frame: &mut Frame<'_>) -> Result<Self, CodecError> {
        Ok(AirData {
            temperature_c: frame.read_single(FixedPointFormat::signed(1, 1))?,
            pressure_pa: frame.read_single(FixedPointFormat::unsigned(4, 0))? as u32,
            humidity_pc: frame.read_single(FixedPointFormat::unsigned(1, 2))?,
            gas_resistance_ohm: frame.read_single(FixedPointFormat::unsigned(4, 0))? as u32,
        })
    }

    pub fn fields(&self) -> Fields {
        vec![
            ("T_C", Value::Number(self.temperature_c)),
            ("P_Pa", Value::Integer(i64::from(self.pressure_pa))),
            ("H_pc", Value::Number(self.humidity_pc)),
            ("G_ohm", Value::Integer(i64::from(self.gas_resistance_ohm))),
        ]
    }
}

/// Air quality index and derived estimates. Only valid in cycle mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AirQualityData {
    pub aqi: f64,
    pub aqi_tier: AqiTier,
    pub co2e_ppm: f64,
    pub bvoc_ppm: f64,
    pub accuracy: AqiAccuracy,
}

impl AirQualityData {
    pub fn decode(frame: &mut Frame<'_>) -> Result<Self, CodecError> {
        let aqi = frame.read_single(FixedPointFormat::unsigned(2, 1))?;
        Ok(AirQualityData {
            aqi,
            aqi_tier: AqiTier::from_index(aqi),
            co2e_ppm: frame.read_single(FixedPointFormat::unsigned(2, 1))?,
            bvoc_ppm: frame.read_single(FixedPointFormat::unsigned(2, 2))?,
            accuracy: frame.read_enum()?,
        })
    }

    pub fn fields(&self) -> Fields {
        vec![
            ("AQI", Value::Number(self.aqi)),
            ("AQI_value", Value::Name(self.aqi_tier.name())),
            ("CO2e", Value::Number(self.co2e_ppm)),
            ("bVOC", Value::Number(self.bvoc_ppm)),
            ("AQI_accuracy", Value::Name(self.accuracy.name())),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightData {
    pub illuminance_lux: f64,
    pub white: u16,
}

impl LightData {
    pub fn decode(frame: &mut Frame<'_>) -> Result<Self, CodecError> {
        Ok(LightData {
            illuminance_lux: frame.read_single(FixedPointFormat::unsigned(2, 2))?,
            white: frame.read_single(FixedPointFormat::unsigned(2, 0))? as u16,
        })
    }

    pub fn fields(&self) -> Fields {
        vec![
            ("illum_lux", Value::Number(self.illuminance_lux)),
            ("white", Value::Integer(i64::from(self.white))),
        ]
    }
}

const SPL_BAND_FIELDS: [&str; SOUND_FREQ_BANDS] = [
    "SPL_bands_dB_1",
    "SPL_bands_dB_2",
    "SPL_bands_dB_3",
    "SPL_bands_dB_4",
    "SPL_bands_dB_5",
    "SPL_bands_dB_6",
];

/// A-weighted sound level, per-band levels and peak amplitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    pub spl_dba: f64,
    pub band_spl_db: [f64; SOUND_FREQ_BANDS],
    pub peak_amplitude_mpa: f64,
    pub stability: SoundStability,
}

impl SoundData {
    pub fn decode(frame: &mut Frame<'_>) -> Result<Self, CodecError> {
        Ok(SoundData {
            spl_dba: frame.read_single(FixedPointFormat::unsigned(1, 1))?,
            band_spl_db: frame.read_striped(FixedPointFormat::unsigned(1, 1))?,
            peak_amplitude_mpa: frame.read_single(FixedPointFormat::unsigned(2, 2))?,
            stability: frame.read_enum()?,
        })
    }

    pub fn fields(&self) -> Fields {
        let mut fields = vec![("SPL_dBA", Value::Number(self.spl_dba))];
        fields.extend(
            SPL_BAND_FIELDS
                .iter()
                .zip(self.band_spl_db)
                .map(|(name, level)| (*name, Value::Number(level))),
        );
        fields.push(("peak_amp_mPa", Value::Number(self.peak_amplitude_mpa)));
        fields.push(("stable", Value::Name(self.stability.name())));
        fields
    }
}

/// Output of the external particle sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleData {
    pub duty_cycle_pc: f64,
    pub concentration: f64,
    pub sensor: ParticleSensor,
    pub validity: ParticleValidity,
}

impl ParticleData {
    /// The frame carries no unit; it follows from the selected `sensor`.
    pub fn decode(frame: &mut Frame<'_>, sensor: ParticleSensor) -> Result<Self, CodecError> {
        Ok(ParticleData {
            duty_cycle_pc: frame.read_single(FixedPointFormat::unsigned(1, 2))?,
            concentration: frame.read_single(FixedPointFormat::unsigned(2, 2))?,
            sensor,
            validity: frame.read_enum()?,
        })
    }

    pub fn fields(&self) -> Fields {
        vec![
            ("duty_cycle_pc", Value::Number(self.duty_cycle_pc)),
            ("concentration", Value::Number(self.concentration)),
            ("conc_unit", Value::Name(self.sensor.unit())),
            ("valid", Value::Name(self.validity.name())),
        ]
    }
}

/// Every category read in one pass.
///
/// Air quality is absent outside cycle mode, particle data when no particle
/// sensor is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    pub air: AirData,
    pub air_quality: Option<AirQualityData>,
    pub light: LightData,
    pub sound: SoundData,
    pub particle: Option<ParticleData>,
}

impl SensorData {
    pub fn fields(&self) -> Fields {
        let mut fields = self.air.fields();
        if let Some(air_quality) = &self.air_quality {
            fields.extend(air_quality.fields());
        }
        fields.extend(self.light.fields());
        fields.extend(self.sound.fields());
        if let Some(particle) = &self.particle {
            fields.extend(particle.fields());
        }
        fields
    }
}
