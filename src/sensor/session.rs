/// Device session: mode state machine, mirrored settings and data reads
///
/// The sensor cannot report most of its settings back, so the session keeps
/// a mirror of everything it has written and skips any write that would not
/// change the device. The mirror is only trustworthy while this session is
/// the sole writer; `reset()` is the way back to a known state.
use std::fmt;
use std::time::Duration;

use log::{debug, info};

use crate::models::{AirData, AirQualityData, LightData, ParticleData, SensorData, SoundData};
use crate::sensor::error::{SensorError, SensorResult};
use crate::sensor::format::{decode, encode};
use crate::sensor::frame::{Frame, WireEnum};
use crate::sensor::registers::*;
use crate::sensor::transport::Transport;

/// Time the device needs after each command or register write.
pub const SETTLE_DELAY: Duration = Duration::from_millis(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Measurements only on demand
    #[default]
    Standby,
    /// Autonomous measurement at a fixed interval
    Cycle,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Standby => f.write_str("STANDBY"),
            Mode::Cycle => f.write_str("CYCLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    Light,
    Sound,
}

impl fmt::Display for InterruptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptSource::Light => f.write_str("light"),
            InterruptSource::Sound => f.write_str("sound"),
        }
    }
}

/// Host GPIO pins wired to the sensor's signal outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPins {
    pub ready: u8,
    pub light_interrupt: Option<u8>,
    pub sound_interrupt: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub settle_delay: Duration,
    /// Bound for `wait_for_ready()`; `None` waits indefinitely.
    pub ready_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            ready_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightInterruptConfig {
    pub enabled: bool,
    pub kind: InterruptType,
    pub polarity: InterruptPolarity,
    pub threshold: f64,
}

impl Default for LightInterruptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: InterruptType::Latch,
            polarity: InterruptPolarity::Positive,
            threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundInterruptConfig {
    pub enabled: bool,
    pub kind: InterruptType,
    pub threshold: f64,
}

impl Default for SoundInterruptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: InterruptType::Latch,
            threshold: 0.0,
        }
    }
}

/// Mirror of the device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceState {
    pub mode: Mode,
    /// `None` until an interval has been written since the last reset.
    pub cycle_interval: Option<CycleInterval>,
    pub light_interrupt: LightInterruptConfig,
    pub sound_interrupt: SoundInterruptConfig,
    pub particle_sensor: Option<ParticleSensor>,
}

/// Exclusive session with one MS430 board.
pub struct Session<T: Transport> {
    transport: T,
    address: SensorAddress,
    pins: SessionPins,
    options: SessionOptions,
    state: DeviceState,
}

impl<T: Transport> Session<T> {
    /// Take ownership of the transport and reset the device.
    pub fn new(
        transport: T,
        address: SensorAddress,
        pins: SessionPins,
        options: SessionOptions,
    ) -> SensorResult<Self, T::Error> {
        let mut session = Session {
            transport,
            address,
            pins,
            options,
            state: DeviceState::default(),
        };
        session.reset()?;
        Ok(session)
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn command(&mut self, command: u8) -> SensorResult<(), T::Error> {
        debug!("Sending command {:#04x} to {}", command, self.address);
        self.transport
            .write_command(self.address.value(), command)
            .map_err(SensorError::Io)?;
        self.transport.settle(self.options.settle_delay);
        Ok(())
    }

    fn write(&mut self, register: u8, data: &[u8]) -> SensorResult<(), T::Error> {
        debug!("Writing {:02X?} to register {:#04x}", data, register);
        self.transport
            .write_register(self.address.value(), register, data)
            .map_err(SensorError::Io)?;
        self.transport.settle(self.options.settle_delay);
        Ok(())
    }

    fn arm(&mut self, pin: u8) -> SensorResult<(), T::Error> {
        self.transport.arm_edge_detection(pin).map_err(SensorError::Io)
    }

    fn disarm(&mut self, pin: u8) -> SensorResult<(), T::Error> {
        self.transport
            .disarm_edge_detection(pin)
            .map_err(SensorError::Io)
    }

    // readiness

    /// Block until the device signals READY, bounded by the configured
    /// `ready_timeout` if there is one.
    pub fn wait_for_ready(&mut self) -> SensorResult<(), T::Error> {
        self.wait_ready(self.options.ready_timeout)
    }

    pub fn wait_for_ready_timeout(&mut self, timeout: Duration) -> SensorResult<(), T::Error> {
        self.wait_ready(Some(timeout))
    }

    fn wait_ready(&mut self, timeout: Option<Duration>) -> SensorResult<(), T::Error> {
        let signalled = self
            .transport
            .wait_for_falling_edge(self.pins.ready, timeout)
            .map_err(SensorError::Io)?;
        if signalled {
            Ok(())
        } else {
            Err(SensorError::Timeout)
        }
    }

    /// READY is active low.
    pub fn is_ready(&mut self) -> SensorResult<bool, T::Error> {
        let high = self
            .transport
            .read_level(self.pins.ready)
            .map_err(SensorError::Io)?;
        Ok(!high)
    }

    /// Whether READY fired since the last check. Only tracked in cycle mode.
    pub fn was_ready(&mut self) -> SensorResult<bool, T::Error> {
        self.transport
            .poll_edge_event(self.pins.ready)
            .map_err(SensorError::Io)
    }

    // mode

    /// Trigger a single measurement. Only valid in standby.
    pub fn measure(&mut self) -> SensorResult<(), T::Error> {
        if self.state.mode != Mode::Standby {
            return Err(SensorError::InvalidMode(self.state.mode));
        }
        self.command(ON_DEMAND_MEASURE_CMD)
    }

    /// Reset the device and forget all mirrored settings.
    pub fn reset(&mut self) -> SensorResult<(), T::Error> {
        info!("Resetting sensor at {}", self.address);
        self.command(RESET_CMD)?;
        self.state = DeviceState::default();

        self.disarm(self.pins.ready)?;
        for pin in [self.pins.light_interrupt, self.pins.sound_interrupt]
            .into_iter()
            .flatten()
        {
            self.disarm(pin)?;
        }

        self.wait_for_ready()
    }

    /// Enter cycle mode with the given sampling interval.
    pub fn cycle(&mut self, interval: CycleInterval) -> SensorResult<(), T::Error> {
        if self.state.mode == Mode::Cycle {
            if self.state.cycle_interval == Some(interval) {
                debug!("Already cycling at {}", interval);
                return Ok(());
            }
            self.standby()?;
        }

        if self.state.cycle_interval != Some(interval) {
            self.write(CYCLE_TIME_PERIOD_REG, &[interval.to_byte()])?;
            self.state.cycle_interval = Some(interval);
        } else {
            debug!("Cycle interval already {}, skipping write", interval);
        }

        self.command(CYCLE_MODE_CMD)?;
        self.state.mode = Mode::Cycle;
        info!("Sensor cycling at {}", interval);
        self.arm(self.pins.ready)
    }

    /// Leave cycle mode. Blocks until the device acknowledges.
    pub fn standby(&mut self) -> SensorResult<(), T::Error> {
        if self.state.mode == Mode::Standby {
            return Ok(());
        }
        self.disarm(self.pins.ready)?;
        self.command(STANDBY_MODE_CMD)?;
        self.state.mode = Mode::Standby;
        info!("Sensor in standby");
        self.wait_for_ready()
    }

    // light interrupt

    pub fn enable_light_interrupt(
        &mut self,
        kind: InterruptType,
        polarity: InterruptPolarity,
        threshold: f64,
    ) -> SensorResult<(), T::Error> {
        let pin = self
            .pins
            .light_interrupt
            .ok_or(SensorError::InterruptNotConnected(InterruptSource::Light))?;
        let threshold_bytes = encode(&LIGHT_THRESHOLD_FORMAT, threshold)?;
        // Compare at the resolution the device actually stores.
        let threshold = decode(&LIGHT_THRESHOLD_FORMAT, &threshold_bytes)?;

        let current = self.state.light_interrupt;
        if current.enabled {
            if current.kind == kind && current.polarity == polarity && current.threshold == threshold
            {
                debug!("Light interrupt already configured");
                return Ok(());
            }
            self.disable_light_interrupt()?;
        }

        if current.kind != kind {
            self.write(LIGHT_INTERRUPT_TYPE_REG, &[kind.to_byte()])?;
            self.state.light_interrupt.kind = kind;
        }
        if current.polarity != polarity {
            self.write(LIGHT_INTERRUPT_POLARITY_REG, &[polarity.to_byte()])?;
            self.state.light_interrupt.polarity = polarity;
        }
        if current.threshold != threshold {
            self.write(LIGHT_INTERRUPT_THRESHOLD_REG, &threshold_bytes)?;
            self.state.light_interrupt.threshold = threshold;
        }

        self.write(LIGHT_INTERRUPT_ENABLE_REG, &[INTERRUPT_ENABLED])?;
        self.state.light_interrupt.enabled = true;
        self.arm(pin)
    }

    pub fn disable_light_interrupt(&mut self) -> SensorResult<(), T::Error> {
        if !self.state.light_interrupt.enabled {
            return Ok(());
        }
        self.write(LIGHT_INTERRUPT_ENABLE_REG, &[INTERRUPT_DISABLED])?;
        self.state.light_interrupt.enabled = false;
        match self.pins.light_interrupt {
            Some(pin) => self.disarm(pin),
            None => Ok(()),
        }
    }

    /// Release a latched light interrupt. Comparator interrupts clear
    /// themselves and are left alone.
    pub fn clear_light_interrupt(&mut self) -> SensorResult<(), T::Error> {
        let config = self.state.light_interrupt;
        if config.enabled && config.kind == InterruptType::Latch {
            self.command(LIGHT_INTERRUPT_CLR_CMD)?;
        }
        Ok(())
    }

    pub fn is_light_interrupt(&mut self) -> SensorResult<bool, T::Error> {
        self.interrupt_level(self.state.light_interrupt.enabled, self.pins.light_interrupt)
    }

    pub fn was_light_interrupt(&mut self) -> SensorResult<bool, T::Error> {
        self.interrupt_event(self.state.light_interrupt.enabled, self.pins.light_interrupt)
    }

    // sound interrupt

    pub fn enable_sound_interrupt(
        &mut self,
        kind: InterruptType,
        threshold: f64,
    ) -> SensorResult<(), T::Error> {
        let pin = self
            .pins
            .sound_interrupt
            .ok_or(SensorError::InterruptNotConnected(InterruptSource::Sound))?;
        let threshold_bytes = encode(&SOUND_THRESHOLD_FORMAT, threshold)?;
        let threshold = decode(&SOUND_THRESHOLD_FORMAT, &threshold_bytes)?;

        let current = self.state.sound_interrupt;
        if current.enabled {
            if current.kind == kind && current.threshold == threshold {
                debug!("Sound interrupt already configured");
                return Ok(());
            }
            self.disable_sound_interrupt()?;
        }

        if current.kind != kind {
            self.write(SOUND_INTERRUPT_TYPE_REG, &[kind.to_byte()])?;
            self.state.sound_interrupt.kind = kind;
        }
        if current.threshold != threshold {
            self.write(SOUND_INTERRUPT_THRESHOLD_REG, &threshold_bytes)?;
            self.state.sound_interrupt.threshold = threshold;
        }

        self.write(SOUND_INTERRUPT_ENABLE_REG, &[INTERRUPT_ENABLED])?;
        self.state.sound_interrupt.enabled = true;
        self.arm(pin)
    }

    pub fn disable_sound_interrupt(&mut self) -> SensorResult<(), T::Error> {
        if !self.state.sound_interrupt.enabled {
            return Ok(());
        }
        self.write(SOUND_INTERRUPT_ENABLE_REG, &[INTERRUPT_DISABLED])?;
        self.state.sound_interrupt.enabled = false;
        match self.pins.sound_interrupt {
            Some(pin) => self.disarm(pin),
            None => Ok(()),
        }
    }

    pub fn clear_sound_interrupt(&mut self) -> SensorResult<(), T::Error> {
        let config = self.state.sound_interrupt;
        if config.enabled && config.kind == InterruptType::Latch {
            self.command(SOUND_INTERRUPT_CLR_CMD)?;
        }
        Ok(())
    }

    pub fn is_sound_interrupt(&mut self) -> SensorResult<bool, T::Error> {
        self.interrupt_level(self.state.sound_interrupt.enabled, self.pins.sound_interrupt)
    }

    pub fn was_sound_interrupt(&mut self) -> SensorResult<bool, T::Error> {
        self.interrupt_event(self.state.sound_interrupt.enabled, self.pins.sound_interrupt)
    }

    fn interrupt_level(&mut self, enabled: bool, pin: Option<u8>) -> SensorResult<bool, T::Error> {
        match (enabled, pin) {
            (true, Some(pin)) => {
                let high = self.transport.read_level(pin).map_err(SensorError::Io)?;
                Ok(!high)
            }
            _ => Ok(false),
        }
    }

    fn interrupt_event(&mut self, enabled: bool, pin: Option<u8>) -> SensorResult<bool, T::Error> {
        match (enabled, pin) {
            (true, Some(pin)) => self.transport.poll_edge_event(pin).map_err(SensorError::Io),
            _ => Ok(false),
        }
    }

    // particle sensor

    pub fn enable_particle_sensor(&mut self, sensor: ParticleSensor) -> SensorResult<(), T::Error> {
        if self.state.particle_sensor == Some(sensor) {
            return Ok(());
        }
        self.write(PARTICLE_SENSOR_SELECT_REG, &[sensor.to_byte()])?;
        self.state.particle_sensor = Some(sensor);
        info!("Particle sensor {} enabled", sensor);
        Ok(())
    }

    pub fn disable_particle_sensor(&mut self) -> SensorResult<(), T::Error> {
        if self.state.particle_sensor.is_none() {
            return Ok(());
        }
        self.write(PARTICLE_SENSOR_SELECT_REG, &[PARTICLE_SENSOR_OFF])?;
        self.state.particle_sensor = None;
        Ok(())
    }

    // reading

    fn ensure_ready(&mut self) -> SensorResult<(), T::Error> {
        if self.is_ready()? {
            Ok(())
        } else {
            Err(SensorError::NotReady)
        }
    }

    fn read_block(&mut self, register: u8, count: usize) -> SensorResult<Vec<u8>, T::Error> {
        self.transport
            .read_block(self.address.value(), register, count)
            .map_err(SensorError::Io)
    }

    pub fn read_air_data(&mut self) -> SensorResult<AirData, T::Error> {
        self.ensure_ready()?;
        let block = self.read_block(AIR_DATA_READ, AIR_DATA_BYTES)?;
        Ok(AirData::decode(&mut Frame::new(&block))?)
    }

    /// Air quality is only computed by the device in cycle mode.
    pub fn read_air_quality_data(&mut self) -> SensorResult<AirQualityData, T::Error> {
        self.ensure_ready()?;
        if self.state.mode != Mode::Cycle {
            return Err(SensorError::InvalidMode(self.state.mode));
        }
        let block = self.read_block(AIR_QUALITY_DATA_READ, AIR_QUALITY_DATA_BYTES)?;
        Ok(AirQualityData::decode(&mut Frame::new(&block))?)
    }

    pub fn read_light_data(&mut self) -> SensorResult<LightData, T::Error> {
        self.ensure_ready()?;
        let block = self.read_block(LIGHT_DATA_READ, LIGHT_DATA_BYTES)?;
        Ok(LightData::decode(&mut Frame::new(&block))?)
    }

    pub fn read_sound_data(&mut self) -> SensorResult<SoundData, T::Error> {
        self.ensure_ready()?;
        let block = self.read_block(SOUND_DATA_READ, SOUND_DATA_BYTES)?;
        Ok(SoundData::decode(&mut Frame::new(&block))?)
    }

    pub fn read_particle_data(&mut self) -> SensorResult<ParticleData, T::Error> {
        self.ensure_ready()?;
        let sensor = self
            .state
            .particle_sensor
            .ok_or(SensorError::NoParticleSensor)?;
        let block = self.read_block(PARTICLE_DATA_READ, PARTICLE_DATA_BYTES)?;
        Ok(ParticleData::decode(&mut Frame::new(&block), sensor)?)
    }

    /// Read every category that applies in the current configuration.
    pub fn read_all(&mut self) -> SensorResult<SensorData, T::Error> {
        let air = self.read_air_data()?;
        let air_quality = match self.state.mode {
            Mode::Cycle => Some(self.read_air_quality_data()?),
            Mode::Standby => None,
        };
        let light = self.read_light_data()?;
        let sound = self.read_sound_data()?;
        let particle = match self.state.particle_sensor {
            Some(_) => Some(self.read_particle_data()?),
            None => None,
        };

        Ok(SensorData {
            air,
            air_quality,
            light,
            sound,
            particle,
        })
    }
}
