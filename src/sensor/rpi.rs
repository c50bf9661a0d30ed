/// Raspberry Pi transport: I2C bus plus GPIO inputs for the signal lines
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::debug;
use rppal::gpio::{Gpio, InputPin, Trigger};
use rppal::i2c::I2c;
use thiserror::Error;

use crate::sensor::session::SessionPins;
use crate::sensor::transport::Transport;

#[derive(Debug, Error)]
pub enum RpiError {
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("GPIO pin {0} was not opened")]
    UnknownPin(u8),

    #[error("short I2C write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

pub struct RpiTransport {
    i2c: I2c,
    slave_address: Option<u8>,
    pins: HashMap<u8, InputPin>,
    armed: HashSet<u8>,
}

impl RpiTransport {
    /// Open the I2C bus and every connected signal pin as an input.
    /// Pin numbers are BCM GPIO numbers.
    pub fn open(bus: u8, pins: &SessionPins) -> Result<Self, RpiError> {
        let i2c = I2c::with_bus(bus)?;
        let gpio = Gpio::new()?;

        let mut inputs = HashMap::new();
        for pin in [Some(pins.ready), pins.light_interrupt, pins.sound_interrupt]
            .into_iter()
            .flatten()
        {
            debug!("Opening GPIO {} as input", pin);
            inputs.insert(pin, gpio.get(pin)?.into_input());
        }

        Ok(RpiTransport {
            i2c,
            slave_address: None,
            pins: inputs,
            armed: HashSet::new(),
        })
    }

    fn select(&mut self, address: u8) -> Result<(), RpiError> {
        if self.slave_address != Some(address) {
            self.i2c.set_slave_address(u16::from(address))?;
            self.slave_address = Some(address);
        }
        Ok(())
    }

    fn write_all(&mut self, buffer: &[u8]) -> Result<(), RpiError> {
        let written = self.i2c.write(buffer)?;
        if written != buffer.len() {
            return Err(RpiError::ShortWrite {
                written,
                expected: buffer.len(),
            });
        }
        Ok(())
    }

    fn pin(&mut self, pin: u8) -> Result<&mut InputPin, RpiError> {
        self.pins.get_mut(&pin).ok_or(RpiError::UnknownPin(pin))
    }
}

impl Transport for RpiTransport {
    type Error = RpiError;

    fn write_command(&mut self, address: u8, command: u8) -> Result<(), RpiError> {
        self.select(address)?;
        self.write_all(&[command])
    }

    fn write_register(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), RpiError> {
        self.select(address)?;
        let mut buffer = Vec::with_capacity(data.len() + 1);
        buffer.push(register);
        buffer.extend_from_slice(data);
        self.write_all(&buffer)
    }

    fn read_block(&mut self, address: u8, register: u8, count: usize) -> Result<Vec<u8>, RpiError> {
        self.select(address)?;
        let mut buffer = vec![0; count];
        self.i2c.write_read(&[register], &mut buffer)?;
        Ok(buffer)
    }

    fn wait_for_falling_edge(&mut self, pin: u8, timeout: Option<Duration>) -> Result<bool, RpiError> {
        let armed = self.armed.contains(&pin);
        let input = self.pin(pin)?;
        if !armed {
            input.set_interrupt(Trigger::FallingEdge)?;
        }

        let event = input.poll_interrupt(true, timeout);

        // Leave an armed pin latching edges for `poll_edge_event`.
        if !armed {
            input.clear_interrupt()?;
        }
        Ok(event?.is_some())
    }

    fn read_level(&mut self, pin: u8) -> Result<bool, RpiError> {
        Ok(self.pin(pin)?.is_high())
    }

    fn arm_edge_detection(&mut self, pin: u8) -> Result<(), RpiError> {
        self.pin(pin)?.set_interrupt(Trigger::FallingEdge)?;
        self.armed.insert(pin);
        Ok(())
    }

    fn disarm_edge_detection(&mut self, pin: u8) -> Result<(), RpiError> {
        if self.armed.remove(&pin) {
            self.pin(pin)?.clear_interrupt()?;
        }
        Ok(())
    }

    fn poll_edge_event(&mut self, pin: u8) -> Result<bool, RpiError> {
        if !self.armed.contains(&pin) {
            return Ok(false);
        }
        let event = self.pin(pin)?.poll_interrupt(false, Some(Duration::ZERO))?;
        Ok(event.is_some())
    }
}
