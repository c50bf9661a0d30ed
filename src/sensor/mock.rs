/// In-memory transport for session tests
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::sensor::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Command(u8),
    Register(u8, Vec<u8>),
    Read(u8, usize),
    Wait(u8),
    Arm(u8),
    Disarm(u8),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("mock bus failure")]
pub struct MockError;

/// Records every bus operation and serves scripted data.
///
/// Pins read low (asserted) unless a level is set, and waits for an edge
/// return immediately.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub ops: Vec<BusOp>,
    pub settles: Vec<Duration>,
    pub blocks: HashMap<u8, Vec<u8>>,
    pub levels: HashMap<u8, bool>,
    pub pending_edges: HashSet<u8>,
    pub armed: HashSet<u8>,
    pub wait_times_out: bool,
    pub fail_writes: bool,
}

impl MockTransport {
    pub fn commands(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Command(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn register_writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Register(register, data) => Some((*register, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.settles.clear();
    }
}

impl Transport for MockTransport {
    type Error = MockError;

    fn write_command(&mut self, _address: u8, command: u8) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError);
        }
        self.ops.push(BusOp::Command(command));
        Ok(())
    }

    fn write_register(&mut self, _address: u8, register: u8, data: &[u8]) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError);
        }
        self.ops.push(BusOp::Register(register, data.to_vec()));
        Ok(())
    }

    fn read_block(&mut self, _address: u8, register: u8, count: usize) -> Result<Vec<u8>, MockError> {
        self.ops.push(BusOp::Read(register, count));
        let mut block = self.blocks.get(&register).cloned().unwrap_or_default();
        block.truncate(count);
        Ok(block)
    }

    fn wait_for_falling_edge(&mut self, pin: u8, _timeout: Option<Duration>) -> Result<bool, MockError> {
        self.ops.push(BusOp::Wait(pin));
        Ok(!self.wait_times_out)
    }

    fn read_level(&mut self, pin: u8) -> Result<bool, MockError> {
        Ok(self.levels.get(&pin).copied().unwrap_or(false))
    }

    fn arm_edge_detection(&mut self, pin: u8) -> Result<(), MockError> {
        self.ops.push(BusOp::Arm(pin));
        self.armed.insert(pin);
        Ok(())
    }

    fn disarm_edge_detection(&mut self, pin: u8) -> Result<(), MockError> {
        self.ops.push(BusOp::Disarm(pin));
        self.armed.remove(&pin);
        Ok(())
    }

    fn poll_edge_event(&mut self, pin: u8) -> Result<bool, MockError> {
        Ok(self.armed.contains(&pin) && self.pending_edges.remove(&pin))
    }

    fn settle(&mut self, duration: Duration) {
        self.settles.push(duration);
    }
}
