/// Bus and pin access used by the sensor session
use std::time::Duration;

/// Register bus plus the READY / interrupt signal lines.
///
/// The session is the only user of a transport. Implementations report
/// failures through `Self::Error`; the session passes those on untouched and
/// never retries, so any electrical retry policy belongs here.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write a single command byte to the device.
    fn write_command(&mut self, address: u8, command: u8) -> Result<(), Self::Error>;

    /// Write `data` to the register at `register`.
    fn write_register(&mut self, address: u8, register: u8, data: &[u8])
        -> Result<(), Self::Error>;

    /// Read `count` bytes starting at `register`.
    fn read_block(&mut self, address: u8, register: u8, count: usize)
        -> Result<Vec<u8>, Self::Error>;

    /// Block until a falling edge on `pin`.
    ///
    /// Returns `false` if `timeout` expired first. `None` waits forever.
    fn wait_for_falling_edge(
        &mut self,
        pin: u8,
        timeout: Option<Duration>,
    ) -> Result<bool, Self::Error>;

    /// Current level of `pin`, `true` for high.
    fn read_level(&mut self, pin: u8) -> Result<bool, Self::Error>;

    /// Start latching falling edges on `pin`.
    fn arm_edge_detection(&mut self, pin: u8) -> Result<(), Self::Error>;

    fn disarm_edge_detection(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Whether an edge was latched on `pin` since the last poll.
    fn poll_edge_event(&mut self, pin: u8) -> Result<bool, Self::Error>;

    /// Give the device time to process a command or register write.
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
