pub mod error;
pub mod format;
pub mod frame;
pub mod registers;
pub mod rpi;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use error::{CodecError, SensorError};
pub use rpi::RpiTransport;
pub use session::{Session, SessionOptions, SessionPins};
