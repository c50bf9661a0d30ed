use thiserror::Error;

use crate::sensor::format::FixedPointFormat;
use crate::sensor::session::{InterruptSource, Mode};

/// Errors raised while encoding or decoding register data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The value cannot be represented in the given fixed-point format.
    #[error("value {value} does not fit {format}")]
    EncodingRange { value: f64, format: FixedPointFormat },

    /// The frame ended before the requested field.
    #[error("buffer underrun: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun { needed: usize, remaining: usize },

    /// An enumerated field held a byte with no matching variant.
    #[error("unknown {kind} value 0x{byte:02X}")]
    UnknownVariant { kind: &'static str, byte: u8 },

    /// The format's integer width is outside what the codec supports.
    #[error("unsupported fixed-point format {0}")]
    InvalidFormat(FixedPointFormat),
}

/// Errors raised by a [`Session`](crate::sensor::session::Session).
///
/// `E` is the error type of the underlying transport and is passed through
/// untouched in [`SensorError::Io`].
#[derive(Debug, Error)]
pub enum SensorError<E> {
    /// Data was requested while the READY signal was not asserted.
    #[error("sensor data is not ready")]
    NotReady,

    /// The operation is not allowed in the current device mode.
    #[error("operation not allowed in {0} mode")]
    InvalidMode(Mode),

    /// The interrupt output was not wired up when the session was created.
    #[error("{0} interrupt pin is not connected")]
    InterruptNotConnected(InterruptSource),

    /// Particle data was requested without a particle sensor enabled.
    #[error("no particle sensor is enabled")]
    NoParticleSensor,

    /// A bounded wait for the READY signal expired.
    #[error("timed out waiting for the ready signal")]
    Timeout,

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Io(#[source] E),
}

pub type SensorResult<T, E> = Result<T, SensorError<E>>;
