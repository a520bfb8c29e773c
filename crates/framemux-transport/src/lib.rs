//! Fixed-frame transport abstraction.
//!
//! The dispatcher only needs three things from a byte channel: "is a whole
//! frame waiting", "read one frame", "write one frame". [`FrameTransport`]
//! captures that contract. Implementations provided here:
//! - [`MemoryTransport`]: in-process queues with fault injection
//! - [`StreamTransport`]: frames over any [`ByteChannel`] (sockets, serial ports)
//! - [`UnixDomainSocket`]: listener/connector producing [`ByteStream`]s (Unix only)

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod socket;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::{StreamConfig, StreamTransport};
pub use traits::{ByteChannel, FrameTransport};

#[cfg(unix)]
pub use socket::ByteStream;
#[cfg(unix)]
pub use uds::UnixDomainSocket;
