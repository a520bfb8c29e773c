//! Fixed-length frame multiplexing over a single byte link.
//!
//! Every frame carries an identifier, a sequence bit, an acknowledgment bit
//! and a payload. A dispatcher routes each inbound frame to the handler
//! registered for its identifier; handlers that opt in get alternating-bit
//! duplicate suppression.
//!
//! # Crate Structure
//!
//! - [`frame`]: frame layout, codec, reserved identifiers
//! - [`transport`]: frame transport contract, in-memory and Unix socket transports
//! - [`dispatch`]: handlers, registry, reliability state machine, dispatcher, sender

/// Re-export frame types.
pub mod frame {
    pub use framemux_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use framemux_transport::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use framemux_dispatch::*;
}
