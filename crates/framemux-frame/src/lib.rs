//! Fixed-length frame layout for framemux.
//!
//! Every frame on the wire is exactly `N` bytes:
//! - 1 byte identifier selecting the handler
//! - 1 byte sequence number (0 or 1, reliable channels only)
//! - 1 byte acknowledgment number (0 or 1, set by the receiver's reply)
//! - `N - 3` bytes of handler-specific payload
//!
//! `N` is a const generic fixed at compile time; frames too short to carry a
//! payload byte are rejected when the type is instantiated.

pub mod codec;
pub mod error;
pub mod ids;

pub use codec::{decode_frame, encode_frame, Frame, ACK_OFFSET, HEADER_SIZE, ID_OFFSET, SEQ_OFFSET};
pub use error::{FrameError, Result};
pub use ids::{id_name, is_reserved, SESSION_CONTROL};
