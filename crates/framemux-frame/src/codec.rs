use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: identifier (1) + sequence (1) + acknowledgment (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Offset of the identifier byte.
pub const ID_OFFSET: usize = 0;
/// Offset of the sequence number byte.
pub const SEQ_OFFSET: usize = 1;
/// Offset of the acknowledgment number byte.
pub const ACK_OFFSET: usize = 2;

/// A fixed-length frame.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────────────────┐
/// │ Id (1B)  │ Seq (1B) │ Ack (1B) │ Payload (N - 3 bytes)│
/// └──────────┴──────────┴──────────┴──────────────────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Frame<N> {
    const VALID_LENGTH: () = assert!(
        N > HEADER_SIZE,
        "frame length must be at least the header length plus one payload byte"
    );

    /// Payload capacity in bytes.
    pub const PAYLOAD_SIZE: usize = N - HEADER_SIZE;

    /// An all-zero frame.
    pub fn zeroed() -> Self {
        let () = Self::VALID_LENGTH;
        Self { bytes: [0u8; N] }
    }

    /// Build a frame from header fields and a payload.
    ///
    /// Short payloads are zero padded.
    pub fn new(id: u8, seq: u8, ack: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > Self::PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: Self::PAYLOAD_SIZE,
            });
        }

        let mut frame = Self::zeroed();
        frame.bytes[ID_OFFSET] = id;
        frame.bytes[SEQ_OFFSET] = seq;
        frame.bytes[ACK_OFFSET] = ack;
        frame.bytes[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        Ok(frame)
    }

    /// Wrap raw frame bytes.
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        let () = Self::VALID_LENGTH;
        Self { bytes }
    }

    /// Copy a frame out of a slice that must be exactly `N` bytes long.
    pub fn from_slice(src: &[u8]) -> Result<Self> {
        let bytes: [u8; N] = src.try_into().map_err(|_| FrameError::LengthMismatch {
            actual: src.len(),
            expected: N,
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// The handler identifier.
    pub fn id(&self) -> u8 {
        self.bytes[ID_OFFSET]
    }

    /// The sequence number set by the sender.
    pub fn seq(&self) -> u8 {
        self.bytes[SEQ_OFFSET]
    }

    /// The acknowledgment number set by the receiver.
    pub fn ack(&self) -> u8 {
        self.bytes[ACK_OFFSET]
    }

    pub fn set_id(&mut self, id: u8) {
        self.bytes[ID_OFFSET] = id;
    }

    pub fn set_seq(&mut self, seq: u8) {
        self.bytes[SEQ_OFFSET] = seq;
    }

    pub fn set_ack(&mut self, ack: u8) {
        self.bytes[ACK_OFFSET] = ack;
    }

    /// The payload region.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    /// The payload region, mutable in place.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[HEADER_SIZE..]
    }

    /// Zero the payload region, leaving the header untouched.
    pub fn clear_payload(&mut self) {
        self.bytes[HEADER_SIZE..].fill(0);
    }

    /// The full frame as it appears on the wire.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// The full frame, mutable. Used by transports filling a read buffer.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> [u8; N] {
        self.bytes
    }
}

impl<const N: usize> Default for Frame<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> std::fmt::Debug for Frame<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id())
            .field("seq", &self.seq())
            .field("ack", &self.ack())
            .field("payload", &self.payload())
            .finish()
    }
}

/// Append a frame to a buffer. Always writes exactly `N` bytes.
pub fn encode_frame<const N: usize>(frame: &Frame<N>, dst: &mut BytesMut) {
    dst.reserve(N);
    dst.put_slice(frame.as_bytes());
}

/// Decode one frame from the front of a buffer.
///
/// Returns `None` if fewer than `N` bytes are buffered. On success, consumes
/// exactly `N` bytes.
pub fn decode_frame<const N: usize>(src: &mut BytesMut) -> Option<Frame<N>> {
    if src.len() < N {
        return None;
    }

    let raw = src.split_to(N);
    let mut frame = Frame::<N>::zeroed();
    frame.as_bytes_mut().copy_from_slice(&raw);
    Some(frame)
}
