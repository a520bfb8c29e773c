use std::io::{Read, Write};
use std::time::Duration;

use framemux_frame::Frame;

use crate::error::{Result, TransportError};

/// A channel that moves whole frames of exactly `N` bytes.
///
/// Implementations must never block indefinitely in
/// [`is_data_available`](FrameTransport::is_data_available); "nothing yet" is
/// reported as `Ok(false)` or as an error for which
/// [`TransportError::is_would_block`](crate::TransportError::is_would_block)
/// holds.
pub trait FrameTransport<const N: usize> {
    /// Whether a complete frame can be read without waiting.
    fn is_data_available(&mut self) -> Result<bool>;

    /// Read one frame into `frame`.
    fn read(&mut self, frame: &mut Frame<N>) -> Result<()>;

    /// Write one frame.
    fn write(&mut self, frame: &Frame<N>) -> Result<()>;
}

impl<const N: usize, T: FrameTransport<N> + ?Sized> FrameTransport<N> for Box<T> {
    fn is_data_available(&mut self) -> Result<bool> {
        (**self).is_data_available()
    }

    fn read(&mut self, frame: &mut Frame<N>) -> Result<()> {
        (**self).read(frame)
    }

    fn write(&mut self, frame: &Frame<N>) -> Result<()> {
        (**self).write(frame)
    }
}

/// An optional link. `None` is a detached peer: never ready, and reads and
/// writes fail with [`TransportError::Closed`].
impl<const N: usize, T: FrameTransport<N>> FrameTransport<N> for Option<T> {
    fn is_data_available(&mut self) -> Result<bool> {
        match self {
            Some(inner) => inner.is_data_available(),
            None => Ok(false),
        }
    }

    fn read(&mut self, frame: &mut Frame<N>) -> Result<()> {
        self.as_mut().ok_or(TransportError::Closed)?.read(frame)
    }

    fn write(&mut self, frame: &Frame<N>) -> Result<()> {
        self.as_mut().ok_or(TransportError::Closed)?.write(frame)
    }
}

/// A byte channel with a readiness probe.
///
/// This is what [`StreamTransport`](crate::StreamTransport) needs from the
/// layer below it: ordinary `Read + Write`, plus a way to ask whether a read
/// would return data without committing to one.
pub trait ByteChannel: Read + Write {
    /// Wait up to `timeout` for the channel to become readable.
    ///
    /// `Duration::ZERO` must return immediately. Returns `true` when a read
    /// would not block (including at end of stream).
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;

    #[test]
    fn detached_link_is_idle_and_closed() {
        let mut link: Option<MemoryTransport<4>> = None;
        assert!(!link.is_data_available().unwrap());

        let mut frame = Frame::zeroed();
        assert!(matches!(link.read(&mut frame), Err(TransportError::Closed)));
        assert!(matches!(link.write(&frame), Err(TransportError::Closed)));
    }

    #[test]
    fn attached_link_delegates() {
        let mut inner = MemoryTransport::<4>::new();
        inner.push_inbound(Frame::new(7, 0, 0, &[1]).unwrap());
        let mut link = Some(inner);

        assert!(link.is_data_available().unwrap());
        let mut frame = Frame::zeroed();
        link.read(&mut frame).unwrap();
        link.write(&frame).unwrap();
        assert_eq!(link.as_ref().unwrap().outbound()[0].id(), 7);
    }
}
