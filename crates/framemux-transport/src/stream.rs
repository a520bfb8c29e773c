use std::io::ErrorKind;
use std::time::Duration;

use bytes::BytesMut;
use framemux_frame::{decode_frame, Frame};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{ByteChannel, FrameTransport};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Timeouts applied to a [`ByteStream`](crate::ByteStream) before it is
/// wrapped in a [`StreamTransport`].
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Read timeout for the tail of a partially received frame.
    pub read_timeout: Option<Duration>,
    /// Write timeout for outgoing frames.
    pub write_timeout: Option<Duration>,
}

/// Carries fixed-length frames over a byte channel.
///
/// Partial reads are accumulated internally; readiness is reported only once
/// a whole frame is buffered, so [`read`](FrameTransport::read) after a
/// positive readiness check never waits on the channel.
pub struct StreamTransport<C, const N: usize> {
    inner: C,
    buf: BytesMut,
}

impl<C: ByteChannel, const N: usize> StreamTransport<C, N> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(N * 4),
        }
    }

    /// Wait up to `timeout` for a whole frame to be buffered.
    pub fn wait_for_frame(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if self.buf.len() >= N {
                return Ok(true);
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if !self.inner.poll_readable(remaining)? {
                return Ok(false);
            }
            match self.fill() {
                Ok(_) => {}
                Err(err) if err.is_would_block() => {}
                Err(err) => return Err(err),
            }
            if remaining.is_zero() {
                return Ok(self.buf.len() >= N);
            }
        }
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the transport and return the channel. Buffered bytes are lost.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let want = (N - self.buf.len() % N).min(READ_CHUNK_SIZE);
        loop {
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    trace!(bytes = n, buffered = self.buf.len() + n, "received bytes");
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(TransportError::WouldBlock)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<C: ByteChannel, const N: usize> FrameTransport<N> for StreamTransport<C, N> {
    fn is_data_available(&mut self) -> Result<bool> {
        if self.buf.len() >= N {
            return Ok(true);
        }
        if !self.inner.poll_readable(Duration::ZERO)? {
            return Ok(false);
        }
        self.fill()?;
        Ok(self.buf.len() >= N)
    }

    fn read(&mut self, frame: &mut Frame<N>) -> Result<()> {
        while self.buf.len() < N {
            self.fill()?;
        }
        match decode_frame::<N>(&mut self.buf) {
            Some(decoded) => {
                *frame = decoded;
                Ok(())
            }
            None => Err(TransportError::WouldBlock),
        }
    }

    fn write(&mut self, frame: &Frame<N>) -> Result<()> {
        let bytes = frame.as_bytes();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

#[cfg(unix)]
impl<const N: usize> StreamTransport<crate::socket::ByteStream, N> {
    /// Wrap a socket stream and apply timeouts from config.
    pub fn with_config(inner: crate::socket::ByteStream, config: &StreamConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::new(inner))
    }
}
