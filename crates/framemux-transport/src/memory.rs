use std::collections::VecDeque;

use framemux_frame::Frame;

use crate::error::{Result, TransportError};
use crate::traits::FrameTransport;

/// In-process transport backed by two queues.
///
/// Frames pushed with [`push_inbound`](Self::push_inbound) are handed to the
/// reader in order; every frame written is appended to the outbound log.
/// Each operation can be made to fail once, which is how the dispatcher's
/// recovery paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryTransport<const N: usize> {
    inbound: VecDeque<Frame<N>>,
    outbound: Vec<Frame<N>>,
    fail_next_poll: Option<String>,
    fail_next_read: Option<String>,
    fail_next_write: Option<String>,
    report_would_block: bool,
}

impl<const N: usize> MemoryTransport<N> {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            fail_next_poll: None,
            fail_next_read: None,
            fail_next_write: None,
            report_would_block: false,
        }
    }

    /// Queue a frame for the reader.
    pub fn push_inbound(&mut self, frame: Frame<N>) {
        self.inbound.push_back(frame);
    }

    /// Number of frames still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Every frame written so far, oldest first.
    pub fn outbound(&self) -> &[Frame<N>] {
        &self.outbound
    }

    /// The most recently written frame.
    pub fn last_outbound(&self) -> Option<&Frame<N>> {
        self.outbound.last()
    }

    /// Drain the outbound log.
    pub fn take_outbound(&mut self) -> Vec<Frame<N>> {
        std::mem::take(&mut self.outbound)
    }

    /// Fail the next readiness check with an injected error.
    pub fn fail_next_poll(&mut self, reason: impl Into<String>) {
        self.fail_next_poll = Some(reason.into());
    }

    /// Fail the next read with an injected error.
    pub fn fail_next_read(&mut self, reason: impl Into<String>) {
        self.fail_next_read = Some(reason.into());
    }

    /// Fail the next write with an injected error.
    pub fn fail_next_write(&mut self, reason: impl Into<String>) {
        self.fail_next_write = Some(reason.into());
    }

    /// Report an empty inbound queue as `Err(WouldBlock)` instead of
    /// `Ok(false)`, the way non-blocking descriptors do.
    pub fn set_report_would_block(&mut self, enabled: bool) {
        self.report_would_block = enabled;
    }
}

impl<const N: usize> FrameTransport<N> for MemoryTransport<N> {
    fn is_data_available(&mut self) -> Result<bool> {
        if let Some(reason) = self.fail_next_poll.take() {
            return Err(TransportError::Injected(reason));
        }
        if self.inbound.is_empty() && self.report_would_block {
            return Err(TransportError::WouldBlock);
        }
        Ok(!self.inbound.is_empty())
    }

    fn read(&mut self, frame: &mut Frame<N>) -> Result<()> {
        if let Some(reason) = self.fail_next_read.take() {
            // A failed read still consumes the frame, like a corrupted
            // transfer on a real link.
            self.inbound.pop_front();
            return Err(TransportError::Injected(reason));
        }
        match self.inbound.pop_front() {
            Some(next) => {
                *frame = next;
                Ok(())
            }
            None => Err(TransportError::WouldBlock),
        }
    }

    fn write(&mut self, frame: &Frame<N>) -> Result<()> {
        if let Some(reason) = self.fail_next_write.take() {
            return Err(TransportError::Injected(reason));
        }
        self.outbound.push(*frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u8) -> Frame<4> {
        Frame::new(id, 0, 0, &[id]).unwrap()
    }

    #[test]
    fn frames_are_read_in_order() {
        let mut transport = MemoryTransport::<4>::new();
        transport.push_inbound(frame(2));
        transport.push_inbound(frame(3));

        let mut buf = Frame::zeroed();
        assert!(transport.is_data_available().unwrap());
        transport.read(&mut buf).unwrap();
        assert_eq!(buf.id(), 2);
        transport.read(&mut buf).unwrap();
        assert_eq!(buf.id(), 3);
        assert!(!transport.is_data_available().unwrap());
    }

    #[test]
    fn writes_are_logged() {
        let mut transport = MemoryTransport::<4>::new();
        transport.write(&frame(7)).unwrap();
        transport.write(&frame(8)).unwrap();

        assert_eq!(transport.last_outbound().map(Frame::id), Some(8));
        let written = transport.take_outbound();
        assert_eq!(written.len(), 2);
        assert!(transport.outbound().is_empty());
    }

    #[test]
    fn injected_failures_fire_once() {
        let mut transport = MemoryTransport::<4>::new();
        transport.push_inbound(frame(2));
        transport.fail_next_poll("poll");
        transport.fail_next_write("write");

        assert!(matches!(
            transport.is_data_available(),
            Err(TransportError::Injected(_))
        ));
        assert!(transport.is_data_available().unwrap());

        assert!(transport.write(&frame(2)).is_err());
        assert!(transport.write(&frame(2)).is_ok());
    }

    #[test]
    fn failed_read_consumes_frame() {
        let mut transport = MemoryTransport::<4>::new();
        transport.push_inbound(frame(2));
        transport.fail_next_read("read");

        let mut buf = Frame::zeroed();
        assert!(transport.read(&mut buf).is_err());
        assert_eq!(transport.pending_inbound(), 0);
    }

    #[test]
    fn empty_queue_can_report_would_block() {
        let mut transport = MemoryTransport::<4>::new();
        transport.set_report_would_block(true);
        let err = transport.is_data_available().unwrap_err();
        assert!(err.is_would_block());
    }
}
