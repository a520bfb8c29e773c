//! Peer side of the alternating-bit protocol.
//!
//! [`StopAndWaitSender`] keeps one sequence bit per identifier. A reliable
//! send writes the frame and waits for a reply on the same identifier whose
//! acknowledgment equals the sequence it sent, retransmitting the identical
//! frame until one arrives or the attempt budget runs out.

use std::time::{Duration, Instant};

use framemux_frame::{Frame, FrameError};
use framemux_transport::{FrameTransport, TransportError};
use tracing::{debug, warn};

/// Errors from [`StopAndWaitSender`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),

    /// Every attempt went unacknowledged. The sequence bit is not advanced.
    #[error("no acknowledgment for id {id} seq {seq} after {attempts} attempts")]
    Exhausted { id: u8, seq: u8, attempts: u32 },

    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

/// Retransmission timing for [`StopAndWaitSender`].
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// How long to wait for an acknowledgment before retransmitting.
    pub retransmit_after: Duration,
    /// Total transmissions of one frame, the first included.
    pub max_attempts: u32,
    /// Sleep between readiness checks while waiting.
    pub poll_interval: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            retransmit_after: Duration::from_millis(200),
            max_attempts: 5,
            poll_interval: Duration::from_millis(2),
        }
    }
}

impl SenderConfig {
    /// Longest a send can wait across all attempts.
    pub fn total_wait(&self) -> Duration {
        self.retransmit_after
            .saturating_mul(self.max_attempts.max(1))
    }
}

/// Sends frames to a dispatcher and waits for the replies.
pub struct StopAndWaitSender<T, const N: usize> {
    transport: T,
    config: SenderConfig,
    next_seq: [u8; 256],
}

impl<T: FrameTransport<N>, const N: usize> StopAndWaitSender<T, N> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SenderConfig::default())
    }

    pub fn with_config(transport: T, config: SenderConfig) -> Self {
        Self {
            transport,
            config,
            next_seq: [0; 256],
        }
    }

    /// Sequence number the next reliable send on `id` will carry.
    pub fn next_seq(&self, id: u8) -> u8 {
        self.next_seq[usize::from(id)]
    }

    /// Start `id` over at sequence 0.
    ///
    /// Required after a session-control frame the receiver answered with a
    /// session reset while it was awaiting sequence 0: the receiver stays at
    /// sequence 0 but this sender has moved on to 1.
    pub fn reset(&mut self, id: u8) {
        self.next_seq[usize::from(id)] = 0;
    }

    /// Start every identifier over at sequence 0.
    pub fn reset_all(&mut self) {
        self.next_seq = [0; 256];
    }

    /// Send `payload` on a reliable identifier and return the acknowledging
    /// reply.
    ///
    /// A reply to a retransmission the receiver had already processed comes
    /// back with a zeroed payload. Such a reply is indistinguishable from the
    /// duplicate answer a receiver gives when the two sides are out of step,
    /// so after a disconnect sent at sequence 0 call
    /// [`reset`](Self::reset) on
    /// [`SESSION_CONTROL`](framemux_frame::SESSION_CONTROL) before the next send.
    pub fn send_reliable(&mut self, id: u8, payload: &[u8]) -> Result<Frame<N>, SendError> {
        let seq = self.next_seq(id);
        let frame = Frame::<N>::new(id, seq, 0, payload)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            self.transport.write(&frame)?;
            debug!(id, seq, attempt, "frame sent");

            let window = self.config.retransmit_after;
            if let Some(reply) = self.await_reply(id, window, |reply| reply.ack() == seq)? {
                self.next_seq[usize::from(id)] = seq ^ 1;
                debug!(id, seq, attempt, "frame acknowledged");
                return Ok(reply);
            }
            if attempt < attempts {
                warn!(id, seq, attempt, "no acknowledgment, retransmitting");
            }
        }

        Err(SendError::Exhausted { id, seq, attempts })
    }

    /// Send `payload` once on an unreliable identifier and wait for the echo.
    pub fn send_unreliable(&mut self, id: u8, payload: &[u8]) -> Result<Frame<N>, SendError> {
        let frame = Frame::<N>::new(id, 0, 0, payload)?;
        self.transport.write(&frame)?;
        debug!(id, "unreliable frame sent");

        let window = self.config.total_wait();
        self.await_reply(id, window, |_| true)?
            .ok_or(SendError::Timeout(window))
    }

    fn await_reply(
        &mut self,
        id: u8,
        window: Duration,
        accept: impl Fn(&Frame<N>) -> bool,
    ) -> Result<Option<Frame<N>>, SendError> {
        let deadline = Instant::now() + window;
        loop {
            let ready = match self.transport.is_data_available() {
                Ok(ready) => ready,
                Err(err) if err.is_would_block() => false,
                Err(err) => return Err(err.into()),
            };

            if ready {
                let mut reply = Frame::zeroed();
                match self.transport.read(&mut reply) {
                    Ok(()) if reply.id() == id && accept(&reply) => return Ok(Some(reply)),
                    Ok(()) => {
                        debug!(
                            id = reply.id(),
                            seq = reply.seq(),
                            ack = reply.ack(),
                            "stale reply ignored"
                        );
                    }
                    Err(err) if err.is_would_block() => {}
                    Err(err) => return Err(err.into()),
                }
                continue;
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T, const N: usize> std::fmt::Debug for StopAndWaitSender<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopAndWaitSender")
            .field("frame_len", &N)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use framemux_transport::MemoryTransport;

    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::handler::{handler_fn, Outcome};

    fn quick() -> SenderConfig {
        SenderConfig {
            retransmit_after: Duration::from_millis(5),
            max_attempts: 3,
            poll_interval: Duration::from_millis(1),
        }
    }

    /// Feeds every written frame straight into a dispatcher and collects its
    /// replies, optionally losing some of them on the way back.
    struct Loopback {
        dispatcher: Dispatcher<MemoryTransport<8>, 8>,
        replies: VecDeque<Frame<8>>,
        drop_replies: usize,
    }

    impl Loopback {
        fn new() -> Self {
            let mut dispatcher = Dispatcher::new(MemoryTransport::new());
            dispatcher
                .register(handler_fn(5, true, |payload: &mut [u8]| {
                    payload[0] = payload[0].wrapping_mul(2);
                    Ok(Outcome::Normal)
                }))
                .unwrap();
            Self {
                dispatcher,
                replies: VecDeque::new(),
                drop_replies: 0,
            }
        }
    }

    impl FrameTransport<8> for Loopback {
        fn is_data_available(&mut self) -> framemux_transport::Result<bool> {
            Ok(!self.replies.is_empty())
        }

        fn read(&mut self, frame: &mut Frame<8>) -> framemux_transport::Result<()> {
            *frame = self.replies.pop_front().ok_or(TransportError::WouldBlock)?;
            Ok(())
        }

        fn write(&mut self, frame: &Frame<8>) -> framemux_transport::Result<()> {
            self.dispatcher.transport_mut().push_inbound(*frame);
            let _ = self.dispatcher.poll_once();
            for reply in self.dispatcher.transport_mut().take_outbound() {
                if self.drop_replies > 0 {
                    self.drop_replies -= 1;
                } else {
                    self.replies.push_back(reply);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn reliable_send_alternates_sequence() {
        let mut sender = StopAndWaitSender::with_config(Loopback::new(), quick());

        let reply = sender.send_reliable(5, &[3]).unwrap();
        assert_eq!((reply.seq(), reply.ack()), (0, 0));
        assert_eq!(reply.payload()[0], 6);
        assert_eq!(sender.next_seq(5), 1);

        let reply = sender.send_reliable(5, &[4]).unwrap();
        assert_eq!((reply.seq(), reply.ack()), (1, 1));
        assert_eq!(reply.payload()[0], 8);
        assert_eq!(sender.next_seq(5), 0);
    }

    #[test]
    fn lost_acknowledgment_is_recovered_without_reprocessing() {
        let mut loopback = Loopback::new();
        loopback.drop_replies = 1;
        let mut sender = StopAndWaitSender::with_config(loopback, quick());

        let reply = sender.send_reliable(5, &[3]).unwrap();
        assert_eq!(reply.ack(), 0);
        assert!(reply.payload().iter().all(|&b| b == 0));
        assert_eq!(sender.transport().dispatcher.stats().accepted, 1);
        assert_eq!(sender.transport().dispatcher.stats().duplicates, 1);

        // The channels are still in step.
        let reply = sender.send_reliable(5, &[7]).unwrap();
        assert_eq!(reply.payload()[0], 14);
    }

    #[test]
    fn exhausted_when_nothing_answers() {
        let mut sender = StopAndWaitSender::with_config(MemoryTransport::<8>::new(), quick());

        let err = sender.send_reliable(5, &[1]).unwrap_err();
        assert!(matches!(
            err,
            SendError::Exhausted {
                id: 5,
                seq: 0,
                attempts: 3
            }
        ));
        let sent = sender.transport().outbound();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|frame| *frame == sent[0]));
        assert_eq!(sender.next_seq(5), 0);
    }

    #[test]
    fn mismatched_replies_are_skipped() {
        let mut transport = MemoryTransport::<8>::new();
        transport.push_inbound(Frame::new(6, 0, 0, &[]).unwrap());
        transport.push_inbound(Frame::new(5, 0, 1, &[]).unwrap());
        transport.push_inbound(Frame::new(5, 0, 0, &[9]).unwrap());
        let mut sender = StopAndWaitSender::with_config(transport, quick());

        let reply = sender.send_reliable(5, &[1]).unwrap();
        assert_eq!(reply.payload()[0], 9);
        assert_eq!(sender.transport().outbound().len(), 1);
    }

    #[test]
    fn reset_returns_to_sequence_zero() {
        let mut sender = StopAndWaitSender::with_config(Loopback::new(), quick());
        sender.send_reliable(5, &[1]).unwrap();
        assert_eq!(sender.next_seq(5), 1);

        sender.reset(5);
        assert_eq!(sender.next_seq(5), 0);
    }

    #[test]
    fn unreliable_send_times_out() {
        let mut sender = StopAndWaitSender::with_config(MemoryTransport::<8>::new(), quick());
        let err = sender.send_unreliable(9, &[1]).unwrap_err();
        assert!(matches!(err, SendError::Timeout(_)));
        assert_eq!(sender.transport().outbound().len(), 1);
    }

    #[test]
    fn oversized_payload_rejected_before_sending() {
        let mut sender = StopAndWaitSender::with_config(MemoryTransport::<8>::new(), quick());
        let err = sender.send_reliable(5, &[0; 6]).unwrap_err();
        assert!(matches!(err, SendError::Frame(FrameError::PayloadTooLarge { .. })));
        assert!(sender.transport().outbound().is_empty());
    }
}
