use framemux_frame::{Frame, HEADER_SIZE, SESSION_CONTROL};
use framemux_transport::FrameTransport;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, Result};
use crate::handler::{Handler, Outcome};
use crate::registry::HandlerRegistry;
use crate::reliability::{ChannelState, Verdict};
use crate::session::SessionControl;

/// How a routed frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Unreliable handler invoked; reply echoes the handler's buffer.
    Unreliable,
    /// New frame on a reliable channel; handler invoked.
    Accepted { ack: u8 },
    /// Retransmission on a reliable channel; handler not invoked.
    Duplicate { ack: u8 },
}

/// Result of one [`Dispatcher::poll_once`] call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// Nothing to read.
    Idle,
    /// One frame was read, routed and answered.
    Delivered { id: u8, delivery: Delivery },
}

/// Running counters kept by a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub frames_received: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub unreliable: u64,
    pub unknown: u64,
    pub handler_errors: u64,
    pub transport_errors: u64,
    pub session_resets: u64,
}

/// Polls a transport and routes each frame to its handler.
///
/// Owns the transport, the handler registry (with reliability state) and the
/// ensured-registration queue. The session-control handler is registered at
/// construction, before anything else.
pub struct Dispatcher<T, const N: usize> {
    transport: T,
    registry: HandlerRegistry,
    stats: DispatchStats,
}

impl<T: FrameTransport<N>, const N: usize> Dispatcher<T, N> {
    const FRAME_FITS_PAYLOAD: () = assert!(
        N > HEADER_SIZE,
        "frame length must be at least the header length plus one payload byte"
    );

    /// Dispatcher with the default [`SessionControl`] handler.
    pub fn new(transport: T) -> Self {
        Self::seeded(transport, Box::new(SessionControl::new()))
    }

    /// Dispatcher with a custom session-control handler, which must use the
    /// [`SESSION_CONTROL`] identifier.
    pub fn with_session_control<H: Handler + 'static>(transport: T, session: H) -> Result<Self> {
        if session.id() != SESSION_CONTROL {
            return Err(DispatchError::InvalidSessionHandler(session.id()));
        }
        Ok(Self::seeded(transport, Box::new(session)))
    }

    fn seeded(transport: T, session: Box<dyn Handler>) -> Self {
        let () = Self::FRAME_FITS_PAYLOAD;
        Self {
            transport,
            registry: HandlerRegistry::seeded(session),
            stats: DispatchStats::default(),
        }
    }

    /// Register a handler. Fails if its identifier is taken.
    pub fn register<H: Handler + 'static>(&mut self, handler: H) -> Result<()> {
        self.registry.register(handler)
    }

    /// Remove a handler and its reliability channel. No-op if absent.
    pub fn deregister(&mut self, id: u8) -> Option<Box<dyn Handler>> {
        self.registry.deregister(id)
    }

    /// Registered identifiers, session control excluded.
    pub fn list_ids(&self) -> Vec<u8> {
        self.registry.list_ids()
    }

    /// Queue a deferred registration; see [`HandlerRegistry::enqueue_ensured`].
    pub fn enqueue_ensured<F, H>(&mut self, factory: F)
    where
        F: FnMut() -> H + Send + 'static,
        H: Handler + 'static,
    {
        self.registry.enqueue_ensured(factory);
    }

    /// Apply queued registrations; see [`HandlerRegistry::drain_ensured`].
    pub fn drain_ensured(&mut self) -> Result<()> {
        self.registry.drain_ensured()
    }

    /// Current reliability state for `id`, if it is a reliable channel.
    pub fn channel_state(&self, id: u8) -> Option<ChannelState> {
        self.registry.channel_state(id)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Swap in a new transport for a new peer and return the old one.
    ///
    /// Every reliable channel restarts at `AwaitingEven`, since the new peer
    /// begins its sequences at 0.
    pub fn replace_transport(&mut self, transport: T) -> T {
        self.registry.reset_channels();
        info!("transport replaced; reliable channels reset");
        std::mem::replace(&mut self.transport, transport)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Process at most one inbound frame.
    ///
    /// Returns [`LoopStatus::Idle`] when nothing is waiting. Every frame that
    /// is read gets exactly one reply write. Errors are reported for the
    /// caller's diagnostics only; the dispatcher is ready for the next call
    /// either way.
    pub fn poll_once(&mut self) -> Result<LoopStatus> {
        match self.transport.is_data_available() {
            Ok(true) => {}
            Ok(false) => return Ok(LoopStatus::Idle),
            Err(err) if err.is_would_block() => return Ok(LoopStatus::Idle),
            Err(err) => {
                warn!(error = %err, "readiness check failed");
                self.stats.transport_errors += 1;
                return Err(err.into());
            }
        }

        let mut frame = Frame::<N>::zeroed();
        match self.transport.read(&mut frame) {
            Ok(()) => {}
            Err(err) if err.is_would_block() => return Ok(LoopStatus::Idle),
            Err(err) => {
                warn!(error = %err, "frame read failed");
                self.stats.transport_errors += 1;
                return Err(err.into());
            }
        }
        self.stats.frames_received += 1;

        let id = frame.id();
        let Some(route) = self.registry.route(id) else {
            return self.reply_unknown(frame);
        };

        let delivery = match route.channel {
            Some(state) => deliver_reliable(route.handler, state, &mut frame, &mut self.stats),
            None => {
                invoke(route.handler, &mut frame, &mut self.stats);
                self.stats.unreliable += 1;
                Delivery::Unreliable
            }
        };
        debug!(
            id,
            seq = frame.seq(),
            ack = frame.ack(),
            ?delivery,
            "frame dispatched"
        );

        self.write_reply(&frame)?;
        Ok(LoopStatus::Delivered { id, delivery })
    }

    fn reply_unknown(&mut self, mut frame: Frame<N>) -> Result<LoopStatus> {
        let id = frame.id();
        warn!(id, "no handler for identifier");
        self.stats.unknown += 1;

        frame.clear_payload();
        if let Err(err) = self.transport.write(&frame) {
            warn!(id, error = %err, "reply to unregistered identifier failed");
            self.stats.transport_errors += 1;
        }
        Err(DispatchError::UnknownIdentifier(id))
    }

    fn write_reply(&mut self, frame: &Frame<N>) -> Result<()> {
        self.transport.write(frame).map_err(|err| {
            warn!(id = frame.id(), error = %err, "reply write failed");
            self.stats.transport_errors += 1;
            err.into()
        })
    }
}

fn deliver_reliable<const N: usize>(
    handler: &mut dyn Handler,
    state: &mut ChannelState,
    frame: &mut Frame<N>,
    stats: &mut DispatchStats,
) -> Delivery {
    let id = frame.id();
    match state.classify(frame.seq()) {
        Verdict::Accept { ack } => {
            let outcome = invoke(handler, frame, stats);
            frame.set_ack(ack);
            if id == SESSION_CONTROL && outcome == Outcome::SessionReset {
                stats.session_resets += 1;
            }
            *state = state.after_accept(id, outcome);
            stats.accepted += 1;
            Delivery::Accepted { ack }
        }
        Verdict::Duplicate { ack } => {
            frame.clear_payload();
            frame.set_ack(ack);
            stats.duplicates += 1;
            debug!(id, seq = frame.seq(), ack, "duplicate suppressed");
            Delivery::Duplicate { ack }
        }
    }
}

/// Run the handler on the frame's payload. A handler failure is logged and
/// treated as a normal outcome; the buffer is replied as it stands.
fn invoke<const N: usize>(
    handler: &mut dyn Handler,
    frame: &mut Frame<N>,
    stats: &mut DispatchStats,
) -> Outcome {
    match handler.on_frame(frame.payload_mut()) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(id = frame.id(), error = %err, "handler failed");
            stats.handler_errors += 1;
            Outcome::Normal
        }
    }
}

impl<T, const N: usize> std::fmt::Debug for Dispatcher<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("frame_len", &N)
            .field("registry", &self.registry)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
