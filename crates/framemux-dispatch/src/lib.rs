//! Frame dispatch with per-identifier reliable delivery.
//!
//! A [`Dispatcher`] owns one [`FrameTransport`](framemux_transport::FrameTransport)
//! and a registry of [`Handler`]s keyed by the frame's identifier byte. Each
//! call to [`Dispatcher::poll_once`] moves at most one frame through the
//! system: read, route, invoke, reply.
//!
//! Handlers that declare themselves reliable get a receiver-side
//! alternating-bit channel: duplicates of the last accepted frame are
//! re-acknowledged without reaching the handler again.

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod reliability;
pub mod sender;
pub mod session;

pub use dispatcher::{Delivery, DispatchStats, Dispatcher, LoopStatus};
pub use error::{DispatchError, Result};
pub use handler::{handler_fn, FnHandler, Handler, HandlerError, Outcome};
pub use registry::HandlerRegistry;
pub use reliability::{ChannelState, ReliabilityTable, Verdict};
pub use sender::{SendError, SenderConfig, StopAndWaitSender};
pub use session::{SessionControl, SessionOp};
