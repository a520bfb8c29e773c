//! The handler contract.

/// What a handler reports after processing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Frame processed; advance reliability state as usual.
    Normal,
    /// The handler just tore down a session. Only honoured for the
    /// session-control identifier, where it returns the channel to
    /// [`ChannelState::AwaitingEven`](crate::ChannelState::AwaitingEven).
    SessionReset,
}

/// Failure inside [`Handler::on_frame`].
///
/// The dispatcher logs these and still sends the reply with whatever the
/// handler left in the payload buffer.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The payload asked for an operation the handler does not implement.
    #[error("unsupported operation 0x{0:02x}")]
    UnsupportedOperation(u8),

    /// Any other handler-specific failure.
    #[error("{0}")]
    Failed(String),
}

/// Processes the payload of frames carrying one identifier.
pub trait Handler: Send {
    /// The identifier this handler serves. Must not change after registration.
    fn id(&self) -> u8;

    /// Whether frames for this identifier go through the alternating-bit
    /// channel. Must not change after registration.
    fn is_reliable(&self) -> bool;

    /// Consume the inbound payload and leave the reply body in its place.
    fn on_frame(&mut self, payload: &mut [u8]) -> Result<Outcome, HandlerError>;
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn id(&self) -> u8 {
        (**self).id()
    }

    fn is_reliable(&self) -> bool {
        (**self).is_reliable()
    }

    fn on_frame(&mut self, payload: &mut [u8]) -> Result<Outcome, HandlerError> {
        (**self).on_frame(payload)
    }
}

/// A handler backed by a closure.
pub struct FnHandler<F> {
    id: u8,
    reliable: bool,
    func: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(&mut [u8]) -> Result<Outcome, HandlerError> + Send,
{
    pub fn new(id: u8, reliable: bool, func: F) -> Self {
        Self { id, reliable, func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: FnMut(&mut [u8]) -> Result<Outcome, HandlerError> + Send,
{
    fn id(&self) -> u8 {
        self.id
    }

    fn is_reliable(&self) -> bool {
        self.reliable
    }

    fn on_frame(&mut self, payload: &mut [u8]) -> Result<Outcome, HandlerError> {
        (self.func)(payload)
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler")
            .field("id", &self.id)
            .field("reliable", &self.reliable)
            .finish_non_exhaustive()
    }
}

/// Build a handler from a closure.
///
/// ```
/// use framemux_dispatch::{handler_fn, Handler, Outcome};
///
/// let mut doubler = handler_fn(5, true, |payload: &mut [u8]| {
///     payload[0] = payload[0].wrapping_mul(2);
///     Ok(Outcome::Normal)
/// });
/// let mut payload = [3u8, 0, 0];
/// doubler.on_frame(&mut payload).unwrap();
/// assert_eq!(payload, [6, 0, 0]);
/// ```
pub fn handler_fn<F>(id: u8, reliable: bool, func: F) -> FnHandler<F>
where
    F: FnMut(&mut [u8]) -> Result<Outcome, HandlerError> + Send,
{
    FnHandler::new(id, reliable, func)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_handler_reports_identity() {
        let handler = handler_fn(9, false, |_payload: &mut [u8]| Ok(Outcome::Normal));
        assert_eq!(handler.id(), 9);
        assert!(!handler.is_reliable());
    }

    #[test]
    fn closure_handler_keeps_state_between_frames() {
        let mut count = 0u8;
        let mut handler = handler_fn(2, true, move |payload: &mut [u8]| {
            count += 1;
            payload[0] = count;
            Ok(Outcome::Normal)
        });

        let mut payload = [0u8; 2];
        handler.on_frame(&mut payload).unwrap();
        handler.on_frame(&mut payload).unwrap();
        assert_eq!(payload[0], 2);
    }

    #[test]
    fn boxed_handler_delegates() {
        let mut boxed: Box<dyn Handler> = Box::new(handler_fn(3, true, |payload: &mut [u8]| {
            payload.fill(0xEE);
            Err(HandlerError::Failed("partial".to_string()))
        }));
        let mut payload = [0u8; 2];
        let err = boxed.on_frame(&mut payload).unwrap_err();
        assert_eq!(err.to_string(), "partial");
        assert_eq!(payload, [0xEE, 0xEE]);
        assert_eq!(boxed.id(), 3);
    }

    #[test]
    fn unsupported_operation_message() {
        assert_eq!(
            HandlerError::UnsupportedOperation(0x7f).to_string(),
            "unsupported operation 0x7f"
        );
    }
}
