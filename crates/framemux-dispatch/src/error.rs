/// Errors reported by registration and by the frame loop.
///
/// None of these are fatal: the dispatcher stays usable after every one of
/// them and the next [`poll_once`](crate::Dispatcher::poll_once) proceeds
/// normally.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A handler with this identifier is already registered.
    #[error("identifier {0} is already registered")]
    DuplicateIdentifier(u8),

    /// A frame arrived for an identifier with no handler. A zeroed courtesy
    /// reply has already been sent.
    #[error("no handler registered for identifier {0}")]
    UnknownIdentifier(u8),

    /// Readiness check, read or write failed.
    #[error("transport error: {0}")]
    Transport(#[from] framemux_transport::TransportError),

    /// A replacement session-control handler used the wrong identifier.
    #[error("session-control handler must use identifier {expected}, got {0}", expected = framemux_frame::SESSION_CONTROL)]
    InvalidSessionHandler(u8),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
