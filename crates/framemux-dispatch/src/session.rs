//! Built-in session-control handler.
//!
//! Lives at [`SESSION_CONTROL`] and is always registered before any other
//! handler. Its channel is reliable. The first payload byte selects the
//! operation:
//!
//! | opcode | operation | reply payload | outcome |
//! |---|---|---|---|
//! | `0x00` | keepalive | unchanged | `Normal` |
//! | `0x01` | connect | `[0x01, 0x01, 0, ...]` | `Normal` |
//! | `0x02` | disconnect | all zero | `SessionReset` |

use framemux_frame::SESSION_CONTROL;
use tracing::{debug, info};

use crate::handler::{Handler, HandlerError, Outcome};

/// Session-control operations, carried in the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionOp {
    Keepalive = 0x00,
    Connect = 0x01,
    Disconnect = 0x02,
}

impl TryFrom<u8> for SessionOp {
    type Error = HandlerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SessionOp::Keepalive),
            0x01 => Ok(SessionOp::Connect),
            0x02 => Ok(SessionOp::Disconnect),
            other => Err(HandlerError::UnsupportedOperation(other)),
        }
    }
}

/// Byte written after the connect opcode when a session is accepted.
pub const CONNECT_ACCEPTED: u8 = 0x01;

/// Default session-control handler.
#[derive(Debug, Default)]
pub struct SessionControl {
    connected: bool,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connect has been seen since the last disconnect.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Handler for SessionControl {
    fn id(&self) -> u8 {
        SESSION_CONTROL
    }

    fn is_reliable(&self) -> bool {
        true
    }

    fn on_frame(&mut self, payload: &mut [u8]) -> Result<Outcome, HandlerError> {
        let Some(&opcode) = payload.first() else {
            return Err(HandlerError::Failed("empty session payload".to_string()));
        };
        let op = SessionOp::try_from(opcode)?;
        match op {
            SessionOp::Keepalive => {
                debug!("session keepalive");
                Ok(Outcome::Normal)
            }
            SessionOp::Connect => {
                payload[1..].fill(0);
                if let Some(status) = payload.get_mut(1) {
                    *status = CONNECT_ACCEPTED;
                }
                self.connected = true;
                info!("session connected");
                Ok(Outcome::Normal)
            }
            SessionOp::Disconnect => {
                payload.fill(0);
                self.connected = false;
                info!("session disconnected");
                Ok(Outcome::SessionReset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_reserved_and_reliable() {
        let session = SessionControl::new();
        assert_eq!(session.id(), SESSION_CONTROL);
        assert!(session.is_reliable());
    }

    #[test]
    fn keepalive_echoes_payload() {
        let mut session = SessionControl::new();
        let mut payload = [0x00, 7, 8];
        assert_eq!(session.on_frame(&mut payload).unwrap(), Outcome::Normal);
        assert_eq!(payload, [0x00, 7, 8]);
    }

    #[test]
    fn connect_reports_acceptance() {
        let mut session = SessionControl::new();
        let mut payload = [0x01, 9, 9, 9];
        assert_eq!(session.on_frame(&mut payload).unwrap(), Outcome::Normal);
        assert_eq!(payload, [0x01, CONNECT_ACCEPTED, 0, 0]);
        assert!(session.is_connected());
    }

    #[test]
    fn connect_fits_single_byte_payload() {
        let mut session = SessionControl::new();
        let mut payload = [0x01];
        assert_eq!(session.on_frame(&mut payload).unwrap(), Outcome::Normal);
        assert_eq!(payload, [0x01]);
    }

    #[test]
    fn disconnect_requests_reset() {
        let mut session = SessionControl::new();
        session.on_frame(&mut [0x01, 0]).unwrap();

        let mut payload = [0x02, 5, 5];
        assert_eq!(
            session.on_frame(&mut payload).unwrap(),
            Outcome::SessionReset
        );
        assert_eq!(payload, [0, 0, 0]);
        assert!(!session.is_connected());
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let mut session = SessionControl::new();
        let err = session.on_frame(&mut [0x42, 0]).unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedOperation(0x42)));
    }
}
