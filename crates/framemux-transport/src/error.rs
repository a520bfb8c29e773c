use std::path::PathBuf;

/// Errors that can occur in frame transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the underlying channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// No frame is available yet. Not a failure.
    #[error("no frame available yet")]
    WouldBlock,

    /// The remote end closed the channel.
    #[error("transport closed")]
    Closed,

    /// A failure injected by a test transport.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl TransportError {
    /// True for the "no data yet" condition, which callers treat as a
    /// normal idle outcome rather than a failure.
    pub fn is_would_block(&self) -> bool {
        match self {
            TransportError::WouldBlock => true,
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::WouldBlock,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_block_variants() {
        assert!(TransportError::WouldBlock.is_would_block());
        assert!(
            TransportError::Io(std::io::Error::from(std::io::ErrorKind::WouldBlock))
                .is_would_block()
        );
        assert!(!TransportError::Closed.is_would_block());
        assert!(
            !TransportError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
                .is_would_block()
        );
    }
}
