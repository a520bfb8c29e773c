/// Errors that can occur while building frames.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The payload does not fit in the frame's payload region.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A raw buffer did not have exactly the frame length.
    #[error("frame length mismatch ({actual} bytes, expected {expected})")]
    LengthMismatch { actual: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
