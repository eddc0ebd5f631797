//! Error types for alicat.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport faults, caller mistakes and
//! cancellation are captured here. A bounded poll that receives no answer is
//! *not* an error: it is reported as `Ok(None)` by the operations that poll.

/// The error type for all alicat operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened or written).
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport read window elapsed with no data.
    ///
    /// The line reader treats this as "no data yet"; it only surfaces from
    /// direct [`Transport::receive`](crate::transport::Transport::receive)
    /// calls.
    #[error("timeout waiting for data")]
    Timeout,

    /// A unit identifier was empty or contained characters that would
    /// corrupt the command line.
    #[error("invalid unit id: {0:?}")]
    InvalidUnitId(String),

    /// An invalid parameter was passed to an instrument command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the instrument has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A pending request or streaming session was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error originated at the I/O boundary.
    ///
    /// Transport faults are non-fatal: the session that produced one stays
    /// usable for the next command.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
