//! Error types and handling for Memlink

/// Result type alias for Memlink operations
pub type Result<T> = std::result::Result<T, MemlinkError>;

/// Error types for the shared memory handoff protocol
#[derive(Debug, thiserror::Error)]
pub enum MemlinkError {
    /// Backend could not create the shared region (resource exhaustion,
    /// permissions, or the backend is unavailable on this platform)
    #[error("Allocation error: {message}")]
    Allocation { message: String },

    /// A handle could not be mapped into the caller's address space
    #[error("Mapping error: {message}")]
    Mapping { message: String },

    /// The channel endpoint could not be set up or reached
    #[error("Connect error: {message}")]
    Connect { message: String },

    /// Socket send failure other than interruption
    #[error("Send error: {message}")]
    Send { message: String },

    /// Socket receive failure other than interruption
    #[error("Receive error: {message}")]
    Receive { message: String },

    /// Received message does not match the single-handle framing.
    /// Never reinterpreted: a wrong handle value would silently alias
    /// an unrelated kernel object.
    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    /// Write attempted through a read-only view
    #[error("View is read-only")]
    ReadOnly,

    /// Slot access beyond the mapped size
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// I/O related errors (socket setup, descriptor operations)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl MemlinkError {
    /// Create an allocation error
    pub fn allocation(message: impl Into<String>) -> Self {
        Self::Allocation {
            message: message.into(),
        }
    }

    /// Create a mapping error
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Create a connect error
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Create a send error
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }

    /// Create a receive error
    pub fn receive(message: impl Into<String>) -> Self {
        Self::Receive {
            message: message.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for MemlinkError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MemlinkError::allocation("out of memory");
        assert!(matches!(err, MemlinkError::Allocation { .. }));

        let err = MemlinkError::malformed("bad control length");
        assert!(matches!(err, MemlinkError::MalformedMessage { .. }));

        let err = MemlinkError::insufficient_space(8, 4);
        assert!(matches!(err, MemlinkError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = MemlinkError::mapping("mmap failed");
        let display = format!("{}", err);
        assert!(display.contains("Mapping error"));
        assert!(display.contains("mmap failed"));

        let err = MemlinkError::insufficient_space(8, 4);
        let display = format!("{}", err);
        assert!(display.contains("requested 8"));
        assert!(display.contains("available 4"));
    }
}
