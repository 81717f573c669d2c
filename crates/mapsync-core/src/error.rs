//! Error types shared by every mapsync crate

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Fragment Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to write fragment: {message}")]
    FragmentWrite { message: String },

    #[error("Invalid link: {message}")]
    InvalidLink { message: String },

    // ─────────────────────────────────────────────────────────────
    // Event Dispatch Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Event handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("Channel send error: {message}")]
    ChannelSend { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn fragment_write(message: impl Into<String>) -> Self {
        Self::FragmentWrite {
            message: message.into(),
        }
    }

    pub fn invalid_link(message: impl Into<String>) -> Self {
        Self::InvalidLink {
            message: message.into(),
        }
    }

    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FragmentWrite { .. }
                | Error::Handler { .. }
                | Error::ChannelSend { .. }
                | Error::Json(_)
        )
    }

    /// Check if this error should abort the driver process.
    ///
    /// Nothing raised inside the synchronization core is fatal; only
    /// startup problems of the headless driver are.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidLink { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::fragment_write("disk full");
        assert_eq!(err.to_string(), "Failed to write fragment: disk full");

        let err = Error::handler("url_synchronizer", "boom");
        assert_eq!(
            err.to_string(),
            "Event handler 'url_synchronizer' failed: boom"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_core_errors_are_not_fatal() {
        assert!(!Error::fragment_write("x").is_fatal());
        assert!(!Error::handler("h", "x").is_fatal());
        assert!(!Error::config("bad toml").is_fatal());
        assert!(Error::invalid_link("no fragment").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::fragment_write("x").is_recoverable());
        assert!(Error::handler("h", "x").is_recoverable());
        assert!(Error::channel_send("closed").is_recoverable());
        assert!(!Error::config("bad toml").is_recoverable());
    }

    #[test]
    fn test_result_ext_keeps_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("writing fragment").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
