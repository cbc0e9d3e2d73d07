//! Error types for the Barbershop client
//!
//! Provides a unified error type for all operations. Callers must be able to
//! tell "server said no" (`Response`) apart from "network broke"
//! (`ConnectionFailure`), because only the latter is safe to resend.

use thiserror::Error;

/// Result type alias using BarbershopError
pub type Result<T> = std::result::Result<T, BarbershopError>;

/// Unified error type for Barbershop client operations
///
/// The enum is `Clone` so pipeline decoding can capture an error in place
/// of a reply element without consuming it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarbershopError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error(
        "Connection failure{}{} on {host}:{port}: {message}",
        command_suffix(.command),
        errno_suffix(.errno)
    )]
    ConnectionFailure {
        errno: Option<i32>,
        host: String,
        port: u16,
        message: String,
        /// The command in flight, filled in by the client driver
        command: Option<String>,
    },

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("Response error for {command}: {message}")]
    Response { command: String, message: String },

    #[error("Invalid response for {command}: {detail}")]
    InvalidResponse { command: String, detail: String },

    #[error("Authentication failure: {0}")]
    Authentication(String),

    // -------------------------------------------------------------------------
    // Client-side Errors
    // -------------------------------------------------------------------------
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BarbershopError {
    /// Build a connection failure from an I/O error on the given endpoint
    pub fn connection(host: &str, port: u16, err: &std::io::Error) -> Self {
        BarbershopError::ConnectionFailure {
            errno: err.raw_os_error(),
            host: host.to_string(),
            port,
            message: err.to_string(),
            command: None,
        }
    }

    /// Build a connection failure that has no underlying OS error
    pub fn connection_closed(host: &str, port: u16, message: impl Into<String>) -> Self {
        BarbershopError::ConnectionFailure {
            errno: None,
            host: host.to_string(),
            port,
            message: message.into(),
            command: None,
        }
    }

    pub fn invalid_response(command: &str, detail: impl Into<String>) -> Self {
        BarbershopError::InvalidResponse {
            command: command.to_string(),
            detail: detail.into(),
        }
    }

    /// Label a connection failure with the command that was in flight
    ///
    /// Other variants already carry their command and are returned as is.
    pub fn with_command(self, name: &str) -> Self {
        match self {
            BarbershopError::ConnectionFailure {
                errno,
                host,
                port,
                message,
                command: None,
            } => BarbershopError::ConnectionFailure {
                errno,
                host,
                port,
                message,
                command: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// True for transport-level failures, the only kind the driver retries
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, BarbershopError::ConnectionFailure { .. })
    }

    /// True when the server answered with a `-` error line
    pub fn is_response_error(&self) -> bool {
        matches!(self, BarbershopError::Response { .. })
    }
}

fn command_suffix(command: &Option<String>) -> String {
    match command {
        Some(name) => format!(" during {}", name),
        None => String::new(),
    }
}

fn errno_suffix(errno: &Option<i32>) -> String {
    match errno {
        Some(code) => format!(" (errno {})", code),
        None => String::new(),
    }
}
