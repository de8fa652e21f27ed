// src/link/error.rs
//
// Error type for serial link operations.

use std::fmt;

/// Errors surfaced by the link.
///
/// Nothing here is escalated to a process failure; every operation degrades
/// to a return value and leaves recovery to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkError {
    /// The device could not be opened or configured.
    Open { port: String, reason: String },
    /// An I/O call on an open link failed. `operation` names the failing
    /// step ("read", "write", "enumerate").
    Io {
        operation: &'static str,
        reason: String,
    },
    /// The supplied settings cannot produce a usable link.
    Configuration(String),
}

impl LinkError {
    /// Open/configure failure for the named port.
    pub fn open(port: impl Into<String>, reason: impl ToString) -> Self {
        LinkError::Open {
            port: port.into(),
            reason: reason.to_string(),
        }
    }

    /// I/O failure during the named operation.
    pub fn io(operation: &'static str, reason: impl ToString) -> Self {
        LinkError::Io {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Rejected configuration.
    pub fn configuration(msg: impl Into<String>) -> Self {
        LinkError::Configuration(msg.into())
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Open { port, reason } => {
                write!(f, "Failed to open {}: {}", port, reason)
            }
            LinkError::Io { operation, reason } => {
                write!(f, "Serial {} error: {}", operation, reason)
            }
            LinkError::Configuration(msg) => {
                write!(f, "Invalid link configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for LinkError {}

// ============================================================================
// Tests
// ============================================================================
