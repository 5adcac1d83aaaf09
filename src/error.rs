//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
///
/// Variants are grouped by origin so callers can tell "fix your input"
/// (argument errors) from "network problem" (transport errors) from
/// "server rejected the transaction" (protocol errors).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connecting to the server failed.
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Sending data to the server failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Receiving data from the server failed.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Reply shorter than the minimum 3 digits plus delimiter.
    #[error("reply too short")]
    ReplyTooShort,

    /// Reply did not begin with a 3-digit completion code.
    #[error("malformed reply: {0}")]
    ReplyMalformed(String),

    /// Server returned a reply the issued command does not accept.
    #[error("server replied {code}: {message}")]
    Reply {
        /// Completion code (e.g. 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Server rejected the AUTH credentials (reply code 535).
    #[error("authentication failed")]
    AuthFailed,

    /// Credentials could not be encoded for the AUTH exchange.
    #[error("credential encoding failed")]
    Encode,

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Address exceeds the RFC 2821 local-part/domain length limits.
    #[error("address too long: {len} octets (max {max})")]
    AddressTooLong {
        /// Actual length in octets.
        len: usize,
        /// Permitted maximum.
        max: usize,
    },

    /// Display name exceeds the configured maximum length.
    #[error("display name too long: {len} octets (max {max})")]
    DisplayNameTooLong {
        /// Actual length in octets.
        len: usize,
        /// Permitted maximum.
        max: usize,
    },

    /// Message has no To, Cc or Bcc recipient.
    #[error("message has no recipients")]
    NoRecipients,

    /// Recipient list is full.
    #[error("too many recipients (max {max} per list)")]
    TooManyRecipients {
        /// Permitted maximum per list.
        max: usize,
    },

    /// Constructed header line would exceed the RFC 2822 line length limit.
    #[error("header line too long: {len} octets (max {max})")]
    LineTooLong {
        /// Length the line would have reached.
        len: usize,
        /// Permitted maximum.
        max: usize,
    },
}

impl Error {
    /// Creates a reply error from a completion code and message.
    #[must_use]
    pub fn reply(code: u16, message: impl Into<String>) -> Self {
        Self::Reply {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent server error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 500 && *code < 600)
            || matches!(self, Self::AuthFailed)
    }

    /// Returns true if this is a transient server error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Reply { code, .. } if *code >= 400 && *code < 500)
    }
}
