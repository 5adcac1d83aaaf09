//! SMTP command builder.

use crate::types::Address;
use std::net::IpAddr;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Identify the client to the server
    Helo {
        /// Client address literal, e.g. `[192.0.2.1]` or `[IPv6:2001:db8::1]`
        address_literal: String,
    },
    /// AUTH PLAIN - Authenticate with an initial response
    AuthPlain {
        /// Base64-encoded NUL-delimited authzid/authcid/password triple
        initial_response: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Builds the HELO command from the local address used for the connection.
    #[must_use]
    pub fn helo(local_addr: IpAddr) -> Self {
        let address_literal = match local_addr {
            IpAddr::V4(addr) => format!("[{addr}]"),
            IpAddr::V6(addr) => format!("[IPv6:{addr}]"),
        };
        Self::Helo { address_literal }
    }

    /// Serializes the command to bytes, CRLF-terminated.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Helo { address_literal } => {
                buf.extend_from_slice(b"HELO ");
                buf.extend_from_slice(address_literal.as_bytes());
            }
            Self::AuthPlain { initial_response } => {
                buf.extend_from_slice(b"AUTH PLAIN ");
                buf.extend_from_slice(initial_response.as_bytes());
            }
            Self::MailFrom { from } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Rset => {
                buf.extend_from_slice(b"RSET");
            }
            Self::Noop => {
                buf.extend_from_slice(b"NOOP");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn helo_ipv4() {
        let cmd = Command::helo(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(cmd.serialize(), b"HELO [192.0.2.1]\r\n");
    }

    #[test]
    fn helo_ipv6() {
        let cmd = Command::helo(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)));
        assert_eq!(cmd.serialize(), b"HELO [IPv6:2001:db8::1]\r\n");
    }

    #[test]
    fn auth_plain() {
        let cmd = Command::AuthPlain {
            initial_response: "AHVzZXIAcGFzcw==".to_string(),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn mail_from() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn rcpt_to() {
        let cmd = Command::RcptTo {
            to: Address::new("recipient@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn bare_commands() {
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Noop.serialize(), b"NOOP\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }
}
