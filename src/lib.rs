//! Minimal SMTP client (RFC 2821).
//!
//! Sequential command/reply dialogue over TCP or TLS: greeting, HELO,
//! optional PLAIN authentication, the MAIL/RCPT/DATA transaction and QUIT,
//! with RSET recovery after a failed transaction step. Message content is
//! assembled from structured headers through a fixed-size transmission
//! buffer; the body is transmitted verbatim, terminated by the
//! "\r\n.\r\n" marker.
//!
//! # Quick start
//!
//! ```no_run
//! use smtpc::{Config, Mailbox, Message};
//!
//! # async fn run() -> smtpc::Result<()> {
//! let config = Config::new("mail.example.com");
//!
//! let mut message = Message::new(Mailbox::new("alice@example.com")?);
//! message.add_to(Mailbox::new("bob@example.com")?)?;
//! message
//!     .set_subject("Greetings")
//!     .set_body("Hello from smtpc.\r\n");
//!
//! smtpc::send_mail(&config, &message).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For several messages over one connection, [`connect`] returns a
//! [`Session`] that can be reused and must be closed with
//! [`Session::disconnect`].

pub mod command;
pub mod connection;
mod error;
pub mod message;
pub mod parser;
pub mod types;

pub use connection::{Config, Credentials, Session, SmtpStream, TlsConfig, connect, send_mail};
pub use error::{Error, Result};
pub use message::Message;
pub use types::{Address, Mailbox, Reply, ReplyCategory, ReplyCode};
