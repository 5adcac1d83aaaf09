//! SMTP session engine.
//!
//! Drives the command/reply dialogue over an established stream: greeting,
//! HELO, optional PLAIN authentication, the MAIL/RCPT/DATA transaction with
//! RSET recovery, and QUIT. Exchanges are strictly sequential: each command
//! is sent, then the engine blocks on the classified reply before deciding
//! the next step.

use crate::command::Command;
use crate::connection::config::{Config, Credentials};
use crate::connection::headers::{
    Append, HDR_CC, HDR_FROM, HDR_REPLY_TO, HDR_SENDER, HDR_SUBJECT, HDR_TO, HeaderBuf,
};
use crate::connection::stream::{self, SmtpStream};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Mailbox, Reply, ReplyCode};
use base64::Engine;
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Maximum total length of a reply line, code and CRLF included (RFC 2821).
const REPLY_LEN_MAX: usize = 512;

/// End-of-mail-data marker.
const EOM: &[u8] = b"\r\n.\r\n";

/// An established SMTP session.
///
/// Created by [`connect`] (or [`Session::handshake`] over a caller-supplied
/// stream), consumed by [`Session::disconnect`]. One message send owns the
/// session and its transmission buffer exclusively; concurrent sessions
/// each get their own.
#[derive(Debug)]
pub struct Session<S> {
    stream: BufReader<S>,
    timeout: Duration,
}

/// Connects to the configured server and performs the SMTP handshake:
/// greeting, HELO and, when credentials are configured, AUTH PLAIN.
///
/// # Errors
///
/// Returns a transport error if the connection fails, a reply error if the
/// server rejects the greeting or HELO, and [`Error::AuthFailed`] if the
/// server rejects the credentials with code 535. On any handshake failure
/// the connection is shut down before the error is reported.
pub async fn connect(config: &Config) -> Result<Session<SmtpStream>> {
    let (stream, local_ip) = stream::open(config).await?;
    Session::handshake(stream, local_ip, config).await
}

/// Connects, sends one message and disconnects.
///
/// Disconnect is attempted even when the send fails, so the transport is
/// never left open.
///
/// # Errors
///
/// Propagates the [`connect`] and [`Session::send_message`] errors.
pub async fn send_mail(config: &Config, message: &Message) -> Result<()> {
    let mut session = connect(config).await?;
    let outcome = session.send_message(message).await;
    session.disconnect().await;
    outcome
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Performs the SMTP handshake over an already-connected stream.
    ///
    /// `local_ip` is the address of this end of the connection, used to
    /// build the HELO address literal.
    ///
    /// # Errors
    ///
    /// See [`connect`].
    pub async fn handshake(stream: S, local_ip: IpAddr, config: &Config) -> Result<Self> {
        let mut session = Self {
            stream: BufReader::new(stream),
            timeout: config.io_timeout,
        };

        // Greeting: the server speaks first. Any positive reply is
        // accepted; 554 here means the server allows the connection but
        // rejects the transaction up front. No QUIT on rejection, the
        // server has already refused service.
        let greeting = session.read_reply().await?;
        if !greeting.is_positive() {
            let _ = session.stream.get_mut().shutdown().await;
            return Err(Error::reply(greeting.code.as_u16(), greeting.message_text()));
        }
        tracing::debug!(code = greeting.code.as_u16(), "server greeting");

        if let Err(err) = session.helo(local_ip).await {
            session.disconnect().await;
            return Err(err);
        }

        if let Some(credentials) = &config.credentials {
            if let Err(err) = session.auth_plain(credentials).await {
                session.disconnect().await;
                return Err(err);
            }
        }

        Ok(session)
    }

    /// Sends one message over the session.
    ///
    /// Issues MAIL, one RCPT per recipient (To, then Cc, then Bcc, in list
    /// order), DATA, then the content headers, body and end-of-data marker.
    /// A failed transaction step resets the server-side transaction state
    /// with RSET before the error is reported, unless the server is already
    /// closing the channel (421/221).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipients`] before any network interaction when
    /// the To, Cc and Bcc lists are all empty; otherwise a transport,
    /// reply or [`Error::LineTooLong`] error from the failing step.
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        if message.recipient_count() == 0 {
            return Err(Error::NoRecipients);
        }

        if let Err(err) = self.mail(message.from()).await {
            return Err(self.abort(err).await);
        }

        for recipient in message.recipients() {
            if let Err(err) = self.rcpt(recipient).await {
                return Err(self.abort(err).await);
            }
        }

        if let Err(err) = self.data().await {
            return Err(self.abort(err).await);
        }

        if let Err(err) = self.send_content(message).await {
            return Err(self.abort(err).await);
        }

        tracing::debug!("message accepted");
        Ok(())
    }

    /// Sends NOOP; the server must answer 250.
    ///
    /// # Errors
    ///
    /// Returns a transport or reply error.
    pub async fn noop(&mut self) -> Result<()> {
        let reply = self.command(&Command::Noop).await?;
        Self::expect_code(&reply, ReplyCode::OK)
    }

    /// Sends QUIT and closes the stream.
    ///
    /// The close is unconditional; a failed QUIT exchange is logged and
    /// swallowed so that cleanup cannot itself fail.
    pub async fn disconnect(mut self) {
        if let Err(err) = self.quit().await {
            tracing::debug!(error = %err, "QUIT exchange failed");
        }
        let _ = self.stream.get_mut().shutdown().await;
    }

    /// Issues RSET after a failed transaction step, unless the reply code
    /// says the server is already closing the channel. The original error
    /// is always the one reported; an RSET failure is only logged.
    async fn abort(&mut self, err: Error) -> Error {
        if let Error::Reply { code, .. } = &err {
            let closing = *code == ReplyCode::SERVICE_UNAVAILABLE.as_u16()
                || *code == ReplyCode::CLOSING.as_u16();
            if !closing {
                if let Err(rset_err) = self.rset().await {
                    tracing::warn!(error = %rset_err, "RSET after failed transaction step");
                }
            }
        }
        err
    }

    async fn helo(&mut self, local_ip: IpAddr) -> Result<()> {
        let reply = self.command(&Command::helo(local_ip)).await?;
        Self::expect_positive(&reply)
    }

    async fn auth_plain(&mut self, credentials: &Credentials) -> Result<()> {
        // RFC 4616: authzid NUL authcid NUL password, base64-encoded. An
        // embedded NUL would corrupt the field boundaries.
        if credentials.username().contains('\0') || credentials.password().contains('\0') {
            return Err(Error::Encode);
        }
        let plain = format!("\0{}\0{}", credentials.username(), credentials.password());
        let initial_response =
            base64::engine::general_purpose::STANDARD.encode(plain.as_bytes());

        let reply = self.command(&Command::AuthPlain { initial_response }).await?;
        if reply.is_positive() {
            tracing::debug!("authenticated");
            return Ok(());
        }
        if reply.code == ReplyCode::AUTH_FAILED {
            return Err(Error::AuthFailed);
        }
        Err(Error::reply(reply.code.as_u16(), reply.message_text()))
    }

    async fn mail(&mut self, from: &Mailbox) -> Result<()> {
        let cmd = Command::MailFrom {
            from: from.address().clone(),
        };
        let reply = self.command(&cmd).await?;
        Self::expect_positive(&reply)
    }

    async fn rcpt(&mut self, to: &Mailbox) -> Result<()> {
        let cmd = Command::RcptTo {
            to: to.address().clone(),
        };
        let reply = self.command(&cmd).await?;
        // 250 or 251 ("will forward") only; any other code, positive or
        // not, is a reply error.
        if reply.code == ReplyCode::OK || reply.code == ReplyCode::FORWARD {
            return Ok(());
        }
        Err(Error::reply(reply.code.as_u16(), reply.message_text()))
    }

    async fn data(&mut self) -> Result<()> {
        let reply = self.command(&Command::Data).await?;
        Self::expect_code(&reply, ReplyCode::START_DATA)
    }

    /// Sends RSET, discarding any in-progress transaction state on the
    /// server; the server must answer 250.
    ///
    /// Issued automatically after a failed transaction step; exposed for
    /// callers that reuse a session across messages.
    ///
    /// # Errors
    ///
    /// Returns a transport or reply error.
    pub async fn rset(&mut self) -> Result<()> {
        let reply = self.command(&Command::Rset).await?;
        Self::expect_code(&reply, ReplyCode::OK)
    }

    async fn quit(&mut self) -> Result<()> {
        let reply = self.command(&Command::Quit).await?;
        Self::expect_code(&reply, ReplyCode::CLOSING)
    }

    /// Serializes the content headers into the transmission buffer (flushing
    /// whenever the next pair would overflow it), then transmits the
    /// header/body delimiter, the body verbatim, and the end-of-data
    /// marker, and awaits the final 250.
    async fn send_content(&mut self, message: &Message) -> Result<()> {
        let mut headers = HeaderBuf::new();

        self.append_header(&mut headers, Some(HDR_FROM), message.from())
            .await?;

        if let Some(sender) = message.sender() {
            self.append_header(&mut headers, Some(HDR_SENDER), sender)
                .await?;
        }

        let mut tag = Some(HDR_TO);
        for mailbox in message.to() {
            self.append_header(&mut headers, tag, mailbox).await?;
            tag = None;
        }

        if let Some(reply_to) = message.reply_to() {
            self.append_header(&mut headers, Some(HDR_REPLY_TO), reply_to)
                .await?;
        }

        let mut tag = Some(HDR_CC);
        for mailbox in message.cc() {
            self.append_header(&mut headers, tag, mailbox).await?;
            tag = None;
        }

        if let Some(subject) = message.subject() {
            match headers.prepare(Some(HDR_SUBJECT), subject)? {
                Append::Fits => {}
                Append::FlushFirst => self.flush(&mut headers).await?,
            }
            headers.push(Some(HDR_SUBJECT), subject);
        }

        // Header/body delimiter.
        if !headers.fits(2) {
            self.flush(&mut headers).await?;
        }
        headers.push_crlf();
        self.flush(&mut headers).await?;

        self.send_bytes(message.body()).await?;
        self.send_bytes(EOM).await?;

        let reply = self.read_reply().await?;
        Self::expect_code(&reply, ReplyCode::OK)
    }

    async fn append_header(
        &mut self,
        headers: &mut HeaderBuf,
        tag: Option<&str>,
        mailbox: &Mailbox,
    ) -> Result<()> {
        let value = mailbox.address().as_str();
        match headers.prepare(tag, value)? {
            Append::Fits => {}
            Append::FlushFirst => self.flush(headers).await?,
        }
        headers.push(tag, value);
        Ok(())
    }

    async fn flush(&mut self, headers: &mut HeaderBuf) -> Result<()> {
        if headers.len() == 0 {
            return Ok(());
        }
        let pending = headers.take();
        self.send_bytes(&pending).await
    }

    async fn command(&mut self, cmd: &Command) -> Result<Reply> {
        self.send_bytes(&cmd.serialize()).await?;
        self.read_reply().await
    }

    /// Writes all bytes under the I/O timeout. `write_all` loops over
    /// partial sends internally.
    async fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let stream = self.stream.get_mut();
        let result = tokio::time::timeout(timeout, async {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await;

        match result {
            Ok(io_result) => io_result.map_err(Error::Send),
            Err(_) => Err(Error::Send(io::Error::from(io::ErrorKind::TimedOut))),
        }
    }

    /// Reads one reply (all lines of it, for multi-line replies) under the
    /// I/O timeout and parses the completion code from the first line.
    async fn read_reply(&mut self) -> Result<Reply> {
        let timeout = self.timeout;
        let mut lines = Vec::new();

        loop {
            let mut line = String::new();
            let read = tokio::time::timeout(timeout, self.stream.read_line(&mut line))
                .await
                .map_err(|_| Error::Receive(io::Error::from(io::ErrorKind::TimedOut)))?
                .map_err(Error::Receive)?;

            if read == 0 {
                return Err(Error::Receive(io::Error::from(
                    io::ErrorKind::UnexpectedEof,
                )));
            }
            if line.len() > REPLY_LEN_MAX {
                return Err(Error::Receive(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "reply line exceeds 512 octets",
                )));
            }

            let line = line.trim_end().to_string();
            let last = is_last_reply_line(&line);
            lines.push(line);
            if last {
                break;
            }
        }

        let reply = parse_reply(&lines)?;
        tracing::debug!(code = reply.code.as_u16(), "reply");
        Ok(reply)
    }

    /// Positive replies resolve with no error; negative (and defensively,
    /// anything else) is a reply error carrying the code.
    fn expect_positive(reply: &Reply) -> Result<()> {
        if reply.is_positive() {
            return Ok(());
        }
        Err(Error::reply(reply.code.as_u16(), reply.message_text()))
    }

    fn expect_code(reply: &Reply, code: ReplyCode) -> Result<()> {
        if reply.code == code {
            return Ok(());
        }
        Err(Error::reply(reply.code.as_u16(), reply.message_text()))
    }
}
