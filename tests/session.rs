//! Integration tests for the SMTP session engine.
//!
//! These tests use a mock stream to simulate SMTP server replies without
//! requiring a real server connection.

use std::io::{self, Cursor};
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use smtpc::{Config, Credentials, Error, Mailbox, Message, Session};

/// Mock stream that returns predefined server replies.
#[derive(Debug)]
struct MockStream {
    /// Replies to return (in order).
    replies: Cursor<Vec<u8>>,
    /// Captured commands and content sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
    /// Set once the client shuts the stream down.
    closed: Arc<AtomicBool>,
}

impl MockStream {
    fn new(replies: &[u8]) -> Self {
        Self {
            replies: Cursor::new(replies.to_vec()),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn sent_handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }

    fn closed_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

fn sent_bytes(handle: &Arc<Mutex<Vec<u8>>>) -> MutexGuard<'_, Vec<u8>> {
    handle.lock().unwrap()
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.replies.get_ref();
        let pos = self.replies.position() as usize;

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.replies.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

const LOCAL_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Captures the engine's tracing output per test; `RUST_LOG` overrides the
/// default filter.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("smtpc=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn message() -> Message {
    let mut message = Message::new(Mailbox::new("alice@example.com").unwrap());
    message.add_to(Mailbox::new("bob@example.com").unwrap()).unwrap();
    message.set_subject("Test").set_body("hi");
    message
}

#[tokio::test]
async fn test_send_message_round_trip() {
    init_tracing();
    let replies = b"220 mail.example.com ESMTP\r\n\
                    250 mail.example.com\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    354 Start mail input\r\n\
                    250 OK\r\n\
                    221 Bye\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();
    let closed = stream.closed_handle();

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    session.send_message(&message()).await.unwrap();
    session.disconnect().await;

    let expected: &[u8] = b"HELO [127.0.0.1]\r\n\
                            MAIL FROM:<alice@example.com>\r\n\
                            RCPT TO:<bob@example.com>\r\n\
                            DATA\r\n\
                            From: alice@example.com\r\n\
                            To: bob@example.com\r\n\
                            Subject: Test\r\n\
                            \r\n\
                            hi\r\n.\r\n\
                            QUIT\r\n";
    assert_eq!(&*sent_bytes(&sent), expected);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_greeting_rejected() {
    let stream = MockStream::new(b"554 No service for you\r\n");
    let sent = stream.sent_handle();
    let closed = stream.closed_handle();
    let config = Config::new("mail.example.com");

    let err = Session::handshake(stream, LOCAL_IP, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Reply { code: 554, .. }));

    // The stream is shut down, but without a QUIT exchange: the server
    // already refused service.
    assert!(closed.load(Ordering::SeqCst));
    assert!(sent_bytes(&sent).is_empty());
}

#[tokio::test]
async fn test_multi_line_greeting() {
    let replies = b"220-mail.example.com ESMTP\r\n\
                    220 ready\r\n\
                    250 mail.example.com\r\n";
    let stream = MockStream::new(replies);
    let config = Config::new("mail.example.com");

    assert!(Session::handshake(stream, LOCAL_IP, &config).await.is_ok());
}

#[tokio::test]
async fn test_auth_plain_accepted() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    235 Authentication successful\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();

    let config =
        Config::new("mail.example.com").credentials(Credentials::new("tester", "secret"));
    Session::handshake(stream, LOCAL_IP, &config).await.unwrap();

    // base64("\0tester\0secret")
    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();
    assert!(text.contains("AUTH PLAIN AHRlc3RlcgBzZWNyZXQ=\r\n"));
}

#[tokio::test]
async fn test_auth_plain_rejected() {
    init_tracing();
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    535 Authentication credentials invalid\r\n\
                    221 Bye\r\n";
    let stream = MockStream::new(replies);
    let closed = stream.closed_handle();

    let config = Config::new("mail.example.com").credentials(Credentials::new("tester", "wrong"));
    let err = Session::handshake(stream, LOCAL_IP, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AuthFailed));
    // Handshake failure closes the stream.
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_auth_other_negative_is_reply_error() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    454 Temporary authentication failure\r\n\
                    221 Bye\r\n";
    let stream = MockStream::new(replies);

    let config = Config::new("mail.example.com").credentials(Credentials::new("tester", "pw"));
    let err = Session::handshake(stream, LOCAL_IP, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Reply { code: 454, .. }));
}

#[tokio::test]
async fn test_rcpt_rejects_other_positive_codes() {
    // 252 is positive but not an acceptable RCPT outcome.
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    252 Cannot verify\r\n\
                    250 Reset\r\n";
    let stream = MockStream::new(replies);

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let err = session.send_message(&message()).await.unwrap_err();

    assert!(matches!(err, Error::Reply { code: 252, .. }));
}

#[tokio::test]
async fn test_rcpt_rejected_triggers_rset() {
    init_tracing();
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    550 No such user\r\n\
                    250 Reset\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let err = session.send_message(&message()).await.unwrap_err();

    assert!(matches!(err, Error::Reply { code: 550, .. }));
    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();
    assert!(text.ends_with("RSET\r\n"));
}

#[tokio::test]
async fn test_service_unavailable_skips_rset() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    421 Shutting down\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let err = session.send_message(&message()).await.unwrap_err();

    assert!(matches!(err, Error::Reply { code: 421, .. }));
    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();
    assert!(!text.contains("RSET"));
}

#[tokio::test]
async fn test_data_rejected() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    451 Local error\r\n\
                    250 Reset\r\n";
    let stream = MockStream::new(replies);

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let err = session.send_message(&message()).await.unwrap_err();

    assert!(matches!(err, Error::Reply { code: 451, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_no_recipients_fails_before_io() {
    let stream = MockStream::new(b"220 ready\r\n250 hello\r\n");
    let sent = stream.sent_handle();

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let sent_after_handshake = sent_bytes(&sent).len();

    let empty = Message::new(Mailbox::new("alice@example.com").unwrap());
    let err = session.send_message(&empty).await.unwrap_err();

    assert!(matches!(err, Error::NoRecipients));
    assert_eq!(sent_bytes(&sent).len(), sent_after_handshake);
}

#[tokio::test]
async fn test_all_recipient_lists_and_optional_headers() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    251 Will forward\r\n\
                    250 OK\r\n\
                    354 Go ahead\r\n\
                    250 OK\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();

    let mut message = Message::new(Mailbox::new("alice@example.com").unwrap());
    message.set_sender(Mailbox::new("postmaster@example.com").unwrap());
    message.set_reply_to(Mailbox::new("replies@example.com").unwrap());
    message.add_to(Mailbox::new("bob@example.com").unwrap()).unwrap();
    message.add_to(Mailbox::new("carol@example.com").unwrap()).unwrap();
    message.add_cc(Mailbox::new("dave@example.com").unwrap()).unwrap();
    message.add_bcc(Mailbox::new("eve@example.com").unwrap()).unwrap();
    message.set_subject("All fields").set_body("body\r\n");

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    session.send_message(&message).await.unwrap();

    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();

    // One RCPT per recipient, Bcc included.
    assert_eq!(text.matches("RCPT TO:").count(), 4);
    assert!(text.contains("RCPT TO:<eve@example.com>\r\n"));

    // Folded continuation lines for the second To recipient; no Bcc header
    // in the content.
    assert!(text.contains("To: bob@example.com\r\n, carol@example.com\r\n"));
    assert!(text.contains("Sender: postmaster@example.com\r\n"));
    assert!(text.contains("Reply-to: replies@example.com\r\n"));
    assert!(text.contains("Cc: dave@example.com\r\n"));
    assert!(!text.contains("Bcc"));

    // Header order: From, Sender, To, Reply-to, Cc, Subject.
    let from = text.find("From: ").unwrap();
    let sender = text.find("Sender: ").unwrap();
    let to = text.find("To: ").unwrap();
    let reply_to = text.find("Reply-to: ").unwrap();
    let cc = text.find("Cc: ").unwrap();
    let subject = text.find("Subject: ").unwrap();
    assert!(from < sender && sender < to && to < reply_to && reply_to < cc && cc < subject);
}

#[tokio::test]
async fn test_disconnect_closes_stream_despite_quit_failure() {
    // Server drops the connection without answering QUIT.
    let stream = MockStream::new(b"220 ready\r\n250 hello\r\n");
    let closed = stream.closed_handle();

    let config = Config::new("mail.example.com");
    let session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    session.disconnect().await;

    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_noop() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n";
    let stream = MockStream::new(replies);

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    assert!(session.noop().await.is_ok());
}

#[tokio::test]
async fn test_body_sent_verbatim() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    354 Go ahead\r\n\
                    250 OK\r\n";
    let stream = MockStream::new(replies);
    let sent = stream.sent_handle();

    let mut message = message();
    // Leading dots are the caller's responsibility.
    message.set_body(".hidden\r\nline two\r\n");

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    session.send_message(&message).await.unwrap();

    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();
    assert!(text.contains("\r\n\r\n.hidden\r\nline two\r\n\r\n.\r\n"));
}

#[tokio::test]
async fn test_header_flush_mid_headers_preserves_content() {
    // Enough long recipients that the To header overflows the 1024-octet
    // transmission buffer and must flush mid-headers. The bytes on the
    // wire must read the same as an unflushed assembly would.
    let recipients: Vec<String> = (0..30)
        .map(|i| format!("recipient{i:02}@really-long-domain-example.com"))
        .collect();

    let mut replies = Vec::from(&b"220 ready\r\n250 hello\r\n250 OK\r\n"[..]);
    for _ in &recipients {
        replies.extend_from_slice(b"250 OK\r\n");
    }
    replies.extend_from_slice(b"354 Go ahead\r\n250 OK\r\n");

    let stream = MockStream::new(&replies);
    let sent = stream.sent_handle();

    let mut message = Message::new(Mailbox::new("alice@example.com").unwrap());
    for addr in &recipients {
        message.add_to(Mailbox::new(addr.as_str()).unwrap()).unwrap();
    }
    message.set_body("body\r\n");

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    session.send_message(&message).await.unwrap();

    let mut expected = String::from("From: alice@example.com\r\n");
    expected.push_str("To: ");
    expected.push_str(&recipients.join("\r\n, "));
    expected.push_str("\r\n\r\nbody\r\n");

    let sent = sent_bytes(&sent);
    let text = std::str::from_utf8(&sent).unwrap();
    assert!(text.contains(&expected));
}

#[tokio::test]
async fn test_header_overflow_is_rejected() {
    let replies = b"220 ready\r\n\
                    250 hello\r\n\
                    250 OK\r\n\
                    250 OK\r\n\
                    354 Go ahead\r\n";
    let stream = MockStream::new(replies);

    let mut message = message();
    // 996 octets of subject plus "Subject: " and CRLF exceeds the
    // 1000-octet line limit.
    message.set_subject("x".repeat(996));

    let config = Config::new("mail.example.com");
    let mut session = Session::handshake(stream, LOCAL_IP, &config).await.unwrap();
    let err = session.send_message(&message).await.unwrap_err();

    assert!(matches!(err, Error::LineTooLong { .. }));
}
