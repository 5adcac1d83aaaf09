//! Low-level SMTP stream handling.

use crate::connection::config::Config;
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::io;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// SMTP stream (TCP or implicit TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection.
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Opens a connection to the configured server, wrapping it in TLS when the
/// configuration asks for it. Returns the stream together with the local IP
/// address of the connection, needed for the HELO address literal.
///
/// # Errors
///
/// Returns [`Error::Connect`] if the TCP connection or TLS handshake fails
/// or times out.
pub(crate) async fn open(config: &Config) -> Result<(SmtpStream, IpAddr)> {
    let addr = format!("{}:{}", config.host, config.effective_port());

    let tcp_stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Connect(io::Error::from(io::ErrorKind::TimedOut)))?
        .map_err(Error::Connect)?;

    let local_ip = tcp_stream.local_addr().map_err(Error::Connect)?.ip();

    let Some(tls) = &config.tls else {
        return Ok((SmtpStream::Tcp(tcp_stream), local_ip));
    };

    let connector = create_tls_connector();
    let hostname = tls.server_name.as_deref().unwrap_or(&config.host);
    let server_name = ServerName::try_from(hostname.to_string()).map_err(|_| {
        Error::Connect(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid TLS server name: {hostname}"),
        ))
    })?;

    let tls_stream = tokio::time::timeout(
        config.connect_timeout,
        connector.connect(server_name, tcp_stream),
    )
    .await
    .map_err(|_| Error::Connect(io::Error::from(io::ErrorKind::TimedOut)))?
    .map_err(map_handshake_error)?;

    Ok((SmtpStream::Tls(Box::new(tls_stream)), local_ip))
}

/// The connector surfaces TLS failures as `io::Error` values wrapping a
/// `rustls::Error`. Unwrap those so a rejected handshake is reported as
/// [`Error::Tls`], not a connect failure.
fn map_handshake_error(err: io::Error) -> Error {
    match err.downcast::<rustls::Error>() {
        Ok(tls_err) => Error::Tls(tls_err),
        Err(err) => Error::Connect(err),
    }
}

/// Creates a TLS connector with the bundled root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
