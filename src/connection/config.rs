//! Session configuration types.

use std::time::Duration;

/// Default SMTP port for plain connections.
pub const DEFAULT_PORT: u16 = 25;

/// Default SMTP port for implicit-TLS connections.
pub const DEFAULT_PORT_TLS: u16 = 465;

/// Authentication credentials for the AUTH PLAIN exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    // Never log the password.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Implicit-TLS parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Server name presented during the TLS handshake; defaults to the
    /// configured host when `None`.
    pub server_name: Option<String>,
}

impl TlsConfig {
    /// Creates a TLS configuration that verifies against the configured host.
    #[must_use]
    pub const fn new() -> Self {
        Self { server_name: None }
    }

    /// Creates a TLS configuration verifying against an explicit server name.
    #[must_use]
    pub fn with_server_name(server_name: impl Into<String>) -> Self {
        Self {
            server_name: Some(server_name.into()),
        }
    }
}

/// SMTP session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname or IP address.
    pub host: String,
    /// Explicit server port; `None` selects the default for the security
    /// mode (25 plain, 465 TLS).
    pub port: Option<u16>,
    /// Credentials for AUTH PLAIN; `None` disables authentication.
    pub credentials: Option<Credentials>,
    /// Implicit-TLS parameters; `None` keeps the connection plain.
    pub tls: Option<TlsConfig>,
    /// Maximum time to wait for the TCP connection to establish.
    pub connect_timeout: Duration,
    /// Maximum inactivity time on each send and receive.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a configuration for a plain, unauthenticated session.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            credentials: None,
            tls: None,
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Sets an explicit port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables AUTH PLAIN with the given credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Enables implicit TLS.
    #[must_use]
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-exchange I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Returns the explicit port, or the default for the security mode.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.tls.is_some() => DEFAULT_PORT_TLS,
            None => DEFAULT_PORT,
        }
    }
}
