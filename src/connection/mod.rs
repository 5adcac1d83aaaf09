//! Connection establishment and the SMTP session engine.

mod config;
mod headers;
mod session;
mod stream;

pub use config::{Config, Credentials, DEFAULT_PORT, DEFAULT_PORT_TLS, TlsConfig};
pub use session::{Session, connect, send_mail};
pub use stream::SmtpStream;
