//! Email address and mailbox types.
//!
//! Addresses are validated and length-checked at construction against the
//! RFC 2821 size limits, so a `Mailbox` held by a [`crate::Message`] is
//! always sendable as-is.

use crate::error::{Error, Result};

/// Maximum length of the local part of an address (RFC 2821).
pub const LOCAL_PART_MAX: usize = 64;

/// Maximum length of the domain part of an address (RFC 2821).
pub const DOMAIN_MAX: usize = 255;

/// Maximum length of a mailbox display name.
pub const DISPLAY_NAME_MAX: usize = 50;

/// Email address for the SMTP envelope (local part + '@' + domain).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is not of the form
    /// `local@domain`, or [`Error::AddressTooLong`] if either part exceeds
    /// the protocol limits.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("address cannot be empty".into()));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress("address must contain @".into()));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(
                "local and domain parts cannot be empty".into(),
            ));
        }
        if domain.contains('@') {
            return Err(Error::InvalidAddress(
                "address must have exactly one @".into(),
            ));
        }

        if local.len() > LOCAL_PART_MAX {
            return Err(Error::AddressTooLong {
                len: local.len(),
                max: LOCAL_PART_MAX,
            });
        }
        if domain.len() > DOMAIN_MAX {
            return Err(Error::AddressTooLong {
                len: domain.len(),
                max: DOMAIN_MAX,
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
///
/// Immutable once validated; owned by the message that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    name: Option<String>,
    address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or too long.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or too long, or if the
    /// display name exceeds [`DISPLAY_NAME_MAX`].
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() > DISPLAY_NAME_MAX {
            return Err(Error::DisplayNameTooLong {
                len: name.len(),
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self {
            name: Some(name),
            address: Address::new(address)?,
        })
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the email address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }
}
