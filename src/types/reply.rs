//! SMTP reply types.

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Completion code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a positive reply (1xx/2xx/3xx).
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.code.category().is_positive()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

/// Reply category derived from the completion code's leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    /// 1xx - Positive preliminary reply.
    PositivePreliminary,
    /// 2xx - Positive completion reply.
    PositiveCompletion,
    /// 3xx - Positive intermediate reply.
    PositiveIntermediate,
    /// 4xx - Transient negative completion reply.
    TransientNegative,
    /// 5xx - Permanent negative completion reply.
    PermanentNegative,
}

impl ReplyCategory {
    /// Returns the leading digit this category corresponds to.
    #[must_use]
    pub const fn digit(self) -> u16 {
        match self {
            Self::PositivePreliminary => 1,
            Self::PositiveCompletion => 2,
            Self::PositiveIntermediate => 3,
            Self::TransientNegative => 4,
            Self::PermanentNegative => 5,
        }
    }

    /// Returns true for the positive categories (1xx/2xx/3xx).
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(
            self,
            Self::PositivePreliminary | Self::PositiveCompletion | Self::PositiveIntermediate
        )
    }

    /// Returns true for the negative categories (4xx/5xx).
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::TransientNegative | Self::PermanentNegative)
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Classifies the code by its leading digit.
    ///
    /// A leading digit outside 1-5 cannot come from a conforming server;
    /// such codes are classified as permanent negative.
    #[must_use]
    pub const fn category(self) -> ReplyCategory {
        match self.0 / 100 {
            1 => ReplyCategory::PositivePreliminary,
            2 => ReplyCategory::PositiveCompletion,
            3 => ReplyCategory::PositiveIntermediate,
            4 => ReplyCategory::TransientNegative,
            _ => ReplyCategory::PermanentNegative,
        }
    }

    /// Returns true if this is a positive code (1xx/2xx/3xx).
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.category().is_positive()
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Common reply codes
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication successful
    pub const AUTH_OK: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 251 User not local; will forward
    pub const FORWARD: Self = Self(251);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);
    /// 554 Transaction failed
    pub const TRANSACTION_FAILED: Self = Self(554);
}
