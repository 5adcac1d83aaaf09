//! Mail object: envelope addressing, content headers and body.

use crate::error::{Error, Result};
use crate::types::Mailbox;

/// Maximum number of recipients per list (To, Cc, Bcc).
///
/// RFC 2821 requires servers to accept at least 100 recipients per
/// transaction; the three lists are bounded at that number each.
pub const RECIPIENTS_MAX: usize = 100;

/// A mail object: one From mailbox, at least one recipient across the To,
/// Cc and Bcc lists, optional Sender/Reply-to/Subject, and a caller-owned
/// body sent verbatim.
///
/// Recipient lists are ordered and bounded; inserting past
/// [`RECIPIENTS_MAX`] fails rather than silently truncating.
#[derive(Debug, Clone)]
pub struct Message {
    from: Mailbox,
    sender: Option<Mailbox>,
    reply_to: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: Option<String>,
    body: Vec<u8>,
}

impl Message {
    /// Creates a new message with the given From mailbox and an empty body.
    #[must_use]
    pub const fn new(from: Mailbox) -> Self {
        Self {
            from,
            sender: None,
            reply_to: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: None,
            body: Vec::new(),
        }
    }

    /// Adds a To recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyRecipients`] if the To list is full.
    pub fn add_to(&mut self, mailbox: Mailbox) -> Result<&mut Self> {
        Self::push_bounded(&mut self.to, mailbox)?;
        Ok(self)
    }

    /// Adds a Cc recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyRecipients`] if the Cc list is full.
    pub fn add_cc(&mut self, mailbox: Mailbox) -> Result<&mut Self> {
        Self::push_bounded(&mut self.cc, mailbox)?;
        Ok(self)
    }

    /// Adds a Bcc recipient. Bcc mailboxes receive an RCPT exchange but are
    /// never written into the content headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyRecipients`] if the Bcc list is full.
    pub fn add_bcc(&mut self, mailbox: Mailbox) -> Result<&mut Self> {
        Self::push_bounded(&mut self.bcc, mailbox)?;
        Ok(self)
    }

    /// Sets the Sender mailbox.
    pub fn set_sender(&mut self, mailbox: Mailbox) -> &mut Self {
        self.sender = Some(mailbox);
        self
    }

    /// Sets the Reply-to mailbox.
    pub fn set_reply_to(&mut self, mailbox: Mailbox) -> &mut Self {
        self.reply_to = Some(mailbox);
        self
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the content body, transmitted verbatim with no line-ending
    /// translation.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Returns the From mailbox.
    #[must_use]
    pub const fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Returns the Sender mailbox, if set.
    #[must_use]
    pub const fn sender(&self) -> Option<&Mailbox> {
        self.sender.as_ref()
    }

    /// Returns the Reply-to mailbox, if set.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Mailbox> {
        self.reply_to.as_ref()
    }

    /// Returns the To recipients in insertion order.
    #[must_use]
    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    /// Returns the Cc recipients in insertion order.
    #[must_use]
    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    /// Returns the Bcc recipients in insertion order.
    #[must_use]
    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    /// Returns the subject, if set.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the content body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the recipient count across the To, Cc and Bcc lists.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Returns all recipients in RCPT order: To, then Cc, then Bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    fn push_bounded(list: &mut Vec<Mailbox>, mailbox: Mailbox) -> Result<()> {
        if list.len() >= RECIPIENTS_MAX {
            return Err(Error::TooManyRecipients {
                max: RECIPIENTS_MAX,
            });
        }
        list.push(mailbox);
        Ok(())
    }
}
