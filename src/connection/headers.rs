//! Bounded transmission buffer for content-header assembly.

use crate::error::{Error, Result};

/// Capacity of the transmission buffer, sized to hold the longest reply a
/// server may send plus the constructed header lines (RFC 2821 caps a reply
/// at 512 octets; RFC 2822 caps a line at 1000).
pub(crate) const BUF_CAPACITY: usize = 1024;

/// Maximum length of a transmitted line, CRLF included (RFC 2822).
pub(crate) const LINE_LEN_MAX: usize = 1000;

/// Content-header tags, trailing space included.
pub(crate) const HDR_FROM: &str = "From: ";
pub(crate) const HDR_SENDER: &str = "Sender: ";
pub(crate) const HDR_TO: &str = "To: ";
pub(crate) const HDR_REPLY_TO: &str = "Reply-to: ";
pub(crate) const HDR_CC: &str = "Cc: ";
pub(crate) const HDR_SUBJECT: &str = "Subject: ";

/// Separator written in place of the tag when a header carries more than
/// one value; each value still ends its own folded line.
const CONTINUATION: &str = ", ";

/// Stateful builder for the header section of the mail content.
///
/// One buffer is owned by the in-flight send-message call; the caller
/// checks [`HeaderBuf::prepare`] before each append, transmits
/// [`HeaderBuf::take`] when told to flush, then appends with
/// [`HeaderBuf::push`]. The length checks are conservative: the buffer may
/// be flushed earlier than strictly necessary, never later.
#[derive(Debug)]
pub(crate) struct HeaderBuf {
    buf: Vec<u8>,
    line_len: usize,
}

/// Outcome of a capacity check for a pending header/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Append {
    /// The pair fits in the remaining buffer space.
    Fits,
    /// The buffer must be flushed before the pair is appended.
    FlushFirst,
}

impl HeaderBuf {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::with_capacity(BUF_CAPACITY),
            line_len: 0,
        }
    }

    /// Octets the pair will occupy: tag (or continuation separator) plus
    /// value plus CRLF.
    fn required(tag: Option<&str>, value: &str) -> usize {
        tag.map_or(CONTINUATION.len(), str::len) + value.len() + 2
    }

    /// Checks the protocol line limit and the buffer capacity for a pending
    /// header/value pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LineTooLong`] when appending would push the current
    /// line past [`LINE_LEN_MAX`]; nothing is transmitted in that case.
    pub(crate) fn prepare(&self, tag: Option<&str>, value: &str) -> Result<Append> {
        let needed = Self::required(tag, value);
        if self.line_len + needed > LINE_LEN_MAX {
            return Err(Error::LineTooLong {
                len: self.line_len + needed,
                max: LINE_LEN_MAX,
            });
        }
        if BUF_CAPACITY - self.buf.len() < needed {
            return Ok(Append::FlushFirst);
        }
        Ok(Append::Fits)
    }

    /// Appends a header/value pair. `tag` is `None` for the second and
    /// later values of the same logical header; those are folded onto a new
    /// line behind the `", "` separator. Every value ends with a CRLF fold,
    /// which resets the line length.
    pub(crate) fn push(&mut self, tag: Option<&str>, value: &str) {
        match tag {
            Some(tag) => {
                self.buf.extend_from_slice(tag.as_bytes());
                self.line_len += tag.len();
            }
            None => {
                self.buf.extend_from_slice(CONTINUATION.as_bytes());
                self.line_len += CONTINUATION.len();
            }
        }
        self.buf.extend_from_slice(value.as_bytes());
        self.line_len += value.len();

        self.buf.extend_from_slice(b"\r\n");
        self.line_len = 0;
    }

    /// Returns true if `extra` more octets fit without flushing.
    pub(crate) fn fits(&self, extra: usize) -> bool {
        BUF_CAPACITY - self.buf.len() >= extra
    }

    /// Appends a bare CRLF (the header/body delimiter).
    pub(crate) fn push_crlf(&mut self) {
        self.buf.extend_from_slice(b"\r\n");
        self.line_len = 0;
    }

    /// Drains the buffered octets for transmission and resets the write
    /// cursor.
    pub(crate) fn take(&mut self) -> Vec<u8> {
        self.line_len = 0;
        std::mem::replace(&mut self.buf, Vec::with_capacity(BUF_CAPACITY))
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }
}
