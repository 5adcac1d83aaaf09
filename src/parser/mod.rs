//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from received lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// The completion code is taken from the first line.
///
/// # Errors
///
/// Returns [`Error::ReplyTooShort`] for a reply of fewer than 4 characters
/// (3 digits plus delimiter minimum) and [`Error::ReplyMalformed`] when the
/// reply does not begin with a 3-digit completion code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::ReplyTooShort);
    };

    if first.len() < 4 {
        return Err(Error::ReplyTooShort);
    }

    // str::parse would accept a leading '+', which is not a digit here.
    let code = first
        .get(0..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| Error::ReplyMalformed(first.clone()))?;

    // Everything past the code and separator ("250 " or "250-") is text.
    let message = lines
        .iter()
        .map(|line| line.get(4..).unwrap_or_default().to_string())
        .collect();

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` after the code for continuation lines and a
/// space on the last line.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() < 4 || line.as_bytes()[3] == b' '
}
