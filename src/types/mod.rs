//! Core SMTP types.

mod address;
mod reply;

pub use address::{Address, DISPLAY_NAME_MAX, DOMAIN_MAX, LOCAL_PART_MAX, Mailbox};
pub use reply::{Reply, ReplyCategory, ReplyCode};
