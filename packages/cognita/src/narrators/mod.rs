//! Narrator implementations.
//!
//! - [`ImageNarrator`]: vision model description of an image
//! - [`TextNarrator`]: model narration of textual content
//! - [`MailboxNarrator`]: deterministic mbox summary
//! - [`MessageNarrator`]: deterministic narration of one mail message

mod image;
mod mailbox;
mod message;
mod text;

pub use image::ImageNarrator;
pub use mailbox::{MailboxNarrator, MAILBOX_LISTING_LIMIT};
pub use message::{MessageNarrator, BODY_EXCERPT_CHARS};
pub use text::TextNarrator;
