//! Built-in transform stages.
//!
//! The usual chain is TypeFind → MboxSplit → Narrate → ExtractTriples.

mod extract;
mod mbox_split;
mod narrate;
mod typefind;

pub use extract::ExtractTriples;
pub use mbox_split::MboxSplit;
pub use narrate::Narrate;
pub use typefind::{OnClassifyError, TypeFind};
