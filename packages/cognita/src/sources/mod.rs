//! Source implementations.
//!
//! [`VecSource`](crate::testing::VecSource) in the testing module covers
//! in-memory input.

mod file;
mod polling;

pub use file::{file_uri, read_payload, FileSource};
pub use polling::PollingSource;
