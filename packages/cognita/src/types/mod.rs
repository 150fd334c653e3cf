//! Data types flowing through a cognita pipeline.

pub mod caps;
pub mod config;
pub mod identity;
pub mod triple;
pub mod unit;
