//! Core trait abstractions.
//!
//! These traits define the seams of a pipeline: the external AI service,
//! the three element roles, and narrators.

pub mod ai;
pub mod element;
pub mod narrator;
