//! Pipeline engine.
//!
//! A [`Pipeline`] owns one [`Source`](crate::traits::element::Source), an
//! ordered list of [`Transform`](crate::traits::element::Transform)s and one
//! [`Sink`](crate::traits::element::Sink).
//!
//! # Execution
//!
//! - **Sequential** ([`Pipeline::run`]): one source unit at a time. Fan-out
//!   is depth-first, so the sink sees units in source order with fanned
//!   children in the order they were emitted.
//! - **Concurrent** ([`Pipeline::run_concurrent`]): up to N source units in
//!   flight, results re-ordered by source sequence before the sink.
//!
//! # Failures
//!
//! A transform error for one unit is recorded in the [`RunReport`] and the
//! run moves on to the next unit. Source errors, sink errors and errors
//! flagged fatal halt the run with a [`PipelineError`](crate::error::PipelineError).
//! Placeholder units go straight to the sink.

mod concurrent;
mod engine;
mod report;

pub use engine::{Pipeline, PipelineBuilder};
pub use report::{RunReport, UnitFailure};
