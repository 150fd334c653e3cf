//! Run outcome records.

use uuid::Uuid;

use crate::error::UnitError;

/// A per-unit error recorded during a run.
#[derive(Debug)]
pub struct UnitFailure {
    /// Position of the originating unit in the source sequence
    pub sequence: u64,

    /// Identity IRI of the failing unit, if it had one yet
    pub identity: Option<String>,

    /// Display name of the failing unit
    pub unit: String,

    /// Name of the stage that raised the error
    pub stage: String,

    pub error: UnitError,
}

/// What happened during one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,

    /// Units pulled from the source
    pub units_read: u64,

    /// Units consumed by the sink, placeholders included
    pub delivered: u64,

    /// Units a transform dropped
    pub filtered: u64,

    /// Placeholder units delivered in place of skipped items
    pub placeholders: u64,

    pub failures: Vec<UnitFailure>,

    /// The run stopped at a cancellation checkpoint
    pub cancelled: bool,
}

impl RunReport {
    pub(crate) fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            units_read: 0,
            delivered: 0,
            filtered: 0,
            placeholders: 0,
            failures: Vec::new(),
            cancelled: false,
        }
    }

    /// True if no unit failed and the run was not cancelled.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Failures raised for the source unit at `sequence`.
    pub fn failures_for(&self, sequence: u64) -> impl Iterator<Item = &UnitFailure> + '_ {
        self.failures.iter().filter(move |f| f.sequence == sequence)
    }
}
