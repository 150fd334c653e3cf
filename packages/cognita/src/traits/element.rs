//! Element roles: sources, transforms and sinks.

use async_trait::async_trait;

use crate::error::{ElementError, Result};
use crate::types::unit::ContentUnit;

/// Produces the units of a run, one at a time.
///
/// Discrete sources end by returning `Ok(None)`; time-series sources may
/// never end. An `Err` is fatal to the run.
#[async_trait]
pub trait Source: Send {
    fn name(&self) -> &str;

    async fn next_unit(&mut self) -> Result<Option<ContentUnit>>;
}

/// Output of a transform for one input unit.
pub enum Emit {
    /// Filtered out; traversal of this input ends here
    Drop,

    /// The unit continues
    One(ContentUnit),

    /// Fan-out: each unit continues on its own, in order. Forward-only.
    Many(Box<dyn Iterator<Item = ContentUnit> + Send>),
}

impl Emit {
    pub fn many<I>(units: I) -> Self
    where
        I: IntoIterator<Item = ContentUnit>,
        I::IntoIter: Send + 'static,
    {
        Emit::Many(Box::new(units.into_iter()))
    }
}

impl std::fmt::Debug for Emit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Emit::Drop => f.write_str("Drop"),
            Emit::One(unit) => f.debug_tuple("One").field(unit).finish(),
            Emit::Many(_) => f.write_str("Many(..)"),
        }
    }
}

/// Consumes one unit and yields zero, one or many.
///
/// Takes `&self` so a pipeline can drive several units through the same
/// transform at once; per-unit state belongs on the unit.
#[async_trait]
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    async fn transform(&self, unit: ContentUnit) -> std::result::Result<Emit, ElementError>;
}

/// Terminal consumer of units.
#[async_trait]
pub trait Sink: Send {
    fn name(&self) -> &str;

    async fn consume(&mut self, unit: ContentUnit) -> Result<()>;

    /// Called once after the last unit of a run that did not halt.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
