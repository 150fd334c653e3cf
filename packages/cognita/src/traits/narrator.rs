//! Narrator trait: turns a content unit into descriptive text.

use async_trait::async_trait;

use crate::error::UnitError;
use crate::types::caps::Caps;
use crate::types::unit::ContentUnit;

/// Produces a narration for the units it accepts.
///
/// New content types get their own implementation registered with
/// [`crate::transforms::Narrate`].
#[async_trait]
pub trait Narrator: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this narrator handles units with these caps.
    fn accepts(&self, caps: &Caps) -> bool;

    async fn narrate(&self, unit: &ContentUnit) -> Result<String, UnitError>;
}
