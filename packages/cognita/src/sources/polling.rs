use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use super::file::file_uri;
use crate::error::{PipelineError, Result};
use crate::traits::element::Source;
use crate::types::caps::{Caps, Field};
use crate::types::unit::ContentUnit;

/// Time-series source: re-reads one file every `period`.
///
/// Unbounded unless [`PollingSource::with_max_ticks`] is set; run it with
/// a cancellation token to stop it.
pub struct PollingSource {
    path: PathBuf,
    period: Duration,
    ticker: Option<Interval>,
    max_ticks: Option<u64>,
    ticks: u64,
}

impl PollingSource {
    pub fn new(path: impl Into<PathBuf>, period: Duration) -> Self {
        Self {
            path: path.into(),
            period,
            ticker: None,
            max_ticks: None,
            ticks: 0,
        }
    }

    /// Stop after this many readings.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

#[async_trait]
impl Source for PollingSource {
    fn name(&self) -> &str {
        "polling"
    }

    async fn next_unit(&mut self) -> Result<Option<ContentUnit>> {
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            return Ok(None);
        }

        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        // The first tick completes immediately
        ticker.tick().await;
        self.ticks += 1;

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(PipelineError::Source)?;
        debug!(path = %self.path.display(), tick = self.ticks, len = bytes.len(), "polled file");

        let caps = Caps::new().with(Field::SourceUri, file_uri(&self.path));
        Ok(Some(ContentUnit::new(Bytes::from(bytes)).with_caps(caps)))
    }
}
