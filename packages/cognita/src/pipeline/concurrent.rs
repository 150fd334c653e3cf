//! Bounded concurrent execution.
//!
//! Up to `workers` source units are driven through the transforms at once;
//! their surviving units are buffered and handed to the sink in source
//! order, so the sink sees the same sequence as a sequential run.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::engine::{traverse, Pipeline};
use super::report::RunReport;
use crate::error::{PipelineError, Result};

impl Pipeline {
    /// Run with up to `workers` source units in flight.
    pub async fn run_concurrent(self, workers: usize) -> Result<RunReport> {
        self.run_concurrent_until_cancelled(workers, CancellationToken::new())
            .await
    }

    /// Concurrent run that stops pulling source units once `token` is
    /// cancelled. Units already in flight are finished and delivered.
    pub async fn run_concurrent_until_cancelled(
        self,
        workers: usize,
        token: CancellationToken,
    ) -> Result<RunReport> {
        if workers == 0 {
            return Err(PipelineError::Config("worker count must be at least 1".into()));
        }

        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline_run", %run_id, source = self.source.name(), workers);
        let Pipeline {
            mut source,
            transforms,
            mut sink,
        } = self;

        async move {
            info!("concurrent pipeline started");
            let mut report = RunReport::new(run_id);

            {
                let pulled = stream::unfold(
                    (source.as_mut(), 0u64, token.clone(), false),
                    |(source, sequence, token, done)| async move {
                        if done || token.is_cancelled() {
                            return None;
                        }
                        let next = tokio::select! {
                            biased;
                            _ = token.cancelled() => return None,
                            next = source.next_unit() => next,
                        };
                        match next {
                            Ok(Some(unit)) => Some((
                                Ok((sequence, unit)),
                                (source, sequence + 1, token, false),
                            )),
                            Ok(None) => None,
                            // Yield the error once, then end the stream
                            Err(e) => Some((Err(e), (source, sequence + 1, token, true))),
                        }
                    },
                );

                let transforms = &transforms;
                let mut outcomes = Box::pin(
                    pulled
                        .map(|item| async move {
                            match item {
                                Ok((sequence, unit)) => {
                                    traverse(transforms, unit, sequence, None).await
                                }
                                Err(e) => Err(e),
                            }
                        })
                        .buffered(workers),
                );

                while let Some(outcome) = outcomes.next().await {
                    let mut traversal = outcome?;
                    report.units_read += 1;
                    for unit in std::mem::take(&mut traversal.buffered) {
                        sink.consume(unit).await?;
                    }
                    traversal.merge_into(&mut report);
                }
            }

            report.cancelled = token.is_cancelled();
            if report.cancelled {
                warn!(units_read = report.units_read, "pipeline cancelled");
            }
            sink.finish().await?;

            info!(
                units_read = report.units_read,
                delivered = report.delivered,
                filtered = report.filtered,
                failed = report.failures.len(),
                "pipeline finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
