//! Sequential pipeline execution.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::report::{RunReport, UnitFailure};
use crate::error::{ElementError, PipelineError, Result};
use crate::traits::element::{Emit, Sink, Source, Transform};
use crate::types::caps::Field;
use crate::types::unit::ContentUnit;

type Frame = (usize, Box<dyn Iterator<Item = ContentUnit> + Send>);

/// An assembled Source → Transforms → Sink chain.
///
/// Stage order is fixed at construction. Running consumes the pipeline.
pub struct Pipeline {
    pub(crate) source: Box<dyn Source>,
    pub(crate) transforms: Vec<Arc<dyn Transform>>,
    pub(crate) sink: Box<dyn Sink>,
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    source: Option<Box<dyn Source>>,
    transforms: Vec<Arc<dyn Transform>>,
    sink: Option<Box<dyn Sink>>,
}

impl PipelineBuilder {
    pub fn source(mut self, source: impl Source + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Append a transform stage.
    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let source = self
            .source
            .ok_or_else(|| PipelineError::Config("pipeline has no source".into()))?;
        let sink = self
            .sink
            .ok_or_else(|| PipelineError::Config("pipeline has no sink".into()))?;
        Ok(Pipeline {
            source,
            transforms: self.transforms,
            sink,
        })
    }
}

/// Result of driving one source unit through every transform.
#[derive(Default)]
pub(crate) struct Traversal {
    pub delivered: u64,
    pub filtered: u64,
    pub placeholders: u64,
    pub failures: Vec<UnitFailure>,

    /// Surviving units when no sink was given, in delivery order
    pub buffered: Vec<ContentUnit>,
}

impl Traversal {
    pub(crate) fn merge_into(self, report: &mut RunReport) {
        report.delivered += self.delivered;
        report.filtered += self.filtered;
        report.placeholders += self.placeholders;
        report.failures.extend(self.failures);
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run to completion, one unit at a time.
    pub async fn run(self) -> Result<RunReport> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Run until the source ends or `token` is cancelled. Cancellation is
    /// checked between source units; a unit already started is finished.
    pub async fn run_until_cancelled(mut self, token: CancellationToken) -> Result<RunReport> {
        let run_id = Uuid::now_v7();
        let span = info_span!("pipeline_run", %run_id, source = self.source.name());

        async move {
            info!(stages = ?self.stage_names(), "pipeline started");
            let mut report = RunReport::new(run_id);

            loop {
                if token.is_cancelled() {
                    report.cancelled = true;
                    break;
                }

                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    next = self.source.next_unit() => next?,
                };
                let Some(unit) = next else { break };

                let sequence = report.units_read;
                report.units_read += 1;

                let traversal =
                    traverse(&self.transforms, unit, sequence, Some(self.sink.as_mut())).await?;
                traversal.merge_into(&mut report);
            }

            if report.cancelled {
                warn!(units_read = report.units_read, "pipeline cancelled");
            }
            self.sink.finish().await?;

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

/// Drive one source unit depth-first through `transforms`.
///
/// Each fanned-out unit finishes the remaining stages before its next
/// sibling starts. Units reach `sink` as they complete, or are buffered
/// when no sink is given.
pub(crate) async fn traverse(
    transforms: &[Arc<dyn Transform>],
    unit: ContentUnit,
    sequence: u64,
    mut sink: Option<&mut dyn Sink>,
) -> Result<Traversal> {
    let mut traversal = Traversal::default();
    let mut stack: Vec<Frame> = vec![(0, Box::new(std::iter::once(unit)))];

    while let Some((stage, iter)) = stack.last_mut() {
        let stage = *stage;
        let Some(unit) = iter.next() else {
            stack.pop();
            continue;
        };

        // Placeholders skip the remaining stages
        if stage == transforms.len() || unit.is_placeholder() {
            if unit.is_placeholder() {
                traversal.placeholders += 1;
            }
            traversal.delivered += 1;
            match sink.as_deref_mut() {
                Some(sink) => sink.consume(unit).await?,
                None => traversal.buffered.push(unit),
            }
            continue;
        }

        let transform = &transforms[stage];
        let identity = unit_identity(&unit);
        let name = unit.display_name();

        match transform.transform(unit).await {
            Ok(Emit::Drop) => {
                debug!(stage = transform.name(), unit = %name, "unit filtered");
                traversal.filtered += 1;
            }
            Ok(Emit::One(next)) => stack.push((stage + 1, Box::new(std::iter::once(next)))),
            Ok(Emit::Many(children)) => stack.push((stage + 1, children)),
            Err(ElementError { error, fatal: true }) => {
                warn!(stage = transform.name(), unit = %name, error = %error, "fatal stage error");
                return Err(PipelineError::Fatal {
                    stage: transform.name().to_string(),
                    error,
                });
            }
            Err(ElementError { error, .. }) => {
                warn!(stage = transform.name(), unit = %name, error = %error, "unit failed");
                traversal.failures.push(UnitFailure {
                    sequence,
                    identity,
                    unit: name,
                    stage: transform.name().to_string(),
                    error,
                });
            }
        }
    }

    Ok(traversal)
}

fn unit_identity(unit: &ContentUnit) -> Option<String> {
    unit.identity()
        .map(|id| id.iri().to_string())
        .or_else(|| unit.caps().text(Field::Identity).map(str::to_string))
}
