//! Sink implementations.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::traits::element::Sink;
use crate::triples::Graph;
use crate::types::caps::Field;
use crate::types::unit::ContentUnit;

#[derive(Debug, Default)]
struct Collected {
    units: Vec<ContentUnit>,
    finished: bool,
}

/// Keeps every unit it receives. Inspect them through a [`CollectHandle`].
#[derive(Debug, Default)]
pub struct CollectSink {
    inner: Arc<Mutex<Collected>>,
}

/// Shared view of a [`CollectSink`]'s units.
#[derive(Debug, Clone)]
pub struct CollectHandle {
    inner: Arc<Mutex<Collected>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> CollectHandle {
        CollectHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CollectHandle {
    /// Units received so far, in arrival order.
    pub fn units(&self) -> Vec<ContentUnit> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .units
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the run finished without halting.
    pub fn finished(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).finished
    }
}

#[async_trait]
impl Sink for CollectSink {
    fn name(&self) -> &str {
        "collect"
    }

    async fn consume(&mut self, unit: ContentUnit) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .units
            .push(unit);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).finished = true;
        Ok(())
    }
}

/// Discards units, counting them and their triples.
#[derive(Debug, Default)]
pub struct SilentSink {
    units: u64,
    triples: u64,
}

impl SilentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn triples(&self) -> u64 {
        self.triples
    }
}

#[async_trait]
impl Sink for SilentSink {
    fn name(&self) -> &str {
        "silent"
    }

    async fn consume(&mut self, unit: ContentUnit) -> Result<()> {
        self.units += 1;
        self.triples += unit.caps().triple_count() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        debug!(units = self.units, triples = self.triples, "silent sink finished");
        Ok(())
    }
}

/// Accumulates every unit's triples and writes them as Turtle when the run
/// finishes.
pub struct TurtleSink<W: Write + Send> {
    graph: Graph,
    out: W,
}

impl<W: Write + Send> TurtleSink<W> {
    pub fn new(namespace: impl Into<String>, out: W) -> Self {
        Self {
            graph: Graph::new(namespace),
            out,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> Sink for TurtleSink<W> {
    fn name(&self) -> &str {
        "turtle"
    }

    async fn consume(&mut self, unit: ContentUnit) -> Result<()> {
        self.graph.extend(unit.caps().triples());
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.graph
            .write_turtle(&mut self.out)
            .and_then(|_| self.out.flush())
            .map_err(PipelineError::Sink)
    }
}

/// Writes one JSON line per unit: caps summary, narration, triples and
/// annotations.
pub struct SummarySink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> SummarySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> Sink for SummarySink<W> {
    fn name(&self) -> &str {
        "summary"
    }

    async fn consume(&mut self, unit: ContentUnit) -> Result<()> {
        let caps = unit.caps();
        let line = json!({
            "identity": caps.text(Field::Identity),
            "placeholder": unit.is_placeholder(),
            "caps": caps.summary_json(),
            "triples": caps.triples().map(|t| t.to_string()).collect::<Vec<_>>(),
            "annotations": unit.annotations().iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        });
        writeln!(self.out, "{}", line).map_err(PipelineError::Sink)
    }

    async fn finish(&mut self) -> Result<()> {
        self.out.flush().map_err(PipelineError::Sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::caps::Caps;
    use crate::types::triple::Term;

    fn unit_with_triple() -> ContentUnit {
        let mut caps = Caps::new()
            .with(Field::Identity, "urn:cognita:content:abc")
            .with(Field::Format, "png");
        caps.add_triple(
            "urn:cognita:content:abc",
            "http://purl.org/dc/terms/format",
            Term::literal("image/png"),
        );
        ContentUnit::new("x").with_caps(caps)
    }

    #[tokio::test]
    async fn test_collect_handle_sees_units() {
        let mut sink = CollectSink::new();
        let handle = sink.handle();
        sink.consume(unit_with_triple()).await.unwrap();
        assert_eq!(handle.len(), 1);
        assert!(!handle.finished());
        sink.finish().await.unwrap();
        assert!(handle.finished());
    }

    #[tokio::test]
    async fn test_turtle_sink_writes_on_finish() {
        let mut sink = TurtleSink::new("cognita", Vec::new());
        sink.consume(unit_with_triple()).await.unwrap();
        sink.consume(unit_with_triple()).await.unwrap();
        assert_eq!(sink.graph().len(), 1);

        sink.finish().await.unwrap();
        let ttl = String::from_utf8(sink.into_inner()).unwrap();
        assert!(ttl.contains("<urn:cognita:content:abc>\n    dcterms:format \"image/png\" ."));
    }

    #[tokio::test]
    async fn test_summary_sink_json_lines() {
        let mut sink = SummarySink::new(Vec::new());
        sink.consume(unit_with_triple()).await.unwrap();
        sink.consume(ContentUnit::placeholder("mbox_split", "bad")).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["caps"]["format"], "png");
        assert_eq!(lines[0]["triples"].as_array().unwrap().len(), 1);
        assert_eq!(lines[1]["placeholder"], true);
        assert_eq!(lines[1]["annotations"][0], "[mbox_split] bad");
    }

    #[tokio::test]
    async fn test_silent_sink_counts() {
        let mut sink = SilentSink::new();
        sink.consume(unit_with_triple()).await.unwrap();
        assert_eq!((sink.units(), sink.triples()), (1, 1));
    }
}
