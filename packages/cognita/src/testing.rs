//! Testing utilities including mock implementations.
//!
//! These are useful for testing pipelines without a running model server.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ElementError, PipelineError, Result, ServiceError, ServiceResult};
use crate::traits::ai::{
    Classification, ClassifySample, DescribeKind, DescribeRequest, Statement, StatementRequest, AI,
};
use crate::traits::element::{Emit, Source, Transform};
use crate::types::unit::ContentUnit;

/// A mock AI implementation for testing.
///
/// Returns deterministic, configurable responses and records every call.
#[derive(Default)]
pub struct MockAI {
    /// Answer for classify calls
    classification: Option<Classification>,

    /// Error for classify calls (takes precedence)
    classify_error: Option<ServiceError>,

    /// Answer for describe calls
    description: Option<String>,

    describe_error: Option<ServiceError>,

    /// Answer for statement extraction
    statements: Vec<Statement>,

    statement_error: Option<ServiceError>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAICall {
    Classify { label: String, header_hex: String },
    Describe { kind: DescribeKind, image_count: usize },
    ExtractStatements { subject: String, text_len: usize },
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_classify_error(mut self, error: ServiceError) -> Self {
        self.classify_error = Some(error);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_describe_error(mut self, error: ServiceError) -> Self {
        self.describe_error = Some(error);
        self
    }

    pub fn with_statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = statements;
        self
    }

    pub fn with_statement_error(mut self, error: ServiceError) -> Self {
        self.statement_error = Some(error);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    pub fn classify_calls(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockAICall::Classify { .. }))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn record(&self, call: MockAICall) {
        self.calls.write().unwrap().push(call);
    }
}

#[async_trait]
impl AI for MockAI {
    async fn classify(&self, sample: &ClassifySample) -> ServiceResult<Classification> {
        self.record(MockAICall::Classify {
            label: sample.label.clone(),
            header_hex: sample.header_hex.clone(),
        });

        if let Some(error) = &self.classify_error {
            return Err(error.clone());
        }
        Ok(self.classification.clone().unwrap_or_else(|| Classification {
            type_name: "binary".into(),
            mime_type: "application/octet-stream".into(),
            extensions: vec!["bin".into()],
            rationale: None,
        }))
    }

    async fn describe(&self, request: &DescribeRequest) -> ServiceResult<String> {
        self.record(MockAICall::Describe {
            kind: request.kind,
            image_count: request.images.len(),
        });

        if let Some(error) = &self.describe_error {
            return Err(error.clone());
        }
        Ok(self.description.clone().unwrap_or_else(|| match request.kind {
            DescribeKind::Image => "An image.".to_string(),
            DescribeKind::Text => format!("A text of {} prompt characters.", request.prompt.len()),
        }))
    }

    async fn extract_statements(&self, request: &StatementRequest) -> ServiceResult<Vec<Statement>> {
        self.record(MockAICall::ExtractStatements {
            subject: request.subject.clone(),
            text_len: request.text.len(),
        });

        if let Some(error) = &self.statement_error {
            return Err(error.clone());
        }
        Ok(self.statements.clone())
    }
}

/// In-memory source yielding a fixed list of units.
pub struct VecSource {
    units: VecDeque<ContentUnit>,
}

impl VecSource {
    pub fn new(units: impl IntoIterator<Item = ContentUnit>) -> Self {
        Self {
            units: units.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Source for VecSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn next_unit(&mut self) -> Result<Option<ContentUnit>> {
        Ok(self.units.pop_front())
    }
}

/// Source that yields some units and then fails.
pub struct FailingSource {
    inner: VecSource,
    message: String,
}

impl FailingSource {
    pub fn new(units: impl IntoIterator<Item = ContentUnit>, message: impl Into<String>) -> Self {
        Self {
            inner: VecSource::new(units),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Source for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn next_unit(&mut self) -> Result<Option<ContentUnit>> {
        match self.inner.next_unit().await? {
            Some(unit) => Ok(Some(unit)),
            None => Err(PipelineError::Source(std::io::Error::other(self.message.clone()))),
        }
    }
}

type Script = dyn Fn(ContentUnit) -> std::result::Result<Emit, ElementError> + Send + Sync;
type DelayFn = dyn Fn(&ContentUnit) -> Duration + Send + Sync;

/// Transform driven by a closure, with an optional per-unit delay.
pub struct ScriptedTransform {
    name: String,
    script: Box<Script>,
    delay: Option<Box<DelayFn>>,
}

impl ScriptedTransform {
    pub fn new<F>(name: impl Into<String>, script: F) -> Self
    where
        F: Fn(ContentUnit) -> std::result::Result<Emit, ElementError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            script: Box::new(script),
            delay: None,
        }
    }

    /// Pass every unit through unchanged.
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self::new(name, |unit| Ok(Emit::One(unit)))
    }

    /// Sleep before running the script.
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&ContentUnit) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }
}

#[async_trait]
impl Transform for ScriptedTransform {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&self, unit: ContentUnit) -> std::result::Result<Emit, ElementError> {
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&unit)).await;
        }
        (self.script)(unit)
    }
}
