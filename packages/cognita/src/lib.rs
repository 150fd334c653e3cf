//! Content Understanding Pipelines
//!
//! A pipeline framework that types, narrates and graphs file content. Data
//! flows as [`ContentUnit`]s (payload plus [`Caps`]) from a source through
//! transforms to a sink.
//!
//! # Design Philosophy
//!
//! - Deterministic inspection first, language model second
//! - Stable identifiers: a natural key when the content has one, the
//!   content hash otherwise
//! - One bad unit never stops the run
//! - Configuration is an explicit value, never a process-wide default
//!
//! # Usage
//!
//! ```rust,ignore
//! use cognita::{CognitaConfig, FileSource, Pipeline, TurtleSink};
//! use cognita::transforms::{ExtractTriples, MboxSplit, Narrate, TypeFind};
//!
//! let config = CognitaConfig::new();
//! let deriver = IdentityDeriver::new(&config.namespace);
//!
//! let report = Pipeline::builder()
//!     .source(FileSource::new(["inbox.mbox"], config.prebuffer_bytes))
//!     .transform(TypeFind::new(TypeDetector::from_config(&config, ai.clone()), deriver.clone()))
//!     .transform(MboxSplit::new(deriver.clone()))
//!     .transform(Narrate::new().with(MailboxNarrator::new()).with(MessageNarrator::new()))
//!     .transform(ExtractTriples::new(TripleExtractor::from_config(&config, ai)))
//!     .sink(TurtleSink::new(&config.namespace, std::io::stdout()))
//!     .build()?
//!     .run()
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Caps, content units, identities, triples, config
//! - [`traits`] - Core trait abstractions (AI, Narrator, Source, Transform, Sink)
//! - [`identity`] - Content-hash and natural-key identity derivation
//! - [`detect`] - Signature table and two-stage type detection
//! - [`mailbox`] - Mbox framing, header parsing and splitting
//! - [`triples`] - Triple extraction, vocabulary and Turtle output
//! - [`narrators`] - Narrator implementations
//! - [`transforms`] - Built-in pipeline stages
//! - [`pipeline`] - Sequential and concurrent execution
//! - [`sources`] / [`sinks`] - Pipeline endpoints
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod detect;
pub mod error;
pub mod identity;
pub mod mailbox;
pub mod narrators;
pub mod pipeline;
pub mod prompts;
pub mod sinks;
pub mod sources;
pub mod testing;
pub mod traits;
pub mod transforms;
pub mod triples;
pub mod types;

// Re-export core types at crate root
pub use error::{
    ClassificationError, ElementError, ExtractionError, IdentityError, ParseError, PipelineError,
    Result, ServiceError, UnitError,
};
pub use traits::{
    ai::{Classification, ClassifySample, DescribeKind, DescribeRequest, Statement, StatementRequest, AI},
    element::{Emit, Sink, Source, Transform},
    narrator::Narrator,
};
pub use types::{
    caps::{Caps, Field, Value},
    config::CognitaConfig,
    identity::{Identity, IdentityKind, TypeCategory},
    triple::{Term, Triple},
    unit::{Annotation, ContentUnit, ParentRef, Payload},
};

pub use detect::{Detection, DetectionSource, TypeDetector};
pub use identity::IdentityDeriver;
pub use mailbox::MboxSplitter;
pub use narrators::{ImageNarrator, MailboxNarrator, MessageNarrator, TextNarrator};
pub use pipeline::{Pipeline, PipelineBuilder, RunReport, UnitFailure};
pub use sinks::{CollectHandle, CollectSink, SilentSink, SummarySink, TurtleSink};
pub use sources::{FileSource, PollingSource};
pub use triples::{Graph, TripleExtractor};

#[cfg(feature = "ollama")]
pub use ai::OllamaAI;
