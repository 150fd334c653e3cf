//! Typed errors for the cognita pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Each failure domain
//! gets its own enum; [`UnitError`] unions the per-unit ones and
//! [`PipelineError`] holds everything that halts a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type for external service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Result type for type classification.
pub type ClassificationResult<T> = std::result::Result<T, ClassificationError>;

/// Failure signal of the external classifier/narrator service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Connection refused, DNS failure or other transport problem
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The service did not answer in time
    #[error("service timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered, but not in the expected schema
    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    /// The service answered with an error status
    #[error("service error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Errors computing a unit's identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The referenced payload could not be read for hashing
    #[error("payload unreadable at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the fallback classification stage.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The classifier could not be consulted
    #[error("classifier failed: {0}")]
    Service(#[from] ServiceError),

    /// The classifier answered without the required fields
    #[error("unusable classification: {0}")]
    Unusable(String),
}

/// Errors in archive or message framing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Payload does not start with a mailbox `From ` line
    #[error("not a mailbox archive: {0}")]
    NotMailbox(String),

    /// One message inside an archive is malformed
    #[error("malformed message #{index}: {reason}")]
    Message { index: usize, reason: String },
}

/// Errors extracting triples.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Neither identity nor caps yield a subject
    #[error("no derivable subject for unit")]
    NoSubject,

    /// Statement extraction service failed
    #[error("statement extraction failed: {0}")]
    Service(#[from] ServiceError),
}

/// Per-unit errors. A unit failing with one of these never halts the run on
/// its own; see [`ElementError::fatal`].
#[derive(Debug, Error)]
pub enum UnitError {
    /// Payload could not be loaded
    #[error("payload I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A narrator could not produce text
    #[error("narration failed: {0}")]
    Narration(#[source] ServiceError),

    /// A stage refused the unit for a reason of its own
    #[error("unit rejected: {0}")]
    Rejected(String),
}

/// Error raised by a transform for one unit.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ElementError {
    #[source]
    pub error: UnitError,

    /// Halt the whole run instead of recording the failure and moving on
    pub fatal: bool,
}

impl ElementError {
    /// A per-unit failure; the run continues.
    pub fn recoverable(error: impl Into<UnitError>) -> Self {
        Self {
            error: error.into(),
            fatal: false,
        }
    }

    /// A failure that halts the run.
    pub fn fatal(error: impl Into<UnitError>) -> Self {
        Self {
            error: error.into(),
            fatal: true,
        }
    }
}

impl From<UnitError> for ElementError {
    fn from(error: UnitError) -> Self {
        Self::recoverable(error)
    }
}

impl From<std::io::Error> for ElementError {
    fn from(error: std::io::Error) -> Self {
        Self::recoverable(error)
    }
}

impl From<IdentityError> for ElementError {
    fn from(error: IdentityError) -> Self {
        Self::recoverable(error)
    }
}

impl From<ClassificationError> for ElementError {
    fn from(error: ClassificationError) -> Self {
        Self::recoverable(error)
    }
}

impl From<ParseError> for ElementError {
    fn from(error: ParseError) -> Self {
        Self::recoverable(error)
    }
}

impl From<ExtractionError> for ElementError {
    fn from(error: ExtractionError) -> Self {
        Self::recoverable(error)
    }
}

/// Errors that halt a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source could not produce its next unit
    #[error("source failed: {0}")]
    Source(#[source] std::io::Error),

    /// The sink could not consume a unit
    #[error("sink failed: {0}")]
    Sink(#[source] std::io::Error),

    /// Invalid configuration or pipeline assembly
    #[error("config error: {0}")]
    Config(String),

    /// A stage raised an error flagged fatal
    #[error("fatal error in stage {stage}: {error}")]
    Fatal {
        stage: String,
        #[source]
        error: UnitError,
    },
}
