use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::traits::element::Source;
use crate::types::caps::{Caps, Field};
use crate::types::unit::{ContentUnit, Payload};

/// `file://` URI for a path, absolute when it can be resolved.
pub fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Read up to `prebuffer` bytes of a file into a payload.
pub async fn read_payload(path: &Path, prebuffer: usize) -> std::io::Result<Payload> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();

    let mut prefix = Vec::with_capacity(prebuffer.min(len as usize));
    file.take(prebuffer as u64).read_to_end(&mut prefix).await?;

    Ok(Payload::File {
        path: path.to_path_buf(),
        prefix: Bytes::from(prefix),
        len,
    })
}

/// Discrete source: one unit per file path, in the given order.
///
/// Only the first `prebuffer` bytes are read up front; stages that need
/// the whole payload load it on demand. A file that cannot be opened halts
/// the run.
pub struct FileSource {
    paths: VecDeque<PathBuf>,
    prebuffer: usize,
}

impl FileSource {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>, prebuffer: usize) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            prebuffer,
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

#[async_trait]
impl Source for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn next_unit(&mut self) -> Result<Option<ContentUnit>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };

        let payload = read_payload(&path, self.prebuffer)
            .await
            .map_err(PipelineError::Source)?;
        debug!(path = %path.display(), len = payload.len(), "read file");

        let caps = Caps::new().with(Field::SourceUri, file_uri(&path));
        Ok(Some(ContentUnit::new(payload).with_caps(caps)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_reads_prefix_and_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut source = FileSource::new([file.path()], 4);
        let unit = source.next_unit().await.unwrap().unwrap();

        assert_eq!(unit.payload().prefix(), b"0123");
        assert_eq!(unit.payload().len(), 10);
        assert!(!unit.payload().is_complete());
        assert_eq!(&unit.payload().load().await.unwrap()[..], b"0123456789");
        assert!(unit
            .caps()
            .text(Field::SourceUri)
            .unwrap()
            .starts_with("file:///"));
        assert!(source.next_unit().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileSource::new([dir.path().join("missing.bin")], 16);
        assert!(matches!(source.next_unit().await, Err(PipelineError::Source(_))));
    }
}
