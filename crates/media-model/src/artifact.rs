//! Recorded chunks and the finalized artifact.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One binary segment delivered by the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Vec<u8>);

impl Chunk {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Ordered, append-only chunk storage for one recording.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Chunk>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Concatenate all chunks in arrival order, leaving the buffer empty.
    pub fn take_concatenated(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(chunk.as_bytes());
        }
        self.total_bytes = 0;
        out
    }
}

/// File name and MIME type of the finished recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub file_name: String,
    pub mime_type: String,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            file_name: "lenscap-recording.webm".to_string(),
            mime_type: "video/webm".to_string(),
        }
    }
}

/// A finalized recording, ready to preview, save, or share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
    format: OutputFormat,
    created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            bytes,
            format,
            created_at: Utc::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.format.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.format.file_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Write the artifact into `dir` under its file name, creating `dir`
    /// if needed. Returns the written path.
    ///
    /// The file name must be a single path component.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let name = Path::new(&self.format.file_name);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid output file name: {:?}", self.format.file_name),
            ));
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.format.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}
