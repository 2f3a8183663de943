//! Per-session ownership of generated artifacts.
//!
//! Each interactive session retains exactly one current artifact. Installing a
//! new one releases the previous file; releasing is best effort and a failure
//! is logged as a [`AnalysisError::ResourceCleanup`] without blocking the new
//! artifact.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tempfile::TempPath;
use tracing::{info, warn};

use crate::error::AnalysisError;

/// What an artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Animated GIF.
    Timelapse,
}

impl ArtifactKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Timelapse => "image/gif",
        }
    }
}

/// A generated file in temporary storage. The file is deleted when the
/// artifact is released or dropped.
#[derive(Debug)]
pub struct Artifact {
    path: TempPath,
    kind: ArtifactKind,
    download_name: String,
}

impl Artifact {
    pub fn new(path: TempPath, kind: ArtifactKind, download_name: &str) -> Self {
        Self {
            path,
            kind,
            download_name: download_name.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Delete the file now, reporting failure.
    pub fn release(self) -> Result<(), AnalysisError> {
        let path = self.path.to_path_buf();
        self.path
            .close()
            .map_err(|source| AnalysisError::ResourceCleanup { path, source })
    }
}

/// State of one interactive session.
#[derive(Debug)]
pub struct SessionContext {
    id: String,
    current: Option<Artifact>,
}

impl SessionContext {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            current: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.current.as_ref()
    }

    /// Make `artifact` current, releasing the previous one.
    ///
    /// Returns the cleanup error, if releasing the previous artifact failed.
    pub fn install(&mut self, artifact: Artifact) -> Option<AnalysisError> {
        info!(
            session = %self.id,
            path = %artifact.path().display(),
            "Installing session artifact"
        );
        self.current.replace(artifact).and_then(|old| self.release_artifact(old))
    }

    /// Release the current artifact, if any.
    pub fn clear(&mut self) -> Option<AnalysisError> {
        self.current.take().and_then(|old| self.release_artifact(old))
    }

    fn release_artifact(&self, artifact: Artifact) -> Option<AnalysisError> {
        match artifact.release() {
            Ok(()) => None,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to release superseded artifact");
                Some(e)
            }
        }
    }
}

/// Sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionContext>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session with this id, created on first use.
    pub fn session(&mut self, id: &str) -> &mut SessionContext {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionContext::new(id))
    }

    pub fn get(&self, id: &str) -> Option<&SessionContext> {
        self.sessions.get(id)
    }

    /// Forget the session, releasing its artifact. Unknown ids are a no-op.
    ///
    /// Returns the cleanup error, if releasing the artifact failed.
    pub fn release(&mut self, id: &str) -> Option<AnalysisError> {
        self.sessions.remove(id).and_then(|mut session| session.clear())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
