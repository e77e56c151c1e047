//! Active document session and its atomic replacement

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::providers::VectorIndex;
use crate::types::{Figure, IngestStats, Passage};

/// Everything known about the currently loaded document
///
/// Built completely before it is published and never mutated afterwards.
pub struct Session {
    /// Session identifier
    pub id: Uuid,
    /// Name of the ingested document; `None` for an empty session
    pub document_name: Option<String>,
    /// SHA-256 (hex) of the document bytes
    pub content_hash: Option<String>,
    /// When the session was built
    pub created_at: DateTime<Utc>,
    /// Passages in page order
    pub passages: Vec<Passage>,
    /// Canonical figures in page-then-insertion order
    pub figures: Vec<Figure>,
    /// Vector index holding exactly this session's passages
    pub index: Arc<dyn VectorIndex>,
    /// Ingestion counters
    pub stats: IngestStats,
}

impl Session {
    /// A session with no document
    pub fn empty(id: Uuid, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            id,
            document_name: None,
            content_hash: None,
            created_at: Utc::now(),
            passages: Vec::new(),
            figures: Vec::new(),
            index,
            stats: IngestStats::default(),
        }
    }

    /// Whether a document with text is loaded
    pub fn has_document(&self) -> bool {
        !self.passages.is_empty()
    }

    /// Figures on any of `pages`, in session order
    pub fn figures_on_pages(&self, pages: &[u32]) -> Vec<Figure> {
        self.figures
            .iter()
            .filter(|f| pages.contains(&f.page))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("document_name", &self.document_name)
            .field("passages", &self.passages.len())
            .field("figures", &self.figures.len())
            .field("index", &self.index.name())
            .finish()
    }
}

/// Holder of the active session
///
/// Readers take a snapshot (`Arc` clone) and keep using it even if a new
/// session is published meanwhile. Publication swaps the pointer under a
/// write lock, so passages, figures and index always change together.
pub struct SessionStore {
    current: RwLock<Arc<Session>>,
}

impl SessionStore {
    pub fn new(initial: Session) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The active session
    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.current.read())
    }

    /// Publish `next` and return the session it replaced
    pub fn replace(&self, next: Session) -> Arc<Session> {
        let next = Arc::new(next);
        let mut current = self.current.write();
        std::mem::replace(&mut *current, next)
    }

    /// Identifier of the active session
    pub fn current_id(&self) -> Uuid {
        self.current.read().id
    }
}
