//! Figure store trait for persisting accepted figure images

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Location of a figure relative to the store root
pub fn figure_location(session_id: Uuid, page: u32, index: u32, ext: &str) -> String {
    format!("{}/page{}_{}.{}", session_id, page, index, ext)
}

/// Trait for blob storage of figure bytes
///
/// Implementations:
/// - `LocalFigureStore`: one directory per session on the local filesystem
#[async_trait]
pub trait FigureStore: Send + Sync {
    /// Persist figure bytes and return their location
    async fn put(&self, session_id: Uuid, page: u32, index: u32, ext: &str, bytes: &[u8]) -> Result<String>;

    /// Remove every figure of a session; clearing an unknown session is a no-op
    async fn clear_session(&self, session_id: Uuid) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
