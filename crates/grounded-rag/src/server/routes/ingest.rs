//! Document upload and passage listing

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{FigureSummary, IngestStats, Passage};

use super::read_file_field;

/// Response to a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub session_id: Uuid,
    pub document_name: String,
    pub content_hash: String,
    pub chunks: Vec<Passage>,
    pub figures: Vec<FigureSummary>,
    pub stats: IngestStats,
    pub processing_time_ms: u64,
}

/// POST /api/upload-pdf - Upload a PDF and make it the active document
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

    let limit = state.config().ingestion.timeout_secs;
    let engine = state.engine();
    let report = timeout(Duration::from_secs(limit), engine.ingest(&filename, data.to_vec()))
        .await
        .map_err(|_| Error::Timeout(format!("Ingestion of '{}' exceeded {}s", filename, limit)))??;

    let base_url = state.figure_base_url();
    let figures = report
        .figures
        .iter()
        .map(|f| FigureSummary::from_figure(f, &base_url))
        .collect();

    // The report's session is the active one unless another upload already replaced it
    let session = engine.session();
    let chunks = if session.id == report.session_id {
        session.passages.clone()
    } else {
        Vec::new()
    };

    Ok(Json(UploadResponse {
        status: "PDF processed successfully.".to_string(),
        session_id: report.session_id,
        document_name: report.document_name,
        content_hash: report.content_hash,
        chunks,
        figures,
        stats: report.stats,
        processing_time_ms: report.processing_time_ms,
    }))
}

/// Passages of the active document
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CurrentChunksResponse {
    Loaded {
        session_id: Uuid,
        document_name: Option<String>,
        chunks: Vec<Passage>,
    },
    Empty {
        status: String,
    },
}

/// GET /api/current-chunks - Passages of the active document
pub async fn current_chunks(State(state): State<AppState>) -> Json<CurrentChunksResponse> {
    let session = state.engine().session();

    if !session.has_document() {
        return Json(CurrentChunksResponse::Empty {
            status: "No PDF processed yet.".to_string(),
        });
    }

    Json(CurrentChunksResponse::Loaded {
        session_id: session.id,
        document_name: session.document_name.clone(),
        chunks: session.passages.clone(),
    })
}
