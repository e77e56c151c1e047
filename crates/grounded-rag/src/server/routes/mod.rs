//! API routes

pub mod figures;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
    Router,
};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for file uploads
        .route(
            "/upload-pdf",
            post(ingest::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/current-chunks", get(ingest::current_chunks))
        // Questions and retrieval
        .route("/ask", post(query::ask))
        .route("/retrieve", post(query::retrieve))
        // Figure lookup
        .route("/figures", get(figures::list_figures))
        .route(
            "/figures/match",
            post(figures::match_figure).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Info
        .route("/info", get(info))
}

/// Read the multipart field named `file`, returning its file name and bytes
pub(crate) async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_request(format!("Failed to read file: {}", e)))?;

        if data.is_empty() {
            return Err(Error::invalid_request(format!("Uploaded file '{}' is empty", filename)));
        }
        return Ok((filename, data));
    }

    Err(Error::invalid_request("Missing multipart field 'file'"))
}

/// Response for requests made before any document was loaded
pub(crate) fn empty_corpus_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": {
                "type": "empty_corpus",
                "message": "No PDF processed yet.",
            }
        })),
    )
        .into_response()
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "grounded-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over one PDF with grounded confidence and figure matching",
        "endpoints": {
            "POST /api/upload-pdf": "Upload a PDF (multipart field 'file') and make it the active document",
            "GET /api/current-chunks": "Passages of the active document",
            "POST /api/ask": "Answer a question from the active document",
            "POST /api/retrieve": "Ranked passages for a query",
            "GET /api/figures": "Figures of the active document",
            "POST /api/figures/match": "Find the stored figure closest to an uploaded image",
            "GET /static/figures/*": "Stored figure images"
        },
        "features": {
            "chunking": "Fixed-size overlapping word windows per page",
            "figure_dedup": "Entropy filter and perceptual-hash deduplication",
            "confidence": "Lexical grounding score between answer and evidence",
            "grounded_answers": "LLM uses only document content, no external knowledge"
        }
    }))
}
