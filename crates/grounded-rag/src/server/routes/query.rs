//! Question answering and retrieval endpoints

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskOutcome, AskRequest, FigureSummary, Retrieval, RetrievalHit, RetrieveRequest};

use super::empty_corpus_response;

/// Answer returned to HTTP clients
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub figures: Vec<FigureSummary>,
    /// Public figure URLs, in the same order as `figures`
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits: Option<Vec<RetrievalHit>>,
    pub session_id: Uuid,
    pub processing_time_ms: u64,
}

/// POST /api/ask - Answer a question from the active document
pub async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Result<Response> {
    tracing::info!("Question: \"{}\"", request.question);

    let answer = match state.engine().ask(&request.question, request.top_k).await? {
        AskOutcome::NoDocument => return Ok(empty_corpus_response()),
        AskOutcome::Answered(answer) => answer,
    };

    let base_url = state.figure_base_url();
    let figures: Vec<FigureSummary> = answer
        .figures
        .iter()
        .map(|f| FigureSummary::from_figure(f, &base_url))
        .collect();
    let images = figures.iter().map(|f| f.url.clone()).collect();

    let response = AskResponse {
        answer: answer.answer,
        confidence: answer.confidence,
        sources: answer.sources,
        figures,
        images,
        hits: request.include_hits.then_some(answer.hits),
        session_id: answer.session_id,
        processing_time_ms: answer.processing_time_ms,
    };

    Ok(Json(response).into_response())
}

/// Ranked passages for a query
#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub hits: Vec<RetrievalHit>,
}

/// POST /api/retrieve - Ranked passages without answer generation
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Response> {
    match state.engine().retrieve(&request.query, request.top_k).await? {
        Retrieval::EmptyCorpus => Ok(empty_corpus_response()),
        Retrieval::Hits(hits) => Ok(Json(RetrieveResponse { hits }).into_response()),
    }
}
