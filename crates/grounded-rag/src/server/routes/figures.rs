//! Figure listing and matching endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{FigureSummary, MatchResult};

use super::read_file_field;

/// Figures of the active document
#[derive(Debug, Serialize)]
pub struct FiguresResponse {
    pub session_id: Uuid,
    pub figures: Vec<FigureSummary>,
}

/// GET /api/figures - Figures of the active document
pub async fn list_figures(State(state): State<AppState>) -> Json<FiguresResponse> {
    let session = state.engine().session();
    let base_url = state.figure_base_url();

    Json(FiguresResponse {
        session_id: session.id,
        figures: session
            .figures
            .iter()
            .map(|f| FigureSummary::from_figure(f, &base_url))
            .collect(),
    })
}

/// Match outcome with a public figure URL
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figure: Option<FigureSummary>,
    /// Distance to the closest figure; absent when the session has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
}

/// POST /api/figures/match - Closest stored figure to an uploaded image
pub async fn match_figure(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MatchResponse>> {
    let (filename, data) = read_file_field(&mut multipart).await?;
    tracing::debug!("Matching figure upload {} ({} bytes)", filename, data.len());

    let result = state.engine().match_figure(data.to_vec()).await?;
    let base_url = state.figure_base_url();

    let response = match result {
        MatchResult::Matched { figure, distance } => MatchResponse {
            matched: true,
            figure: Some(FigureSummary::from_figure(&figure, &base_url)),
            distance: Some(distance),
        },
        MatchResult::NoMatch { best_distance } => MatchResponse {
            matched: false,
            figure: None,
            distance: best_distance,
        },
    };

    Ok(Json(response))
}
