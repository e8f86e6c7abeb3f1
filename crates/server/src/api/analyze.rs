use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use quality::{AnalysisError, RawAudioBuffer};

use crate::state::{AnalyzeQuery, AnalyzeResponse, AppState, JsonResult};
use crate::utils::{analysis_error, json_error, sanitize_filename};

const FILENAME_HEADER: &str = "x-filename";
const DEFAULT_FILENAME: &str = "upload.mp3";

pub async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> JsonResult<AnalyzeResponse> {
    let limit = state.config.max_upload_bytes;
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    if let Some(size) = content_length.filter(|size| *size > limit) {
        return Err(analysis_error(&AnalysisError::TooLarge { size, limit }));
    }
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            // The body limit sits one byte above the configured ceiling.
            let size = content_length.unwrap_or(0).max(limit.saturating_add(1));
            return Err(analysis_error(&AnalysisError::TooLarge { size, limit }));
        }
        Err(rejection) => return Err(json_error(rejection.status(), rejection.body_text())),
    };

    let filename = query
        .filename
        .as_deref()
        .or_else(|| {
            headers
                .get(FILENAME_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .and_then(sanitize_filename)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let declared_size = content_length.unwrap_or(body.len() as u64);

    let buffer = RawAudioBuffer::new(body, filename).with_declared_size(declared_size);
    let analyzer = Arc::clone(&state.analyzer);
    let result = tokio::task::spawn_blocking(move || analyzer.analyze(buffer))
        .await
        .map_err(|err| {
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("analysis task failed: {}", err),
            )
        })?;
    let analysis = result.map_err(|err| analysis_error(&err))?;

    let passed = analysis.report.meets(state.config.min_passing_score);
    Ok(Json(AnalyzeResponse {
        duration_display: analysis.audio.duration_display(),
        filesize_display: analysis.audio.filesize_display(),
        display_recommendations: analysis.report.display_recommendations(),
        passed,
        analysis,
    }))
}
