use axum::{http::StatusCode, Json};
use quality::{classify_batch, classify_release};

use crate::state::{ClassifyRequest, ClassifyResponse, JsonResult};
use crate::utils::json_error;

pub async fn classify(Json(payload): Json<ClassifyRequest>) -> JsonResult<ClassifyResponse> {
    let release_type = match payload {
        ClassifyRequest::Durations { durations_seconds } => classify_batch(&durations_seconds)
            .map_err(|err| json_error(StatusCode::BAD_REQUEST, err.to_string()))?,
        ClassifyRequest::Totals {
            track_count,
            total_duration_minutes,
        } => {
            if track_count == 0 {
                return Err(json_error(
                    StatusCode::BAD_REQUEST,
                    "track_count must be at least 1",
                ));
            }
            classify_release(track_count, total_duration_minutes)
        }
    };
    Ok(Json(ClassifyResponse {
        release_type,
        label: release_type.label(),
    }))
}
