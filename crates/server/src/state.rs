use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use quality::{Analysis, Analyzer, ReleaseType};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub config: Arc<ServerConfig>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub filename: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub analysis: Analysis,
    pub duration_display: String,
    pub filesize_display: String,
    pub display_recommendations: Vec<String>,
    pub passed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ClassifyRequest {
    Durations {
        durations_seconds: Vec<f64>,
    },
    Totals {
        track_count: u32,
        #[serde(default)]
        total_duration_minutes: f64,
    },
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub release_type: ReleaseType,
    pub label: &'static str,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
