use axum::http::StatusCode;
use axum::Json;
use quality::{AnalysisError, ErrorKind};

use crate::state::ErrorResponse;

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            kind: None,
        }),
    )
}

pub fn analysis_error(err: &AnalysisError) -> (StatusCode, Json<ErrorResponse>) {
    let kind = err.kind();
    (
        status_for_kind(kind),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: Some(kind.as_str()),
        }),
    )
}

pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::DecodeFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
    }
}

/// Keeps only the final path component of a client-supplied filename.
pub fn sanitize_filename(value: &str) -> Option<String> {
    let name = value
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(value)
        .trim();
    let name: String = name.chars().filter(|c| !c.is_control()).collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn every_kind_has_its_own_status() {
        let kinds = [
            ErrorKind::InvalidFormat,
            ErrorKind::TooLarge,
            ErrorKind::DecodeFailed,
            ErrorKind::Timeout,
        ];
        let mut statuses: Vec<u16> = kinds.iter().map(|k| status_for_kind(*k).as_u16()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), kinds.len());
    }

    #[test]
    fn analysis_error_carries_kind() {
        let (status, Json(body)) = analysis_error(&AnalysisError::Timeout(Duration::from_secs(10)));
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body.kind, Some("timeout"));
    }

    #[test]
    fn strips_directories_from_filenames() {
        assert_eq!(sanitize_filename("track.mp3").as_deref(), Some("track.mp3"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\music\\a b.mp3").as_deref(), Some("a b.mp3"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename("  "), None);
    }
}
