use std::fmt;

use common::ReleaseType;

const ALBUM_MIN_TRACKS: u32 = 7;
const ALBUM_MIN_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    EmptyBatch,
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::EmptyBatch => write!(f, "a release needs at least one track"),
        }
    }
}

impl std::error::Error for ClassifyError {}

/// Release type of a submission batch. Rules are evaluated in order, first match wins.
///
/// Callers must not pass `track_count == 0`; use [`classify_batch`] to have that checked.
pub fn classify_release(track_count: u32, total_duration_minutes: f64) -> ReleaseType {
    let minutes = if total_duration_minutes.is_finite() && total_duration_minutes > 0.0 {
        total_duration_minutes
    } else {
        0.0
    };

    if track_count >= ALBUM_MIN_TRACKS || minutes >= ALBUM_MIN_MINUTES {
        return ReleaseType::Album;
    }
    if (4..=6).contains(&track_count) && minutes < ALBUM_MIN_MINUTES {
        return ReleaseType::Ep;
    }
    if track_count > 1 {
        ReleaseType::Ep
    } else {
        ReleaseType::Single
    }
}

/// Classifies a batch from per-track durations in seconds; unknown durations count as zero.
pub fn classify_batch(durations_seconds: &[f64]) -> Result<ReleaseType, ClassifyError> {
    if durations_seconds.is_empty() {
        return Err(ClassifyError::EmptyBatch);
    }
    let total_seconds: f64 = durations_seconds
        .iter()
        .filter(|seconds| seconds.is_finite() && **seconds > 0.0)
        .sum();
    let track_count = u32::try_from(durations_seconds.len()).unwrap_or(u32::MAX);
    Ok(classify_release(track_count, total_seconds / 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        assert_eq!(classify_release(1, 2.5), ReleaseType::Single);
        assert_eq!(classify_release(2, 5.0), ReleaseType::Ep);
        assert_eq!(classify_release(5, 20.0), ReleaseType::Ep);
        assert_eq!(classify_release(3, 31.0), ReleaseType::Album);
        assert_eq!(classify_release(10, 5.0), ReleaseType::Album);
    }

    #[test]
    fn boundaries() {
        assert_eq!(classify_release(3, 29.99), ReleaseType::Ep);
        assert_eq!(classify_release(1, 30.0), ReleaseType::Album);
        assert_eq!(classify_release(4, 0.0), ReleaseType::Ep);
        assert_eq!(classify_release(6, 29.9), ReleaseType::Ep);
        assert_eq!(classify_release(7, 0.5), ReleaseType::Album);
        assert_eq!(classify_release(1, 0.0), ReleaseType::Single);
    }

    #[test]
    fn bad_durations_count_as_zero() {
        assert_eq!(classify_release(1, f64::NAN), ReleaseType::Single);
        assert_eq!(classify_release(2, -40.0), ReleaseType::Ep);
        assert_eq!(classify_release(1, f64::INFINITY), ReleaseType::Single);
    }

    #[test]
    fn batch_sums_durations() {
        assert_eq!(classify_batch(&[180.0]), Ok(ReleaseType::Single));
        assert_eq!(classify_batch(&[200.0, 210.0, 190.0]), Ok(ReleaseType::Ep));
        assert_eq!(classify_batch(&[900.0, 950.0]), Ok(ReleaseType::Album));
        assert_eq!(classify_batch(&[0.0, f64::NAN, 120.0]), Ok(ReleaseType::Ep));
        assert_eq!(classify_batch(&[60.0; 8]), Ok(ReleaseType::Album));
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(classify_batch(&[]), Err(ClassifyError::EmptyBatch));
    }
}
