use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub has_artwork: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitrateMode {
    Constant,
    Variable,
    #[default]
    Unknown,
}

// Zero means unknown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioProperties {
    pub bitrate_kbps: u32,
    pub bitrate_mode: BitrateMode,
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub duration_seconds: f64,
    pub filesize_bytes: u64,
}

impl AudioProperties {
    pub fn duration_display(&self) -> String {
        format_duration(self.duration_seconds)
    }

    pub fn filesize_display(&self) -> String {
        format_filesize(self.filesize_bytes)
    }
}

pub const ALL_CLEAR_MESSAGE: &str = "Your file meets all quality standards. No improvements needed.";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total_score: u32,
    pub metadata_score: u32,
    pub audio_score: u32,
    pub professional_score: u32,
    pub missing_tags: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendationStatus<'a> {
    AllClear,
    Pending(&'a [String]),
}

impl ScoreReport {
    pub fn recommendation_status(&self) -> RecommendationStatus<'_> {
        if self.recommendations.is_empty() {
            RecommendationStatus::AllClear
        } else {
            RecommendationStatus::Pending(&self.recommendations)
        }
    }

    pub fn display_recommendations(&self) -> Vec<String> {
        match self.recommendation_status() {
            RecommendationStatus::AllClear => vec![ALL_CLEAR_MESSAGE.to_string()],
            RecommendationStatus::Pending(items) => items.to_vec(),
        }
    }

    pub fn meets(&self, threshold: u32) -> bool {
        self.total_score >= threshold
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    Single,
    Ep,
    Album,
}

impl ReleaseType {
    pub fn label(self) -> &'static str {
        match self {
            ReleaseType::Single => "Single",
            ReleaseType::Ep => "EP",
            ReleaseType::Album => "Album",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn format_filesize(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
