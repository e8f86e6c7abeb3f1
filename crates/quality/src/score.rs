use std::fmt;

use common::{AudioProperties, BitrateMode, Metadata, ScoreReport};

pub const MAX_METADATA_SCORE: u32 = 40;
pub const MAX_AUDIO_SCORE: u32 = 30;
pub const MAX_PROFESSIONAL_SCORE: u32 = 30;
pub const MAX_TOTAL_SCORE: u32 = 100;

const STANDARD_SAMPLE_RATE_HZ: u32 = 44100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    UpgradeTo320 { current_kbps: u32 },
    Prefer320 { current_kbps: u32 },
    RaiseBitrate { current_kbps: u32 },
    CriticalBitrate { current_kbps: u32 },
    UseStandardSampleRate { current_hz: u32 },
    PreferStereo,
    PreferConstantBitrate,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::UpgradeTo320 { current_kbps } => write!(
                f,
                "Consider upgrading to 320kbps for maximum quality (currently {}kbps)",
                current_kbps
            ),
            Recommendation::Prefer320 { current_kbps } => write!(
                f,
                "320kbps is recommended over the current {}kbps",
                current_kbps
            ),
            Recommendation::RaiseBitrate { current_kbps } => write!(
                f,
                "Raise the bitrate to at least 192kbps (currently {}kbps)",
                current_kbps
            ),
            Recommendation::CriticalBitrate { current_kbps } => write!(
                f,
                "Critical: {}kbps is too low for release, encode at 192kbps or higher",
                current_kbps
            ),
            Recommendation::UseStandardSampleRate { current_hz } => write!(
                f,
                "Use a sample rate of 44.1kHz or higher (currently {}Hz)",
                current_hz
            ),
            Recommendation::PreferStereo => {
                f.write_str("Stereo is preferred over mono for music releases")
            }
            Recommendation::PreferConstantBitrate => f.write_str(
                "Constant bitrate (CBR) is preferred over variable bitrate (VBR) for streaming consistency",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataCriterion {
    Artist,
    Title,
    Album,
    Year,
    Artwork,
}

impl MetadataCriterion {
    const ALL: [MetadataCriterion; 5] = [
        MetadataCriterion::Artist,
        MetadataCriterion::Title,
        MetadataCriterion::Album,
        MetadataCriterion::Year,
        MetadataCriterion::Artwork,
    ];

    fn points(self) -> u32 {
        match self {
            MetadataCriterion::Artist | MetadataCriterion::Title | MetadataCriterion::Album => 10,
            MetadataCriterion::Year | MetadataCriterion::Artwork => 5,
        }
    }

    fn missing_label(self) -> &'static str {
        match self {
            MetadataCriterion::Artist => "Artist Name",
            MetadataCriterion::Title => "Track Title",
            MetadataCriterion::Album => "Album Name",
            MetadataCriterion::Year => "Release Year",
            MetadataCriterion::Artwork => "Album Artwork",
        }
    }

    fn is_present(self, metadata: &Metadata) -> bool {
        match self {
            MetadataCriterion::Artist => metadata.artist.is_some(),
            MetadataCriterion::Title => metadata.title.is_some(),
            MetadataCriterion::Album => metadata.album.is_some(),
            MetadataCriterion::Year => metadata.year.is_some(),
            MetadataCriterion::Artwork => metadata.has_artwork,
        }
    }
}

/// Metadata completeness: points per present field, labels of the missing ones.
pub fn metadata_score(metadata: &Metadata) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut missing = Vec::new();
    for criterion in MetadataCriterion::ALL {
        if criterion.is_present(metadata) {
            score += criterion.points();
        } else {
            missing.push(criterion.missing_label().to_string());
        }
    }
    (score.min(MAX_METADATA_SCORE), missing)
}

/// Bitrate tiers. Depends on nothing but the bitrate.
pub fn audio_score(bitrate_kbps: u32) -> (u32, Option<Recommendation>) {
    let current_kbps = bitrate_kbps;
    match bitrate_kbps {
        320.. => (30, None),
        256..=319 => (25, Some(Recommendation::UpgradeTo320 { current_kbps })),
        192..=255 => (20, Some(Recommendation::Prefer320 { current_kbps })),
        128..=191 => (10, Some(Recommendation::RaiseBitrate { current_kbps })),
        _ => (0, Some(Recommendation::CriticalBitrate { current_kbps })),
    }
}

/// Sample rate, channel layout and bitrate mode, recommendations in that order.
pub fn professional_score(audio: &AudioProperties) -> (u32, Vec<Recommendation>) {
    let mut score = 0;
    let mut recommendations = Vec::new();

    if audio.sample_rate_hz >= STANDARD_SAMPLE_RATE_HZ {
        score += 15;
    } else {
        score += 5;
        recommendations.push(Recommendation::UseStandardSampleRate {
            current_hz: audio.sample_rate_hz,
        });
    }

    match audio.channels {
        2 => score += 15,
        1 => {
            score += 10;
            recommendations.push(Recommendation::PreferStereo);
        }
        _ => {}
    }

    if audio.bitrate_mode == BitrateMode::Variable {
        recommendations.push(Recommendation::PreferConstantBitrate);
    }

    (score.min(MAX_PROFESSIONAL_SCORE), recommendations)
}

pub fn score(metadata: &Metadata, audio: &AudioProperties) -> ScoreReport {
    let (metadata_score, missing_tags) = metadata_score(metadata);
    let (audio_score, bitrate_recommendation) = audio_score(audio.bitrate_kbps);
    let (professional_score, professional_recommendations) = professional_score(audio);

    let recommendations = bitrate_recommendation
        .into_iter()
        .chain(professional_recommendations)
        .map(|recommendation| recommendation.to_string())
        .collect();

    ScoreReport {
        total_score: (metadata_score + audio_score + professional_score).min(MAX_TOTAL_SCORE),
        metadata_score,
        audio_score,
        professional_score,
        missing_tags,
        recommendations,
    }
}
