pub mod mpeg;
pub mod sniff;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;

use common::{AudioProperties, BitrateMode, Metadata};
use lofty::config::{ParseOptions, ParsingMode};
use lofty::error::LoftyError;
use lofty::file::FileType;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};

pub use mpeg::StreamInfo;
pub use sniff::{sniff, InvalidFormat};

const MAX_SAMPLE_RATE_HZ: u32 = 192_000;
const MAX_BITRATE_KBPS: u32 = 1411;
const MAX_CHANNELS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TagField {
    Title,
    Artist,
    Album,
    Year,
    Genre,
    Comment,
}

impl TagField {
    pub const ALL: [TagField; 6] = [
        TagField::Title,
        TagField::Artist,
        TagField::Album,
        TagField::Year,
        TagField::Genre,
        TagField::Comment,
    ];

    fn read(self, tag: &Tag) -> Option<&str> {
        let text = |key: ItemKey| {
            tag.get_string(&key)
                .filter(|value| !value.trim_matches('\0').trim().is_empty())
        };
        match self {
            TagField::Title => text(ItemKey::TrackTitle),
            TagField::Artist => text(ItemKey::TrackArtist),
            TagField::Album => text(ItemKey::AlbumTitle),
            TagField::Year => text(ItemKey::Year).or_else(|| text(ItemKey::RecordingDate)),
            TagField::Genre => text(ItemKey::Genre),
            TagField::Comment => text(ItemKey::Comment),
        }
    }
}

/// Non-empty text values of one tag generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap(BTreeMap<TagField, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty and padding-only values are not stored.
    pub fn insert(&mut self, field: TagField, value: &str) {
        let trimmed = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if !trimmed.is_empty() {
            self.0.insert(field, trimmed.to_string());
        }
    }

    pub fn with(mut self, field: TagField, value: &str) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: TagField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_tag(tag: &Tag) -> Self {
        let mut map = Self::new();
        for field in TagField::ALL {
            if let Some(value) = field.read(tag) {
                map.insert(field, value);
            }
        }
        map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue<'a> {
    FromId3v2(&'a str),
    FromId3v1(&'a str),
    Absent,
}

impl<'a> TagValue<'a> {
    pub fn into_option(self) -> Option<String> {
        match self {
            TagValue::FromId3v2(value) | TagValue::FromId3v1(value) => Some(value.to_string()),
            TagValue::Absent => None,
        }
    }
}

/// Stream properties reported by lofty, already bounds-checked. Zero means unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackProperties {
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedInfo {
    pub id3v2: TagMap,
    pub id3v1: TagMap,
    pub has_artwork: bool,
    pub stream: Option<StreamInfo>,
    pub fallback: FallbackProperties,
    pub filesize_bytes: u64,
}

impl DecodedInfo {
    pub fn lookup(&self, field: TagField) -> TagValue<'_> {
        if let Some(value) = self.id3v2.get(field) {
            TagValue::FromId3v2(value)
        } else if let Some(value) = self.id3v1.get(field) {
            TagValue::FromId3v1(value)
        } else {
            TagValue::Absent
        }
    }
}

#[derive(Debug)]
pub enum MetadataError {
    InvalidFormat(InvalidFormat),
    TruncatedId3v2 { declared: usize, available: usize },
    MalformedId3v2,
    Lofty(LoftyError),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::InvalidFormat(err) => write!(f, "{}", err),
            MetadataError::TruncatedId3v2 {
                declared,
                available,
            } => write!(
                f,
                "ID3v2 tag declares {} bytes but only {} are present",
                declared, available
            ),
            MetadataError::MalformedId3v2 => write!(f, "malformed ID3v2 header"),
            MetadataError::Lofty(err) => write!(f, "tag decode error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<InvalidFormat> for MetadataError {
    fn from(err: InvalidFormat) -> Self {
        MetadataError::InvalidFormat(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

pub fn decode(buffer: &[u8]) -> Result<DecodedInfo, MetadataError> {
    sniff(buffer)?;
    let declared = mpeg::id3v2_len(buffer).ok_or(MetadataError::MalformedId3v2)?;
    if declared > buffer.len() {
        return Err(MetadataError::TruncatedId3v2 {
            declared,
            available: buffer.len(),
        });
    }

    let mut info = DecodedInfo {
        filesize_bytes: buffer.len() as u64,
        stream: mpeg::probe(buffer),
        ..DecodedInfo::default()
    };

    let options = ParseOptions::new()
        .read_properties(true)
        .parsing_mode(ParsingMode::BestAttempt);
    let tagged_file = match Probe::new(Cursor::new(buffer))
        .set_file_type(FileType::Mpeg)
        .options(options)
        .read()
    {
        Ok(file) => file,
        // Frames were found without lofty; keep the stream info and report no tags.
        Err(_) if info.stream.is_some() => return Ok(info),
        Err(err) => return Err(err.into()),
    };

    if let Some(tag) = tagged_file.tag(TagType::Id3v2) {
        info.id3v2 = TagMap::from_tag(tag);
        info.has_artwork = !tag.pictures().is_empty();
    }
    if let Some(tag) = tagged_file.tag(TagType::Id3v1) {
        info.id3v1 = TagMap::from_tag(tag);
    }

    let properties = tagged_file.properties();
    info.fallback = FallbackProperties {
        bitrate_kbps: properties
            .audio_bitrate()
            .or(properties.overall_bitrate())
            .filter(|value| *value <= MAX_BITRATE_KBPS)
            .unwrap_or(0),
        sample_rate_hz: properties
            .sample_rate()
            .filter(|value| *value <= MAX_SAMPLE_RATE_HZ)
            .unwrap_or(0),
        channels: properties
            .channels()
            .filter(|value| *value <= MAX_CHANNELS)
            .unwrap_or(0),
        duration_seconds: sane_seconds(properties.duration().as_secs_f64()),
    };

    Ok(info)
}

fn sane_seconds(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn extract_metadata(info: &DecodedInfo) -> Metadata {
    Metadata {
        title: info.lookup(TagField::Title).into_option(),
        artist: info.lookup(TagField::Artist).into_option(),
        album: info.lookup(TagField::Album).into_option(),
        year: info.lookup(TagField::Year).into_option(),
        genre: info.lookup(TagField::Genre).into_option(),
        comment: info.lookup(TagField::Comment).into_option(),
        has_artwork: info.has_artwork,
    }
}

/// Frame-walk values first, lofty values for anything the walk could not determine.
pub fn extract_audio(info: &DecodedInfo) -> AudioProperties {
    let fallback = &info.fallback;
    let mut audio = AudioProperties {
        bitrate_kbps: fallback.bitrate_kbps,
        bitrate_mode: BitrateMode::Unknown,
        sample_rate_hz: fallback.sample_rate_hz,
        channels: fallback.channels,
        duration_seconds: sane_seconds(fallback.duration_seconds),
        filesize_bytes: info.filesize_bytes,
    };

    if let Some(stream) = &info.stream {
        if stream.bitrate_kbps > 0 {
            audio.bitrate_kbps = stream.bitrate_kbps;
        }
        if stream.sample_rate_hz > 0 {
            audio.sample_rate_hz = stream.sample_rate_hz;
        }
        if stream.channels > 0 {
            audio.channels = stream.channels;
        }
        if stream.duration_seconds > 0.0 {
            audio.duration_seconds = sane_seconds(stream.duration_seconds);
        }
        audio.bitrate_mode = stream.bitrate_mode;
    }

    if audio.bitrate_mode == BitrateMode::Unknown && audio.bitrate_kbps > 0 {
        audio.bitrate_mode = BitrateMode::Constant;
    }

    audio
}
