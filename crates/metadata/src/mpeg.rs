use common::BitrateMode;

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_LEN: usize = 128;
const SYNC_SEARCH_WINDOW: usize = 64 * 1024;
const MAX_FRAMES: u32 = 1 << 20;

const BITRATES_V1: [u32; 16] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0];
const BITRATES_V2: [u32; 16] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0];
const SAMPLE_RATES_V1: [u32; 3] = [44100, 48000, 32000];
const SAMPLE_RATES_V2: [u32; 3] = [22050, 24000, 16000];
const SAMPLE_RATES_V25: [u32; 3] = [11025, 12000, 8000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub padding: bool,
    pub mono: bool,
}

impl FrameHeader {
    /// Parses a Layer III header; free-format and reserved values are rejected.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        if header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
            return None;
        }
        let version = match (header[1] >> 3) & 0x03 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return None,
        };
        if (header[1] >> 1) & 0x03 != 0x01 {
            return None;
        }
        let bitrate_idx = usize::from(header[2] >> 4);
        let bitrate_kbps = match version {
            MpegVersion::Mpeg1 => BITRATES_V1[bitrate_idx],
            _ => BITRATES_V2[bitrate_idx],
        };
        if bitrate_kbps == 0 {
            return None;
        }
        let rate_idx = usize::from((header[2] >> 2) & 0x03);
        let sample_rate_hz = *match version {
            MpegVersion::Mpeg1 => SAMPLE_RATES_V1.get(rate_idx),
            MpegVersion::Mpeg2 => SAMPLE_RATES_V2.get(rate_idx),
            MpegVersion::Mpeg25 => SAMPLE_RATES_V25.get(rate_idx),
        }?;

        Some(Self {
            version,
            bitrate_kbps,
            sample_rate_hz,
            padding: header[2] & 0x02 != 0,
            mono: header[3] >> 6 == 0x03,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match self.version {
            MpegVersion::Mpeg1 => 1152,
            _ => 576,
        }
    }

    pub fn frame_len(&self) -> usize {
        let coefficient = match self.version {
            MpegVersion::Mpeg1 => 144,
            _ => 72,
        };
        let base = coefficient * self.bitrate_kbps * 1000 / self.sample_rate_hz;
        (base + u32::from(self.padding)) as usize
    }

    fn side_info_len(&self) -> usize {
        match (self.version, self.mono) {
            (MpegVersion::Mpeg1, true) => 17,
            (MpegVersion::Mpeg1, false) => 32,
            (_, true) => 9,
            (_, false) => 17,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoHeader {
    Xing { frames: Option<u32> },
    Info { frames: Option<u32> },
    Vbri { frames: Option<u32> },
}

impl InfoHeader {
    fn frames(&self) -> Option<u32> {
        match *self {
            InfoHeader::Xing { frames } | InfoHeader::Info { frames } | InfoHeader::Vbri { frames } => {
                frames.filter(|count| *count > 0)
            }
        }
    }

    fn is_vbr(&self) -> bool {
        !matches!(self, InfoHeader::Info { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub bitrate_kbps: u32,
    pub bitrate_mode: BitrateMode,
    pub sample_rate_hz: u32,
    pub channels: u8,
    pub duration_seconds: f64,
    pub frames: u32,
}

/// `Some(0)` when there is no ID3v2 container, `None` when its header is malformed.
pub fn id3v2_len(buffer: &[u8]) -> Option<usize> {
    if !buffer.starts_with(b"ID3") {
        return Some(0);
    }
    let header = buffer.get(..ID3V2_HEADER_LEN)?;
    let mut size = 0usize;
    for byte in &header[6..10] {
        if byte & 0x80 != 0 {
            return None;
        }
        size = (size << 7) | usize::from(*byte);
    }
    let footer = if header[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    Some(ID3V2_HEADER_LEN + size + footer)
}

fn audio_bounds(buffer: &[u8]) -> (usize, usize) {
    let start = id3v2_len(buffer).unwrap_or(0).min(buffer.len());
    let mut end = buffer.len();
    if end >= start + ID3V1_LEN && buffer[end - ID3V1_LEN..].starts_with(b"TAG") {
        end -= ID3V1_LEN;
    }
    (start, end)
}

fn find_first_frame(audio: &[u8]) -> Option<(usize, FrameHeader)> {
    let window = audio.len().min(SYNC_SEARCH_WINDOW);
    for offset in 0..window {
        if audio[offset] != 0xFF {
            continue;
        }
        let header = match FrameHeader::parse(&audio[offset..]) {
            Some(header) => header,
            None => continue,
        };
        let next = offset + header.frame_len();
        if next + 4 <= audio.len() && FrameHeader::parse(&audio[next..]).is_none() {
            continue;
        }
        return Some((offset, header));
    }
    None
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(raw))
}

fn read_info_header(frame: &[u8], header: &FrameHeader) -> Option<InfoHeader> {
    let xing_at = 4 + header.side_info_len();
    match frame.get(xing_at..xing_at + 4) {
        Some(tag) if tag == b"Xing" || tag == b"Info" => {
            let flags = read_u32(frame, xing_at + 4).unwrap_or(0);
            let frames = if flags & 0x01 != 0 {
                read_u32(frame, xing_at + 8)
            } else {
                None
            };
            return Some(if tag == b"Xing" {
                InfoHeader::Xing { frames }
            } else {
                InfoHeader::Info { frames }
            });
        }
        _ => {}
    }
    let vbri_at = 4 + 32;
    if frame.get(vbri_at..vbri_at + 4) == Some(b"VBRI".as_slice()) {
        return Some(InfoHeader::Vbri {
            frames: read_u32(frame, vbri_at + 14),
        });
    }
    None
}

/// Walks the frame headers of an MP3 buffer. `None` when no frame sync was found.
pub fn probe(buffer: &[u8]) -> Option<StreamInfo> {
    let (start, end) = audio_bounds(buffer);
    let audio = &buffer[start..end];
    let (first_offset, first) = find_first_frame(audio)?;

    let first_frame = &audio[first_offset..(first_offset + first.frame_len()).min(audio.len())];
    let info = read_info_header(first_frame, &first);

    let mut pos = first_offset;
    if info.is_some() {
        pos += first.frame_len();
    }

    let mut frames = 0u32;
    let mut bitrate_sum = 0u64;
    let mut varied = false;
    while frames < MAX_FRAMES {
        let header = match audio.get(pos..).and_then(FrameHeader::parse) {
            Some(header) => header,
            None => break,
        };
        if header.sample_rate_hz != first.sample_rate_hz {
            break;
        }
        if header.bitrate_kbps != first.bitrate_kbps {
            varied = true;
        }
        frames += 1;
        bitrate_sum += u64::from(header.bitrate_kbps);
        pos += header.frame_len();
    }

    let bitrate_mode = match info {
        Some(info) if info.is_vbr() => BitrateMode::Variable,
        Some(_) => BitrateMode::Constant,
        None if varied => BitrateMode::Variable,
        None if frames > 0 => BitrateMode::Constant,
        None => BitrateMode::Unknown,
    };
    let bitrate_kbps = if frames > 0 {
        ((bitrate_sum as f64) / f64::from(frames)).round() as u32
    } else {
        0
    };
    let frame_count = info.and_then(|info| info.frames()).unwrap_or(frames);
    let duration_seconds = f64::from(frame_count) * f64::from(first.samples_per_frame())
        / f64::from(first.sample_rate_hz);

    Some(StreamInfo {
        bitrate_kbps,
        bitrate_mode,
        sample_rate_hz: first.sample_rate_hz,
        channels: if first.mono { 1 } else { 2 },
        duration_seconds,
        frames,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds one zero-filled MPEG-1 Layer III frame (padding set, 44.1 kHz unless `rate_idx`).
    pub(crate) fn frame(bitrate_idx: u8, rate_idx: u8, mono: bool) -> Vec<u8> {
        let b2 = (bitrate_idx << 4) | (rate_idx << 2) | 0x02;
        let b3 = if mono { 0xC4 } else { 0x64 };
        let header = [0xFF, 0xFB, b2, b3];
        let len = FrameHeader::parse(&header).map(|h| h.frame_len()).unwrap_or(4);
        let mut out = vec![0u8; len];
        out[..4].copy_from_slice(&header);
        out
    }

    pub(crate) fn stream(bitrate_idx: u8, count: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..count {
            out.extend(frame(bitrate_idx, 0, false));
        }
        out
    }

    #[test]
    fn parses_frame_header() {
        let header = FrameHeader::parse(&[0xFF, 0xFB, 0x92, 0x64]).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate_hz, 44100);
        assert!(header.padding);
        assert!(!header.mono);
        assert_eq!(header.frame_len(), 418);
        assert_eq!(header.samples_per_frame(), 1152);
    }

    #[test]
    fn rejects_free_format_and_reserved_values() {
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0x64]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0xF0, 0x64]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x9C, 0x64]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFD, 0x90, 0x64]).is_none());
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x90]).is_none());
    }

    #[test]
    fn mpeg2_header_uses_lower_tables() {
        let header = FrameHeader::parse(&[0xFF, 0xF3, 0x80, 0xC4]).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg2);
        assert_eq!(header.bitrate_kbps, 64);
        assert_eq!(header.sample_rate_hz, 22050);
        assert!(header.mono);
        assert_eq!(header.samples_per_frame(), 576);
    }

    #[test]
    fn probes_constant_stream() {
        let info = probe(&stream(0x09, 40)).unwrap();
        assert_eq!(info.bitrate_kbps, 128);
        assert_eq!(info.bitrate_mode, BitrateMode::Constant);
        assert_eq!(info.sample_rate_hz, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.frames, 40);
        let expected = 40.0 * 1152.0 / 44100.0;
        assert!((info.duration_seconds - expected).abs() < 1e-9);
    }

    #[test]
    fn mixed_bitrates_without_info_header_are_variable() {
        let mut bytes = stream(0x09, 10);
        bytes.extend(stream(0x0E, 10));
        let info = probe(&bytes).unwrap();
        assert_eq!(info.bitrate_mode, BitrateMode::Variable);
        assert_eq!(info.bitrate_kbps, 224);
    }

    #[test]
    fn xing_header_marks_variable_and_sets_frame_count() {
        let mut first = frame(0x09, 0, false);
        let at = 4 + 32;
        first[at..at + 4].copy_from_slice(b"Xing");
        first[at + 4..at + 8].copy_from_slice(&1u32.to_be_bytes());
        first[at + 8..at + 12].copy_from_slice(&1000u32.to_be_bytes());
        let mut bytes = first;
        bytes.extend(stream(0x09, 5));

        let info = probe(&bytes).unwrap();
        assert_eq!(info.bitrate_mode, BitrateMode::Variable);
        assert_eq!(info.frames, 5);
        let expected = 1000.0 * 1152.0 / 44100.0;
        assert!((info.duration_seconds - expected).abs() < 1e-9);
    }

    #[test]
    fn info_header_marks_constant() {
        let mut first = frame(0x09, 0, false);
        let at = 4 + 32;
        first[at..at + 4].copy_from_slice(b"Info");
        let mut bytes = first;
        bytes.extend(stream(0x09, 3));
        let info = probe(&bytes).unwrap();
        assert_eq!(info.bitrate_mode, BitrateMode::Constant);
        assert_eq!(info.frames, 3);
    }

    #[test]
    fn skips_id3v2_container_and_trailing_id3v1() {
        let mut bytes = b"ID3\x03\x00\x00\x00\x00\x00\x14".to_vec();
        bytes.extend(vec![0xFFu8; 20]);
        bytes.extend(stream(0x0E, 8));
        let mut v1 = vec![0u8; 128];
        v1[..3].copy_from_slice(b"TAG");
        bytes.extend(v1);

        let info = probe(&bytes).unwrap();
        assert_eq!(info.bitrate_kbps, 320);
        assert_eq!(info.frames, 8);
    }

    #[test]
    fn no_frames_yields_none() {
        assert!(probe(b"ID3\x03\x00\x00\x00\x00\x00\x00").is_none());
        assert!(probe(&[0u8; 2048]).is_none());
        assert!(probe(&[]).is_none());
    }

    #[test]
    fn id3v2_len_reads_syncsafe_size() {
        assert_eq!(id3v2_len(b"\xFF\xFB\x90\x64"), Some(0));
        assert_eq!(id3v2_len(b"ID3\x04\x00\x00\x00\x00\x02\x01"), Some(10 + 257));
        assert_eq!(id3v2_len(b"ID3\x04\x00\x10\x00\x00\x00\x05"), Some(10 + 5 + 10));
        assert_eq!(id3v2_len(b"ID3\x04\x00\x00\x00\x00\x80\x00"), None);
        assert_eq!(id3v2_len(b"ID3\x04"), None);
    }
}
