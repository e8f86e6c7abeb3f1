use std::fmt;

const ID3V2_MAGIC: &[u8; 3] = b"ID3";

/// MPEG-1/2 Layer III second sync bytes (with and without CRC protection).
const LAYER3_SYNC: [u8; 4] = [0xFA, 0xFB, 0xF2, 0xF3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFormat {
    pub reason: &'static str,
}

impl fmt::Display for InvalidFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not an mp3 file: {}", self.reason)
    }
}

impl std::error::Error for InvalidFormat {}

pub fn sniff(buffer: &[u8]) -> Result<(), InvalidFormat> {
    if buffer.len() < 3 {
        return Err(InvalidFormat {
            reason: "file is too short",
        });
    }
    if buffer.starts_with(ID3V2_MAGIC) {
        return Ok(());
    }
    if buffer[0] == 0xFF && LAYER3_SYNC.contains(&buffer[1]) {
        return Ok(());
    }
    Err(InvalidFormat {
        reason: "missing ID3v2 header or MPEG Layer III frame sync",
    })
}
