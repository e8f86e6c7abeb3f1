use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use common::{content_hash, AudioProperties, Metadata, ScoreReport};
use metadata::{extract_audio, extract_metadata, sniff, DecodedInfo, InvalidFormat, MetadataError};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::instrumental::detect_instrumental;
use crate::score::score;

pub const DEFAULT_MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DECODE_WORKERS: usize = 8;
const HARD_MAX_INPUT_BYTES: u64 = 1024 * 1024 * 1024;
const HARD_MAX_DECODE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const HARD_MAX_DECODE_WORKERS: usize = 256;

/// One uploaded file. Owned by the analyzer for the duration of a single call.
#[derive(Debug, Clone)]
pub struct RawAudioBuffer {
    pub bytes: Bytes,
    pub filename: String,
    pub declared_size: u64,
}

impl RawAudioBuffer {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            filename: filename.into(),
            declared_size,
        }
    }

    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub max_input_bytes: u64,
    pub decode_timeout: Duration,
    pub max_decode_workers: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
            max_decode_workers: DEFAULT_DECODE_WORKERS,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_bytes == 0 {
            return Err(ConfigError::ZeroInputLimit);
        }
        if self.max_input_bytes > HARD_MAX_INPUT_BYTES {
            return Err(ConfigError::InputLimitTooLarge(self.max_input_bytes));
        }
        if self.decode_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.decode_timeout > HARD_MAX_DECODE_TIMEOUT {
            return Err(ConfigError::TimeoutTooLong(self.decode_timeout));
        }
        if self.max_decode_workers == 0 || self.max_decode_workers > HARD_MAX_DECODE_WORKERS {
            return Err(ConfigError::DecodeWorkers(self.max_decode_workers));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInputLimit,
    InputLimitTooLarge(u64),
    ZeroTimeout,
    TimeoutTooLong(Duration),
    DecodeWorkers(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInputLimit => write!(f, "max_input_bytes must be positive"),
            ConfigError::InputLimitTooLarge(value) => write!(
                f,
                "max_input_bytes {} exceeds the hard limit of {}",
                value, HARD_MAX_INPUT_BYTES
            ),
            ConfigError::ZeroTimeout => write!(f, "decode_timeout must be positive"),
            ConfigError::TimeoutTooLong(value) => write!(
                f,
                "decode_timeout {:?} exceeds the hard limit of {:?}",
                value, HARD_MAX_DECODE_TIMEOUT
            ),
            ConfigError::DecodeWorkers(value) => write!(
                f,
                "max_decode_workers {} must be between 1 and {}",
                value, HARD_MAX_DECODE_WORKERS
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFormat,
    TooLarge,
    DecodeFailed,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::DecodeFailed => "decode_failed",
            ErrorKind::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    InvalidFormat(InvalidFormat),
    TooLarge { size: u64, limit: u64 },
    DecodeFailed(String),
    Timeout(Duration),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            AnalysisError::TooLarge { .. } => ErrorKind::TooLarge,
            AnalysisError::DecodeFailed(_) => ErrorKind::DecodeFailed,
            AnalysisError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidFormat(err) => write!(f, "{}", err),
            AnalysisError::TooLarge { size, limit } => write!(
                f,
                "file is {} bytes, the limit is {} bytes",
                size, limit
            ),
            AnalysisError::DecodeFailed(message) => write!(f, "could not decode mp3: {}", message),
            AnalysisError::Timeout(limit) => {
                write!(f, "decoding did not finish within {:?}", limit)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<InvalidFormat> for AnalysisError {
    fn from(err: InvalidFormat) -> Self {
        AnalysisError::InvalidFormat(err)
    }
}

impl From<MetadataError> for AnalysisError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::InvalidFormat(err) => AnalysisError::InvalidFormat(err),
            other => AnalysisError::DecodeFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub filename: String,
    pub content_hash: String,
    pub report: ScoreReport,
    pub metadata: Metadata,
    pub audio: AudioProperties,
    pub instrumental_hint: bool,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    slots: Arc<DecodeSlots>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            slots: Arc::new(DecodeSlots::new(config.max_decode_workers)),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, buffer: RawAudioBuffer) -> Result<Analysis, AnalysisError> {
        let result = self.run(&buffer);
        match &result {
            Ok(analysis) => info!(
                "Analyzed {}: score {} (metadata {}, audio {}, professional {})",
                buffer.filename,
                analysis.report.total_score,
                analysis.report.metadata_score,
                analysis.report.audio_score,
                analysis.report.professional_score
            ),
            Err(err) => warn!(
                "Analysis of {} failed ({}): {}",
                buffer.filename,
                err.kind().as_str(),
                err
            ),
        }
        result
    }

    fn run(&self, buffer: &RawAudioBuffer) -> Result<Analysis, AnalysisError> {
        let actual_size = buffer.bytes.len() as u64;
        if buffer.declared_size != actual_size {
            debug!(
                "Declared size {} of {} differs from received {} bytes",
                buffer.declared_size, buffer.filename, actual_size
            );
        }
        let size = buffer.declared_size.max(actual_size);
        if size > self.config.max_input_bytes {
            return Err(AnalysisError::TooLarge {
                size,
                limit: self.config.max_input_bytes,
            });
        }

        sniff(&buffer.bytes)?;
        let decoded = decode_isolated(
            buffer.bytes.clone(),
            &self.slots,
            self.config.decode_timeout,
        )?;

        let metadata = extract_metadata(&decoded);
        let audio = extract_audio(&decoded);
        let report = score(&metadata, &audio);
        let instrumental_hint = detect_instrumental(&metadata);

        Ok(Analysis {
            filename: buffer.filename.clone(),
            content_hash: content_hash(&buffer.bytes),
            report,
            metadata,
            audio,
            instrumental_hint,
        })
    }
}

/// Caps the number of live decode threads, including ones abandoned after a timeout.
#[derive(Debug)]
struct DecodeSlots {
    active: Mutex<usize>,
    freed: Condvar,
    limit: usize,
}

impl DecodeSlots {
    fn new(limit: usize) -> Self {
        Self {
            active: Mutex::new(0),
            freed: Condvar::new(),
            limit,
        }
    }

    fn acquire(self: &Arc<Self>, deadline: Instant) -> Option<DecodeSlot> {
        let mut active = self.active.lock();
        while *active >= self.limit {
            if self.freed.wait_until(&mut active, deadline).timed_out() && *active >= self.limit {
                return None;
            }
        }
        *active += 1;
        Some(DecodeSlot {
            slots: Arc::clone(self),
        })
    }
}

struct DecodeSlot {
    slots: Arc<DecodeSlots>,
}

impl Drop for DecodeSlot {
    fn drop(&mut self) {
        let mut active = self.slots.active.lock();
        *active = active.saturating_sub(1);
        self.slots.freed.notify_one();
    }
}

/// Decodes on a dedicated thread holding one slot until it exits. Waiting for a slot counts
/// against the same timeout.
fn decode_isolated(
    bytes: Bytes,
    slots: &Arc<DecodeSlots>,
    timeout: Duration,
) -> Result<DecodedInfo, AnalysisError> {
    let deadline = Instant::now() + timeout;
    let slot = slots.acquire(deadline).ok_or_else(|| {
        debug!("No decode slot free within {:?}", timeout);
        AnalysisError::Timeout(timeout)
    })?;

    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("mp3-decode".to_string())
        .spawn(move || {
            let _slot = slot;
            let _ = tx.send(metadata::decode(&bytes));
        })
        .map_err(|err| AnalysisError::DecodeFailed(format!("decode worker: {}", err)))?;

    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.map_err(AnalysisError::from),
        Err(RecvTimeoutError::Timeout) => Err(AnalysisError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(AnalysisError::DecodeFailed(
            "decode worker stopped unexpectedly".to_string(),
        )),
    }
}
