pub mod analyzer;
pub mod classify;
pub mod instrumental;
pub mod score;

pub use analyzer::{
    Analysis, AnalysisError, Analyzer, AnalyzerConfig, ConfigError, ErrorKind, RawAudioBuffer,
    DEFAULT_DECODE_TIMEOUT, DEFAULT_DECODE_WORKERS, DEFAULT_MAX_INPUT_BYTES,
};
pub use classify::{classify_batch, classify_release, ClassifyError};
pub use common::{
    AudioProperties, BitrateMode, Metadata, RecommendationStatus, ReleaseType, ScoreReport,
};
pub use instrumental::detect_instrumental;
pub use score::{score, Recommendation};
