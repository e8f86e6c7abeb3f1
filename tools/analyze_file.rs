use std::env;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use quality::{classify_batch, AnalysisError, Analyzer, AnalyzerConfig, RawAudioBuffer};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let inputs: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        return Err("usage: analyze_file <file.mp3|directory>...".into());
    }

    let analyzer = Analyzer::new(AnalyzerConfig::default())?;
    let mut durations = Vec::new();
    for path in collect_mp3s(&inputs) {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let limit = analyzer.config().max_input_bytes;
        let result = match load(&path, filename, limit) {
            Ok(buffer) => analyzer.analyze(buffer),
            Err(LoadError::Io(err)) => {
                warn!("Failed to read {:?}: {}", path, err);
                continue;
            }
            Err(LoadError::Rejected(err)) => Err(err),
        };

        match result {
            Ok(analysis) => {
                durations.push(analysis.audio.duration_seconds);
                println!("{}", serde_json::to_string(&analysis)?);
            }
            Err(err) => {
                let line = json!({
                    "path": path.display().to_string(),
                    "kind": err.kind(),
                    "error": err.to_string(),
                });
                println!("{}", line);
            }
        }
    }

    match classify_batch(&durations) {
        Ok(release_type) => println!(
            "{}",
            json!({
                "tracks": durations.len(),
                "total_duration_minutes": durations.iter().sum::<f64>() / 60.0,
                "release_type": release_type,
            })
        ),
        Err(err) => warn!("No release classification: {}", err),
    }

    Ok(())
}

#[derive(Debug)]
enum LoadError {
    Io(io::Error),
    Rejected(AnalysisError),
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

/// Reads at most `limit + 1` bytes; files whose size already exceeds `limit` are not read.
fn load(path: &Path, filename: String, limit: u64) -> Result<RawAudioBuffer, LoadError> {
    let size = fs::metadata(path)?.len();
    if size > limit {
        return Err(LoadError::Rejected(AnalysisError::TooLarge { size, limit }));
    }
    let mut bytes = Vec::new();
    File::open(path)?
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)?;
    Ok(RawAudioBuffer::new(bytes, filename).with_declared_size(size))
}

fn collect_mp3s(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_mp3(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false)
}
