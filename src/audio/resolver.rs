use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::loader::SourceUrl;
use super::{MediaHandle, ResourceResolver};
use crate::error::PlaybackError;
use crate::logging::OperationTimer;

/// A local audio file whose container has been probed
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMedia {
    path: PathBuf,
    duration: Option<f64>,
}

impl LocalMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MediaHandle for LocalMedia {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    async fn seek(&self, seconds: f64) -> Result<(), PlaybackError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PlaybackError::DecodeFailure(format!(
                "cannot seek {} to {}",
                self.path.display(),
                seconds
            )));
        }
        Ok(())
    }
}

/// Resolves `file://` URLs and plain paths by probing them with symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResolver;

#[async_trait]
impl ResourceResolver for FileResolver {
    async fn resolve(&self, url: &str) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let path = match SourceUrl::parse(url)? {
            SourceUrl::File(path) => path,
            SourceUrl::Remote { scheme, .. } => {
                return Err(PlaybackError::ResourceUnreachable(format!(
                    "'{}' URLs are not local files",
                    scheme
                )))
            }
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            PlaybackError::ResourceUnreachable(format!("{}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(PlaybackError::ResourceUnreachable(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let probe_path = path.clone();
        let duration = tokio::task::spawn_blocking(move || probe_duration(&probe_path))
            .await
            .map_err(|e| PlaybackError::DecodeFailure(format!("probe task failed: {}", e)))??;

        Ok(Box::new(LocalMedia { path, duration }))
    }
}

/// Open the container at `path` and read the length of its first audio track
fn probe_duration(path: &Path) -> Result<Option<f64>, PlaybackError> {
    let timer = OperationTimer::new(format!("probe {}", path.display()));

    let file = File::open(path).map_err(|e| {
        PlaybackError::ResourceUnreachable(format!("Failed to open file: {}", e))
    })?;
    let media_source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext_str) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext_str);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, media_source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PlaybackError::DecodeFailure(format!("probe failed: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlaybackError::DecodeFailure("no audio track found".to_string()))?;

    // Fails for codecs symphonia was built without
    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::DecodeFailure(format!("unsupported codec: {}", e)))?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(n_frames), Some(time_base), _) => {
            let time = time_base.calc_time(n_frames);
            Some(time.seconds as f64 + time.frac)
        }
        (Some(n_frames), None, Some(sample_rate)) if sample_rate > 0 => {
            Some(n_frames as f64 / sample_rate as f64)
        }
        _ => None,
    };

    let took = timer.finish();
    debug!(
        "Probed {} in {}ms: duration {:?}",
        path.display(),
        took.as_millis(),
        duration
    );
    Ok(duration)
}

/// Routes each URL to the resolver registered for its scheme
#[derive(Clone, Default)]
pub struct SchemeResolver {
    routes: HashMap<String, Arc<dyn ResourceResolver>>,
}

impl SchemeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver for `file://` URLs and plain paths only
    pub fn with_local_files() -> Self {
        Self::new().with_route("file", Arc::new(FileResolver))
    }

    pub fn with_route(mut self, scheme: &str, resolver: Arc<dyn ResourceResolver>) -> Self {
        self.routes.insert(scheme.to_ascii_lowercase(), resolver);
        self
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

#[async_trait]
impl ResourceResolver for SchemeResolver {
    async fn resolve(&self, url: &str) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let scheme = match SourceUrl::parse(url)? {
            SourceUrl::File(_) => "file".to_string(),
            SourceUrl::Remote { scheme, .. } => scheme,
        };

        match self.routes.get(&scheme) {
            Some(resolver) => resolver.resolve(url).await,
            None => Err(PlaybackError::ResourceUnreachable(format!(
                "no resolver for '{}://' URLs",
                scheme
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Minimal PCM WAV file with `frames` mono 16-bit samples at `sample_rate`
    fn write_wav(path: &Path, sample_rate: u32, frames: u32) {
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);

        let mut file = File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[tokio::test]
    async fn test_resolve_wav_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write_wav(&path, 8_000, 16_000);

        let media = FileResolver.resolve(path.to_str().unwrap()).await.unwrap();
        let duration = media.duration().unwrap();
        assert!((duration - 2.0).abs() < 1e-6, "duration was {}", duration);
        assert!(media.seek(1.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_file_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write_wav(&path, 8_000, 4_000);

        let url = format!("file://{}", path.display());
        let media = SchemeResolver::with_local_files().resolve(&url).await.unwrap();
        assert!((media.duration().unwrap() - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.flac");

        let result = FileResolver.resolve(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(PlaybackError::ResourceUnreachable(_))));
    }

    #[tokio::test]
    async fn test_directory_is_unreachable() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileResolver.resolve(temp_dir.path().to_str().unwrap()).await;
        assert!(matches!(result, Err(PlaybackError::ResourceUnreachable(_))));
    }

    #[tokio::test]
    async fn test_garbage_is_decode_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let result = FileResolver.resolve(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(PlaybackError::DecodeFailure(_))));
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_unreachable() {
        let result = SchemeResolver::with_local_files().resolve("bad://x").await;
        assert!(matches!(result, Err(PlaybackError::ResourceUnreachable(_))));
    }

    #[tokio::test]
    async fn test_malformed_url_is_invalid() {
        let result = SchemeResolver::with_local_files().resolve("").await;
        assert!(matches!(result, Err(PlaybackError::SourceInvalid { .. })));
    }

    #[test]
    fn test_schemes() {
        let resolver = SchemeResolver::with_local_files().with_route("MEM", Arc::new(FileResolver));
        assert_eq!(resolver.schemes(), vec!["file", "mem"]);
    }
}
