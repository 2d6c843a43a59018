use crate::audio;
use crate::config::AUTO_LANGUAGE;
use crate::error::EpisodeError;
use anyhow::Context as _;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use whisper_rs::{
    install_logging_hooks, FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Seam for speech-to-text on a local audio file.
///
/// One blocking call in, plain text out. Implementations load whatever
/// model they need up front so the per-episode call carries no load cost.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio_path: &Path) -> Result<String, EpisodeError>;

    /// Name of the loaded model, for progress output.
    fn model_name(&self) -> &str;
}

/// Whisper.cpp-backed transcriber.
///
/// The ggml model is loaded exactly once, at construction, and shared
/// read-only across every episode of the run.
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    language: String,
    model_name: String,
}

impl WhisperTranscriber {
    /// Load the model at `model_path`.
    ///
    /// This is the expensive call of the batch startup; a missing or
    /// unreadable model file terminates the run before the loop begins.
    pub fn new(model_path: &Path, language: &str) -> anyhow::Result<Self> {
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        anyhow::ensure!(
            model_path.exists(),
            "whisper model not found at {:?} (set WHISPER_MODEL)",
            model_path
        );

        let model_name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let path_str = model_path
            .to_str()
            .context("whisper model path is not valid UTF-8")?;

        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .with_context(|| format!("failed to load whisper model from {:?}", model_path))?;

        Ok(Self {
            context: Mutex::new(context),
            language: language.to_string(),
            model_name,
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, EpisodeError> {
        let samples = audio::decode_audio_file(audio_path)?;

        let context = self
            .context
            .lock()
            .map_err(|e| EpisodeError::Transcription(format!("context lock poisoned: {}", e)))?;

        let mut state = context
            .create_state()
            .map_err(|e| EpisodeError::Transcription(format!("failed to create state: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.language == AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.language));
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let started = std::time::Instant::now();
        state
            .full(params, &samples)
            .map_err(|e| EpisodeError::Transcription(format!("whisper inference failed: {}", e)))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }

        tracing::info!(
            "transcribed {:.1}s of audio in {:.1}s",
            samples.len() as f64 / audio::WHISPER_SAMPLE_RATE as f64,
            started.elapsed().as_secs_f64()
        );

        Ok(text.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Transcriber stand-in for tests: returns a canned response or fails,
/// and records the paths it was asked to transcribe.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockTranscriber {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            calls: Default::default(),
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcriptions attempted so far (shared across clones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, EpisodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(EpisodeError::Transcription(
                "mock transcription failure".to_string(),
            ));
        }

        // The orchestrator must have downloaded something before asking
        // for a transcription.
        if !audio_path.exists() {
            return Err(EpisodeError::Transcription(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_returns_response() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("episode.mp3");
        std::fs::write(&path, b"audio").unwrap();

        let transcriber = MockTranscriber::new("base").with_response("hello there");
        assert_eq!(transcriber.transcribe(&path).unwrap(), "hello there");
        assert_eq!(transcriber.call_count(), 1);
    }

    #[test]
    fn test_mock_failure() {
        let transcriber = MockTranscriber::new("base").with_failure();
        let result = transcriber.transcribe(Path::new("unused.mp3"));
        assert!(matches!(result, Err(EpisodeError::Transcription(_))));
    }

    #[test]
    fn test_mock_rejects_missing_audio_file() {
        let transcriber = MockTranscriber::new("base");
        let result = transcriber.transcribe(Path::new("/nonexistent/episode.mp3"));
        assert!(matches!(result, Err(EpisodeError::Transcription(_))));
    }

    #[test]
    fn test_whisper_new_fails_for_missing_model() {
        let result = WhisperTranscriber::new(Path::new("/nonexistent/model.bin"), "en");
        assert!(result.is_err());
    }

    #[test]
    fn test_transcriber_is_object_safe() {
        let transcriber: Box<dyn Transcriber> = Box::new(MockTranscriber::new("base"));
        assert_eq!(transcriber.model_name(), "base");
    }
}
