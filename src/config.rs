use anyhow::Context as _;
use std::env;
use std::path::PathBuf;

/// Directory that receives the `.txt` / `.json` transcript pairs.
pub const TRANSCRIPTS_DIR: &str = "transcripts";

/// Scratch directory for the shared download target.
pub const TEMP_DIR: &str = "temp";

/// Name of the single reusable download target inside [`TEMP_DIR`].
pub const TEMP_AUDIO_FILENAME: &str = "episode.mp3";

const DEFAULT_MODEL_PATH: &str = "models/ggml-base.bin";
const DEFAULT_LANGUAGE: &str = "en";

/// Language value that enables whisper auto-detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// RSS/Atom feed to enumerate.
    pub feed_url: String,
    /// Path to the ggml whisper model file.
    pub model_path: PathBuf,
    /// Transcription language, or [`AUTO_LANGUAGE`] for detection.
    pub language: String,
    pub transcripts_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// `RSS_FEED_URL` is required; `WHISPER_MODEL` and `WHISPER_LANGUAGE`
    /// fall back to defaults. A `.env` file is honored when the caller has
    /// loaded it beforehand.
    pub fn from_env() -> anyhow::Result<Self> {
        let feed_url =
            env::var("RSS_FEED_URL").context("RSS_FEED_URL environment variable is not set")?;

        let model_path = env::var("WHISPER_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let language = env::var("WHISPER_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());

        Ok(Self {
            feed_url,
            model_path,
            language,
            transcripts_dir: PathBuf::from(TRANSCRIPTS_DIR),
            temp_dir: PathBuf::from(TEMP_DIR),
        })
    }

    /// Full path of the shared temp audio file.
    pub fn temp_audio_path(&self) -> PathBuf {
        self.temp_dir.join(TEMP_AUDIO_FILENAME)
    }
}
