use crate::error::EpisodeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata record written next to each transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub title: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
    #[serde(rename = "transcribedAt")]
    pub transcribed_at: String,
}

/// Transcript directory: resume checks and artifact writes.
///
/// The directory is append-only. Existence of `{identity}.txt` is the sole
/// resumability signal; contents are never validated, and the metadata file
/// is not consulted. A crash mid-write can leave a partial text file that a
/// later run treats as done; a known gap, kept as-is.
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Open the store, creating the directory when missing.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn text_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", identity))
    }

    pub fn metadata_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}.json", identity))
    }

    /// The resume gate: true when the transcript text file already exists.
    pub fn is_transcribed(&self, identity: &str) -> bool {
        self.text_path(identity).exists()
    }

    /// Count of `.txt` transcripts currently on disk, for the startup line.
    pub fn transcript_count(&self) -> io::Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Write the transcript text, then the metadata JSON (2-space indent).
    pub fn write(
        &self,
        identity: &str,
        text: &str,
        metadata: &EpisodeMetadata,
    ) -> Result<(), EpisodeError> {
        fs::write(self.text_path(identity), text)?;

        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(self.metadata_path(identity), json)?;

        tracing::debug!("wrote transcript artifacts for {}", identity);
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
