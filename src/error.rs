use thiserror::Error;

/// Typed error hierarchy for a single episode's processing steps.
///
/// All variants are recovered the same way at the batch boundary: the
/// episode is counted as failed and the run continues. The variants carry
/// the printed message and let tests match on the failure kind.
#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("no audio URL in feed entry")]
    MissingAudioUrl,

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed with status: {0}")]
    Status(reqwest::StatusCode),

    #[error("download incomplete: got {got} bytes, expected {expected}")]
    Incomplete { got: u64, expected: u64 },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}
