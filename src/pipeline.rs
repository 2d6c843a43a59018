use crate::error::EpisodeError;
use crate::feed::Episode;
use crate::fetch::AudioFetcher;
use crate::identity;
use crate::store::{EpisodeMetadata, TranscriptStore};
use crate::transcribe::Transcriber;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Terminal state of one episode within a run.
#[derive(Debug)]
pub enum EpisodeOutcome {
    /// Transcript already existed; nothing was fetched or transcribed.
    Skipped,
    /// Both artifacts were written this run.
    Transcribed,
    /// Some step failed; the episode will be retried naturally on the next
    /// run because its transcript file does not exist.
    Failed(EpisodeError),
}

/// Aggregate counters for a whole run. `skipped + transcribed + failed`
/// always equals `total`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub skipped: usize,
    pub transcribed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn print(&self) {
        println!("\n=== Summary ===");
        println!("Total episodes: {}", self.total);
        println!("Already transcribed: {}", self.skipped);
        println!("Newly transcribed: {}", self.transcribed);
        println!("Failed: {}", self.failed);
    }
}

/// Sequential batch driver.
///
/// Processes episodes strictly one at a time: resume check, download to
/// the shared temp path, transcription, persistence, cleanup. Failures are
/// contained at the episode boundary; the loop always moves on to the next
/// entry.
pub struct TranscriptionPipeline<F, T> {
    store: TranscriptStore,
    fetcher: F,
    transcriber: Arc<T>,
    temp_audio_path: PathBuf,
}

impl<F, T> TranscriptionPipeline<F, T>
where
    F: AudioFetcher,
    T: Transcriber + 'static,
{
    pub fn new(
        store: TranscriptStore,
        fetcher: F,
        transcriber: Arc<T>,
        temp_audio_path: PathBuf,
    ) -> Self {
        Self {
            store,
            fetcher,
            transcriber,
            temp_audio_path,
        }
    }

    /// Run the batch over all episodes, in feed order, and return the
    /// aggregate counters.
    pub async fn run(&self, episodes: &[Episode]) -> RunSummary {
        let mut summary = RunSummary {
            total: episodes.len(),
            ..Default::default()
        };

        for (index, episode) in episodes.iter().enumerate() {
            match self.process_episode(index, episodes.len(), episode).await {
                EpisodeOutcome::Skipped => summary.skipped += 1,
                EpisodeOutcome::Transcribed => summary.transcribed += 1,
                EpisodeOutcome::Failed(error) => {
                    println!("  ✗ Failed: {}", error);
                    tracing::warn!("episode {} failed: {}", index + 1, error);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Take one episode to a terminal state. Never propagates an error;
    /// whatever goes wrong is folded into the outcome after the scratch
    /// file has been removed.
    async fn process_episode(
        &self,
        index: usize,
        total: usize,
        episode: &Episode,
    ) -> EpisodeOutcome {
        let identity = identity::derive_identity(episode);

        if self.store.is_transcribed(&identity) {
            println!(
                "[{}/{}] ✓ Already have: {}",
                index + 1,
                total,
                episode.display_title()
            );
            return EpisodeOutcome::Skipped;
        }

        println!(
            "\n[{}/{}] Transcribing: {}",
            index + 1,
            total,
            episode.display_title()
        );

        match self.transcribe_one(episode, &identity).await {
            Ok(()) => EpisodeOutcome::Transcribed,
            Err(error) => {
                self.remove_temp_file().await;
                EpisodeOutcome::Failed(error)
            }
        }
    }

    /// The fetch, transcribe, persist chain for one episode.
    async fn transcribe_one(&self, episode: &Episode, identity: &str) -> Result<(), EpisodeError> {
        let audio_url = episode
            .audio_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(EpisodeError::MissingAudioUrl)?;

        println!("  Audio URL: {}", audio_url);
        println!("  Downloading audio...");
        self.fetcher.fetch(audio_url, &self.temp_audio_path).await?;

        println!("  Transcribing (this may take several minutes)...");
        let transcriber = Arc::clone(&self.transcriber);
        let audio_path = self.temp_audio_path.clone();
        let text = tokio::task::spawn_blocking(move || transcriber.transcribe(&audio_path))
            .await
            .map_err(|e| {
                EpisodeError::Transcription(format!("transcription task panicked: {}", e))
            })??;

        let metadata = EpisodeMetadata {
            title: episode.display_title().to_string(),
            pub_date: episode.published.clone().unwrap_or_default(),
            audio_url: audio_url.to_string(),
            transcribed_at: Utc::now().to_rfc3339(),
        };
        self.store.write(identity, &text, &metadata)?;

        self.remove_temp_file().await;

        println!("  ✓ Saved to {}.txt", identity);
        let preview: String = text.chars().take(100).collect();
        println!("  Preview: {}...", preview);

        Ok(())
    }

    /// Remove the shared scratch file if present. Failures here are logged
    /// and swallowed; a stale temp file must not fail an episode.
    async fn remove_temp_file(&self) {
        if self.temp_audio_path.exists() {
            if let Err(e) = tokio::fs::remove_file(&self.temp_audio_path).await {
                tracing::warn!("failed to remove temp audio file: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::transcribe::MockTranscriber;
    use tempfile::TempDir;

    fn episode(title: Option<&str>, published: Option<&str>, audio_url: Option<&str>) -> Episode {
        Episode {
            title: title.map(str::to_string),
            published: published.map(str::to_string),
            audio_url: audio_url.map(str::to_string),
        }
    }

    /// The two-entry feed from the end-to-end example: A is complete, B has
    /// nothing usable.
    fn example_feed() -> Vec<Episode> {
        vec![
            episode(
                Some("Hello World!"),
                Some("Mon, 02 Jan 2023 10:00:00 GMT"),
                Some("http://x/a.mp3"),
            ),
            episode(None, None, None),
        ]
    }

    struct Harness {
        _workdir: TempDir,
        transcripts_dir: PathBuf,
        temp_audio_path: PathBuf,
    }

    impl Harness {
        fn new() -> Self {
            let workdir = TempDir::new().unwrap();
            let transcripts_dir = workdir.path().join("transcripts");
            let temp_dir = workdir.path().join("temp");
            std::fs::create_dir_all(&temp_dir).unwrap();
            Self {
                temp_audio_path: temp_dir.join("episode.mp3"),
                transcripts_dir,
                _workdir: workdir,
            }
        }

        fn store(&self) -> TranscriptStore {
            TranscriptStore::new(&self.transcripts_dir).unwrap()
        }

        fn pipeline(
            &self,
            fetcher: MockFetcher,
            transcriber: MockTranscriber,
        ) -> TranscriptionPipeline<MockFetcher, MockTranscriber> {
            TranscriptionPipeline::new(
                self.store(),
                fetcher,
                Arc::new(transcriber),
                self.temp_audio_path.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_end_to_end_example_feed() {
        let harness = Harness::new();
        let pipeline = harness.pipeline(
            MockFetcher::new(),
            MockTranscriber::new("base").with_response("hello from the podcast"),
        );

        let summary = pipeline.run(&example_feed()).await;

        assert_eq!(
            summary,
            RunSummary {
                total: 2,
                skipped: 0,
                transcribed: 1,
                failed: 1,
            }
        );

        let store = harness.store();
        assert!(store.is_transcribed("2023-01-02-hello-world"));
        let text = std::fs::read_to_string(store.text_path("2023-01-02-hello-world")).unwrap();
        assert_eq!(text, "hello from the podcast");

        let metadata: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(store.metadata_path("2023-01-02-hello-world")).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata["title"], "Hello World!");
        assert_eq!(metadata["audioUrl"], "http://x/a.mp3");
        assert_eq!(metadata["pubDate"], "Mon, 02 Jan 2023 10:00:00 GMT");
        assert!(metadata["transcribedAt"].as_str().unwrap().contains('T'));

        // scratch file must be gone after a completed run
        assert!(!harness.temp_audio_path.exists());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let harness = Harness::new();
        let feed = example_feed();

        let first = harness
            .pipeline(MockFetcher::new(), MockTranscriber::new("base"))
            .run(&feed)
            .await;
        assert_eq!(first.transcribed, 1);

        let fetcher = MockFetcher::new();
        let transcriber = MockTranscriber::new("base");
        let second = harness
            .pipeline(fetcher.clone(), transcriber.clone())
            .run(&feed)
            .await;

        assert_eq!(
            second,
            RunSummary {
                total: 2,
                skipped: 1,
                transcribed: 0,
                failed: 1,
            }
        );
        // A was skipped without touching the network or the model; B failed
        // before its download step.
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(transcriber.call_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_transcript_is_never_refetched() {
        let harness = Harness::new();
        let feed = vec![episode(
            Some("Hello World!"),
            Some("Mon, 02 Jan 2023 10:00:00 GMT"),
            Some("http://x/a.mp3"),
        )];

        // Simulate a prior run by writing only the text file.
        std::fs::write(
            harness.store().text_path("2023-01-02-hello-world"),
            "previous transcript",
        )
        .unwrap();

        let fetcher = MockFetcher::new();
        let transcriber = MockTranscriber::new("base").with_response("new transcript");
        let summary = harness
            .pipeline(fetcher.clone(), transcriber.clone())
            .run(&feed)
            .await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(transcriber.call_count(), 0);

        // the original artifact is untouched
        let text = std::fs::read_to_string(
            harness.store().text_path("2023-01-02-hello-world"),
        )
        .unwrap();
        assert_eq!(text, "previous transcript");
    }

    #[tokio::test]
    async fn test_failure_isolation_continues_past_bad_episode() {
        let harness = Harness::new();
        let feed = vec![
            episode(Some("Broken"), None, None),
            episode(Some("First Good"), None, Some("http://x/1.mp3")),
            episode(Some("Second Good"), None, Some("http://x/2.mp3")),
        ];

        let fetcher = MockFetcher::new();
        let summary = harness
            .pipeline(fetcher.clone(), MockTranscriber::new("base"))
            .run(&feed)
            .await;

        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                skipped: 0,
                transcribed: 2,
                failed: 1,
            }
        );
        assert_eq!(fetcher.call_count(), 2);
        assert!(harness.store().is_transcribed("no-date-first-good"));
        assert!(harness.store().is_transcribed("no-date-second-good"));
    }

    #[tokio::test]
    async fn test_empty_audio_url_fails_without_download() {
        let harness = Harness::new();
        let feed = vec![episode(Some("Empty URL"), None, Some(""))];

        let fetcher = MockFetcher::new();
        let summary = harness
            .pipeline(fetcher.clone(), MockTranscriber::new("base"))
            .run(&feed)
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_fetch_failure() {
        let harness = Harness::new();
        let feed = vec![episode(Some("Drops"), None, Some("http://x/drops.mp3"))];

        let summary = harness
            .pipeline(
                MockFetcher::new().with_failure(),
                MockTranscriber::new("base"),
            )
            .run(&feed)
            .await;

        assert_eq!(summary.failed, 1);
        assert!(!harness.temp_audio_path.exists());
        assert!(!harness.store().is_transcribed("no-date-drops"));
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_transcription_failure() {
        let harness = Harness::new();
        let feed = vec![episode(Some("Corrupt"), None, Some("http://x/c.mp3"))];

        let summary = harness
            .pipeline(
                MockFetcher::new(),
                MockTranscriber::new("base").with_failure(),
            )
            .run(&feed)
            .await;

        assert_eq!(summary.failed, 1);
        assert!(!harness.temp_audio_path.exists());
        assert!(!harness.store().is_transcribed("no-date-corrupt"));
    }

    #[tokio::test]
    async fn test_counters_always_sum_to_total() {
        let harness = Harness::new();
        let feed = vec![
            episode(Some("Good"), Some("Mon, 02 Jan 2023 10:00:00 GMT"), Some("http://x/1.mp3")),
            episode(None, None, None),
            episode(Some("Also Good"), None, Some("http://x/2.mp3")),
            episode(Some("No URL"), None, None),
        ];

        let summary = harness
            .pipeline(MockFetcher::new(), MockTranscriber::new("base"))
            .run(&feed)
            .await;

        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.skipped + summary.transcribed + summary.failed,
            summary.total
        );
    }

    #[tokio::test]
    async fn test_failed_episode_is_retried_on_next_run() {
        let harness = Harness::new();
        let feed = vec![episode(Some("Flaky"), None, Some("http://x/f.mp3"))];

        let first = harness
            .pipeline(
                MockFetcher::new().with_failure(),
                MockTranscriber::new("base"),
            )
            .run(&feed)
            .await;
        assert_eq!(first.failed, 1);

        // Nothing was persisted, so the next run picks the episode up again.
        let second = harness
            .pipeline(
                MockFetcher::new(),
                MockTranscriber::new("base").with_response("recovered"),
            )
            .run(&feed)
            .await;
        assert_eq!(second.transcribed, 1);
        assert!(harness.store().is_transcribed("no-date-flaky"));
    }
}
