use anyhow::Context as _;
use podscribe::config::Config;
use podscribe::feed;
use podscribe::fetch::HttpFetcher;
use podscribe::pipeline::TranscriptionPipeline;
use podscribe::store::TranscriptStore;
use podscribe::transcribe::{Transcriber as _, WhisperTranscriber};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.temp_dir).context("failed to create temp directory")?;

    println!("Fetching episodes from RSS feed...");
    let client = reqwest::Client::new();
    let episodes = feed::fetch_episodes(&client, &config.feed_url).await?;
    println!("Found {} episodes\n", episodes.len());

    let store = TranscriptStore::new(&config.transcripts_dir)
        .context("failed to create transcripts directory")?;
    println!("Already have {} transcriptions\n", store.transcript_count()?);

    println!("Loading Whisper model (this may take a minute)...");
    let transcriber = WhisperTranscriber::new(&config.model_path, &config.language)?;
    println!("✓ Model loaded: {}\n", transcriber.model_name());

    let pipeline = TranscriptionPipeline::new(
        store,
        HttpFetcher::new(client),
        Arc::new(transcriber),
        config.temp_audio_path(),
    );

    let summary = pipeline.run(&episodes).await;
    summary.print();

    Ok(())
}
