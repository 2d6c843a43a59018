use anyhow::Context as _;
use feed_rs::model::Entry;

/// One feed entry, reduced to the fields the pipeline needs.
///
/// Every field is optional because podcast feeds in the wild omit all of
/// them; absence handling (fallback tokens, precondition failures) happens
/// downstream, not here.
#[derive(Debug, Clone)]
pub struct Episode {
    pub title: Option<String>,
    /// Feed-native publication date string (RFC-822 style).
    pub published: Option<String>,
    /// URL of the first enclosure, when the entry has one.
    pub audio_url: Option<String>,
}

impl Episode {
    /// Title for progress output, with the display fallback.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// Fetch and parse the feed, returning episodes in document order.
///
/// Runs once per batch, before the loop starts; any failure here is a
/// startup error that terminates the process.
pub async fn fetch_episodes(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<Episode>> {
    tracing::info!("fetching RSS feed from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .context("failed to fetch RSS feed")?
        .error_for_status()
        .context("RSS feed request was rejected")?;

    let body = response.text().await.context("failed to read RSS body")?;

    let feed = feed_rs::parser::parse(body.as_bytes()).context("failed to parse RSS feed")?;
    tracing::info!("parsed {} entries from feed", feed.entries.len());

    Ok(feed.entries.into_iter().map(episode_from_entry).collect())
}

/// Reduce a parsed entry to an [`Episode`].
///
/// The audio URL comes from the first media enclosure, with a fallback to
/// a link tagged `audio/mpeg`, matching how podcast feeds surface their
/// files.
fn episode_from_entry(entry: Entry) -> Episode {
    let audio_url = entry
        .media
        .first()
        .and_then(|m| m.content.first())
        .and_then(|c| c.url.as_ref())
        .map(|u| u.to_string())
        .or_else(|| {
            entry
                .links
                .iter()
                .find(|l| l.media_type.as_deref() == Some("audio/mpeg"))
                .map(|l| l.href.clone())
        });

    Episode {
        title: entry.title.map(|t| t.content),
        published: entry.published.map(|d| d.to_rfc2822()),
        audio_url,
    }
}
