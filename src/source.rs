use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::Result;

/// A chapter as returned by a source's scraper.
#[derive(Debug, Clone)]
pub struct ScrapedChapter {
    pub chapter_name: String,
    pub chapter_text: String,
}

/// Site-specific scraper adapter providing chapter content.
#[async_trait]
pub trait Source: Send + Sync {
    fn id(&self) -> i64;

    /// Extra headers to send when fetching images from this source.
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    async fn parse_chapter(&self, novel_url: &str, chapter_url: &str) -> Result<ScrapedChapter>;
}
