use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_id: i64,
    pub chapter_url: String,
    pub chapter_name: String,
    pub release_date: Option<String>,
    pub novel_id: i64,
    pub read: bool,
    pub bookmark: bool,
    pub downloaded: bool,
}

/// A scraped chapter that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewChapter {
    pub chapter_url: String,
    pub chapter_name: String,
    pub release_date: Option<String>,
}

/// A downloaded chapter joined with the metadata of its novel.
#[derive(Debug, Clone)]
pub struct DownloadedChapter {
    pub chapter: Chapter,
    pub source_id: i64,
    pub novel_name: String,
    pub novel_cover: Option<String>,
    pub novel_url: String,
}
