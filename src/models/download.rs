use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locally stored chapter HTML with image references rewritten to local files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub download_chapter_id: i64,
    pub chapter_name: String,
    pub chapter_text: String,
    pub downloaded_at: DateTime<Utc>,
}
