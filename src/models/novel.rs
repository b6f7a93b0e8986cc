use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    pub novel_id: i64,
    pub source_id: i64,
    pub novel_name: String,
    pub novel_cover: Option<String>,
    pub novel_url: String,
}

#[derive(Debug, Clone)]
pub struct NewNovel {
    pub source_id: i64,
    pub novel_name: String,
    pub novel_cover: Option<String>,
    pub novel_url: String,
}
