use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Chapter, Download, DownloadedChapter, NewChapter, NewNovel, Novel};

use super::schema::SCHEMA;

/// Sort order for chapter listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterSort {
    #[default]
    IdAsc,
    IdDesc,
    NameAsc,
    NameDesc,
}

impl ChapterSort {
    fn as_sql(self) -> &'static str {
        match self {
            ChapterSort::IdAsc => " ORDER BY chapterId ASC",
            ChapterSort::IdDesc => " ORDER BY chapterId DESC",
            ChapterSort::NameAsc => " ORDER BY chapterName ASC",
            ChapterSort::NameDesc => " ORDER BY chapterName DESC",
        }
    }
}

/// Filter for chapter listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChapterFilter {
    #[default]
    All,
    Unread,
    Read,
    Downloaded,
    Bookmarked,
}

impl ChapterFilter {
    fn as_sql(self) -> &'static str {
        match self {
            ChapterFilter::All => "",
            ChapterFilter::Unread => " AND read = 0",
            ChapterFilter::Read => " AND read = 1",
            ChapterFilter::Downloaded => " AND downloaded = 1",
            ChapterFilter::Bookmarked => " AND bookmark = 1",
        }
    }
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Novel operations

    pub async fn insert_novel(&self, novel: NewNovel) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO novels (sourceId, novelName, novelCover, novelUrl) VALUES (?1, ?2, ?3, ?4)",
                    params![novel.source_id, novel.novel_name, novel.novel_cover, novel.novel_url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_novel(&self, novel_id: i64) -> Result<Option<Novel>> {
        let novel = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT novelId, sourceId, novelName, novelCover, novelUrl \
                     FROM novels WHERE novelId = ?1",
                )?;
                let novel = stmt
                    .query_row(params![novel_id], |row| Ok(novel_from_row(row)))
                    .optional()?;
                Ok(novel)
            })
            .await?;
        Ok(novel)
    }

    // Chapter operations

    pub async fn insert_chapters(&self, novel_id: i64, chapters: &[NewChapter]) -> Result<()> {
        if chapters.is_empty() {
            return Ok(());
        }
        let chapters = chapters.to_vec();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO chapters (chapterUrl, chapterName, releaseDate, novelId) VALUES (?1, ?2, ?3, ?4)",
                    )?;
                    for chapter in &chapters {
                        stmt.execute(params![
                            chapter.chapter_url,
                            chapter.chapter_name,
                            chapter.release_date,
                            novel_id,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_chapters(
        &self,
        novel_id: i64,
        sort: ChapterSort,
        filter: ChapterFilter,
    ) -> Result<Vec<Chapter>> {
        let query = format!(
            "SELECT chapterId, chapterUrl, chapterName, releaseDate, novelId, read, bookmark, downloaded \
             FROM chapters WHERE novelId = ?1{}{}",
            filter.as_sql(),
            sort.as_sql(),
        );
        let chapters = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let chapters = stmt
                    .query_map(params![novel_id], |row| Ok(chapter_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(chapters)
            })
            .await?;
        Ok(chapters)
    }

    /// The chapter with the greatest id below `chapter_id` within the same novel.
    pub async fn get_prev_chapter(
        &self,
        novel_id: i64,
        chapter_id: i64,
    ) -> Result<Option<Chapter>> {
        let chapter = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT chapterId, chapterUrl, chapterName, releaseDate, novelId, read, bookmark, downloaded \
                     FROM chapters WHERE novelId = ?1 AND chapterId < ?2 ORDER BY chapterId DESC LIMIT 1",
                )?;
                let chapter = stmt
                    .query_row(params![novel_id, chapter_id], |row| Ok(chapter_from_row(row)))
                    .optional()?;
                Ok(chapter)
            })
            .await?;
        Ok(chapter)
    }

    /// The chapter with the least id above `chapter_id` within the same novel.
    pub async fn get_next_chapter(
        &self,
        novel_id: i64,
        chapter_id: i64,
    ) -> Result<Option<Chapter>> {
        let chapter = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT chapterId, chapterUrl, chapterName, releaseDate, novelId, read, bookmark, downloaded \
                     FROM chapters WHERE novelId = ?1 AND chapterId > ?2 ORDER BY chapterId ASC LIMIT 1",
                )?;
                let chapter = stmt
                    .query_row(params![novel_id, chapter_id], |row| Ok(chapter_from_row(row)))
                    .optional()?;
                Ok(chapter)
            })
            .await?;
        Ok(chapter)
    }

    pub async fn mark_chapter_read(&self, chapter_id: i64) -> Result<()> {
        self.set_read_flag("chapterId = ?2", chapter_id, true).await
    }

    pub async fn mark_chapter_unread(&self, chapter_id: i64) -> Result<()> {
        self.set_read_flag("chapterId = ?2", chapter_id, false).await
    }

    pub async fn mark_all_chapters_read(&self, novel_id: i64) -> Result<()> {
        self.set_read_flag("novelId = ?2", novel_id, true).await
    }

    pub async fn mark_all_chapters_unread(&self, novel_id: i64) -> Result<()> {
        self.set_read_flag("novelId = ?2", novel_id, false).await
    }

    async fn set_read_flag(&self, predicate: &str, id: i64, read: bool) -> Result<()> {
        let query = format!("UPDATE chapters SET read = ?1 WHERE {predicate}");
        self.conn
            .call(move |conn| {
                conn.execute(&query, params![read, id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_previous_chapters_read(&self, chapter_id: i64, novel_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE chapters SET read = 1 WHERE chapterId < ?1 AND novelId = ?2",
                    params![chapter_id, novel_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn mark_previous_chapters_unread(
        &self,
        chapter_id: i64,
        novel_id: i64,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE chapters SET read = 0 WHERE chapterId < ?1 AND novelId = ?2",
                    params![chapter_id, novel_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn toggle_chapter_bookmark(&self, chapter_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE chapters SET bookmark = NOT bookmark WHERE chapterId = ?1",
                    params![chapter_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Last-read chapter of a novel, resolved through the history table.
    pub async fn get_last_read_chapter(&self, novel_id: i64) -> Result<Option<Chapter>> {
        let chapter = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.chapterId, c.chapterUrl, c.chapterName, c.releaseDate, c.novelId, c.read, c.bookmark, c.downloaded \
                     FROM history h \
                     JOIN chapters c ON h.historyChapterId = c.chapterId \
                     WHERE h.historyNovelId = ?1",
                )?;
                let chapter = stmt
                    .query_row(params![novel_id], |row| Ok(chapter_from_row(row)))
                    .optional()?;
                Ok(chapter)
            })
            .await?;
        Ok(chapter)
    }

    pub async fn upsert_history(&self, novel_id: i64, chapter_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO history (historyNovelId, historyChapterId)
                       VALUES (?1, ?2)
                       ON CONFLICT(historyNovelId) DO UPDATE SET
                           historyChapterId = excluded.historyChapterId"#,
                    params![novel_id, chapter_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Download operations

    pub async fn get_download(&self, chapter_id: i64) -> Result<Option<Download>> {
        let download = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT downloadChapterId, chapterName, chapterText, downloadedAt \
                     FROM downloads WHERE downloadChapterId = ?1",
                )?;
                let download = stmt
                    .query_row(params![chapter_id], |row| Ok(download_from_row(row)))
                    .optional()?;
                Ok(download)
            })
            .await?;
        Ok(download)
    }

    pub async fn is_chapter_downloaded(&self, chapter_id: i64) -> Result<bool> {
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM downloads WHERE downloadChapterId = ?1",
                    params![chapter_id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Sets the downloaded flag and upserts the stored chapter text in one transaction.
    pub async fn mark_chapter_downloaded(
        &self,
        chapter_id: i64,
        chapter_name: String,
        chapter_text: String,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "UPDATE chapters SET downloaded = 1 WHERE chapterId = ?1",
                    params![chapter_id],
                )?;
                tx.execute(
                    r#"INSERT INTO downloads (downloadChapterId, chapterName, chapterText)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(downloadChapterId) DO UPDATE SET
                           chapterName = excluded.chapterName,
                           chapterText = excluded.chapterText,
                           downloadedAt = datetime('now')"#,
                    params![chapter_id, chapter_name, chapter_text],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Clears the downloaded flag and removes the stored chapter text in one transaction.
    pub async fn delete_chapter_download(&self, chapter_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "UPDATE chapters SET downloaded = 0 WHERE chapterId = ?1",
                    params![chapter_id],
                )?;
                tx.execute(
                    "DELETE FROM downloads WHERE downloadChapterId = ?1",
                    params![chapter_id],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Bulk variant of [`delete_chapter_download`](Self::delete_chapter_download),
    /// bound with `IN (?, ...)` placeholders rather than an interpolated id list.
    pub async fn delete_chapter_downloads(&self, chapter_ids: &[i64]) -> Result<()> {
        if chapter_ids.is_empty() {
            return Ok(());
        }
        let ids = chapter_ids.to_vec();
        self.conn
            .call(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let tx = conn.transaction()?;
                tx.execute(
                    &format!("UPDATE chapters SET downloaded = 0 WHERE chapterId IN ({placeholders})"),
                    params_from_iter(ids.iter()),
                )?;
                tx.execute(
                    &format!("DELETE FROM downloads WHERE downloadChapterId IN ({placeholders})"),
                    params_from_iter(ids.iter()),
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn delete_all_downloads(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute("UPDATE chapters SET downloaded = 0", [])?;
                tx.execute("DELETE FROM downloads", [])?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_downloaded_chapters(&self) -> Result<Vec<DownloadedChapter>> {
        let chapters = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT c.chapterId, c.chapterUrl, c.chapterName, c.releaseDate, c.novelId, c.read, c.bookmark, c.downloaded, \
                            n.sourceId, n.novelName, n.novelCover, n.novelUrl \
                     FROM chapters c \
                     JOIN novels n ON c.novelId = n.novelId \
                     WHERE c.downloaded = 1",
                )?;
                let chapters = stmt
                    .query_map([], |row| Ok(downloaded_chapter_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(chapters)
            })
            .await?;
        Ok(chapters)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn novel_from_row(row: &Row) -> Novel {
    Novel {
        novel_id: row.get(0).unwrap(),
        source_id: row.get(1).unwrap(),
        novel_name: row.get(2).unwrap(),
        novel_cover: row.get(3).unwrap(),
        novel_url: row.get(4).unwrap(),
    }
}

fn chapter_from_row(row: &Row) -> Chapter {
    Chapter {
        chapter_id: row.get(0).unwrap(),
        chapter_url: row.get(1).unwrap(),
        chapter_name: row.get(2).unwrap(),
        release_date: row.get(3).unwrap(),
        novel_id: row.get(4).unwrap(),
        read: row.get::<_, i64>(5).unwrap() != 0,
        bookmark: row.get::<_, i64>(6).unwrap() != 0,
        downloaded: row.get::<_, i64>(7).unwrap() != 0,
    }
}

fn downloaded_chapter_from_row(row: &Row) -> DownloadedChapter {
    DownloadedChapter {
        chapter: chapter_from_row(row),
        source_id: row.get(8).unwrap(),
        novel_name: row.get(9).unwrap(),
        novel_cover: row.get(10).unwrap(),
        novel_url: row.get(11).unwrap(),
    }
}

fn download_from_row(row: &Row) -> Download {
    Download {
        download_chapter_id: row.get(0).unwrap(),
        chapter_name: row.get(1).unwrap(),
        chapter_text: row.get(2).unwrap(),
        downloaded_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("lnreader.db");
        let repo = Repository::new(db_path.to_str().unwrap()).await.unwrap();
        (dir, repo)
    }

    async fn seed_novel(repo: &Repository) -> i64 {
        repo.insert_novel(NewNovel {
            source_id: 1,
            novel_name: "Grimgar".to_string(),
            novel_cover: None,
            novel_url: "https://example.com/novel/grimgar".to_string(),
        })
        .await
        .unwrap()
    }

    fn sample_chapters(n: usize) -> Vec<NewChapter> {
        (1..=n)
            .map(|i| NewChapter {
                chapter_url: format!("https://example.com/novel/grimgar/chapter-{i}"),
                chapter_name: format!("Chapter {i}"),
                release_date: Some("2024-03-01".to_string()),
            })
            .collect()
    }

    #[tokio::test]
    async fn insert_and_get_novel() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;

        let novel = repo.get_novel(novel_id).await.unwrap().unwrap();
        assert_eq!(novel.novel_id, novel_id);
        assert_eq!(novel.novel_name, "Grimgar");
        assert_eq!(novel.source_id, 1);
        assert!(novel.novel_cover.is_none());

        assert!(repo.get_novel(novel_id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_empty_chapter_list_is_noop() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;

        repo.insert_chapters(novel_id, &[]).await.unwrap();

        let chapters = repo
            .get_chapters(novel_id, ChapterSort::default(), ChapterFilter::default())
            .await
            .unwrap();
        assert!(chapters.is_empty());
    }

    #[tokio::test]
    async fn insert_and_list_chapters_sorted() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(3)).await.unwrap();

        let asc = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        assert_eq!(asc.len(), 3);
        assert_eq!(asc[0].chapter_name, "Chapter 1");
        assert!(!asc[0].read);
        assert!(!asc[0].downloaded);

        let desc = repo
            .get_chapters(novel_id, ChapterSort::IdDesc, ChapterFilter::All)
            .await
            .unwrap();
        assert_eq!(desc[0].chapter_name, "Chapter 3");
    }

    #[tokio::test]
    async fn mark_read_then_unread() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(1)).await.unwrap();
        let id = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap()[0]
            .chapter_id;

        repo.mark_chapter_read(id).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Read)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert!(chapters[0].read);

        repo.mark_chapter_unread(id).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Unread)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert!(!chapters[0].read);
    }

    #[tokio::test]
    async fn mark_previous_chapters_read_stops_at_boundary() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(4)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();

        repo.mark_previous_chapters_read(chapters[2].chapter_id, novel_id)
            .await
            .unwrap();

        let read = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Read)
            .await
            .unwrap();
        let read_ids: Vec<i64> = read.iter().map(|c| c.chapter_id).collect();
        assert_eq!(read_ids, vec![chapters[0].chapter_id, chapters[1].chapter_id]);
    }

    #[tokio::test]
    async fn mark_all_chapters_read_and_unread() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(3)).await.unwrap();

        repo.mark_all_chapters_read(novel_id).await.unwrap();
        let read = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Read)
            .await
            .unwrap();
        assert_eq!(read.len(), 3);

        repo.mark_all_chapters_unread(novel_id).await.unwrap();
        let read = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Read)
            .await
            .unwrap();
        assert!(read.is_empty());
    }

    #[tokio::test]
    async fn prev_and_next_chapter_by_id_ordering() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(3)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();

        let prev = repo
            .get_prev_chapter(novel_id, chapters[1].chapter_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prev.chapter_id, chapters[0].chapter_id);

        let next = repo
            .get_next_chapter(novel_id, chapters[1].chapter_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.chapter_id, chapters[2].chapter_id);

        // Boundaries
        assert!(repo
            .get_prev_chapter(novel_id, chapters[0].chapter_id)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get_next_chapter(novel_id, chapters[2].chapter_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn prev_next_do_not_cross_novels() {
        let (_dir, repo) = open_repo().await;
        let first = seed_novel(&repo).await;
        let second = seed_novel(&repo).await;
        repo.insert_chapters(first, &sample_chapters(1)).await.unwrap();
        repo.insert_chapters(second, &sample_chapters(1)).await.unwrap();

        let own = repo
            .get_chapters(second, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        assert!(repo
            .get_prev_chapter(second, own[0].chapter_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn bookmark_toggles() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(1)).await.unwrap();
        let id = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap()[0]
            .chapter_id;

        repo.toggle_chapter_bookmark(id).await.unwrap();
        let bookmarked = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Bookmarked)
            .await
            .unwrap();
        assert_eq!(bookmarked.len(), 1);

        repo.toggle_chapter_bookmark(id).await.unwrap();
        let bookmarked = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Bookmarked)
            .await
            .unwrap();
        assert!(bookmarked.is_empty());
    }

    #[tokio::test]
    async fn downloaded_flag_and_row_stay_paired() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(1)).await.unwrap();
        let id = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap()[0]
            .chapter_id;

        assert!(!repo.is_chapter_downloaded(id).await.unwrap());

        repo.mark_chapter_downloaded(id, "Chapter 1".to_string(), "<p>text</p>".to_string())
            .await
            .unwrap();
        assert!(repo.is_chapter_downloaded(id).await.unwrap());
        let download = repo.get_download(id).await.unwrap().unwrap();
        assert_eq!(download.chapter_text, "<p>text</p>");

        repo.delete_chapter_download(id).await.unwrap();
        assert!(!repo.is_chapter_downloaded(id).await.unwrap());
        assert!(repo.get_download(id).await.unwrap().is_none());
        let chapter = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        assert!(!chapter[0].downloaded);
    }

    #[tokio::test]
    async fn mark_chapter_downloaded_twice_upserts() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(1)).await.unwrap();
        let id = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap()[0]
            .chapter_id;

        repo.mark_chapter_downloaded(id, "Chapter 1".to_string(), "old".to_string())
            .await
            .unwrap();
        repo.mark_chapter_downloaded(id, "Chapter 1".to_string(), "new".to_string())
            .await
            .unwrap();

        let download = repo.get_download(id).await.unwrap().unwrap();
        assert_eq!(download.chapter_text, "new");
    }

    #[tokio::test]
    async fn bulk_delete_clears_all_rows_and_flags() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(3)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        for c in &chapters {
            repo.mark_chapter_downloaded(c.chapter_id, c.chapter_name.clone(), "x".to_string())
                .await
                .unwrap();
        }

        let ids: Vec<i64> = chapters.iter().map(|c| c.chapter_id).collect();
        repo.delete_chapter_downloads(&ids).await.unwrap();

        for id in ids {
            assert!(!repo.is_chapter_downloaded(id).await.unwrap());
        }
        let downloaded = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::Downloaded)
            .await
            .unwrap();
        assert!(downloaded.is_empty());
    }

    #[tokio::test]
    async fn downloaded_chapters_join_novel_metadata() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(2)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        repo.mark_chapter_downloaded(
            chapters[0].chapter_id,
            chapters[0].chapter_name.clone(),
            "x".to_string(),
        )
        .await
        .unwrap();

        let downloaded = repo.get_downloaded_chapters().await.unwrap();
        assert_eq!(downloaded.len(), 1);
        assert_eq!(downloaded[0].novel_name, "Grimgar");
        assert_eq!(downloaded[0].source_id, 1);
        assert_eq!(downloaded[0].chapter.chapter_id, chapters[0].chapter_id);
    }

    #[tokio::test]
    async fn last_read_chapter_resolves_through_history() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(2)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();

        assert!(repo.get_last_read_chapter(novel_id).await.unwrap().is_none());

        repo.upsert_history(novel_id, chapters[1].chapter_id).await.unwrap();
        let last = repo.get_last_read_chapter(novel_id).await.unwrap().unwrap();
        assert_eq!(last.chapter_id, chapters[1].chapter_id);

        repo.upsert_history(novel_id, chapters[0].chapter_id).await.unwrap();
        let last = repo.get_last_read_chapter(novel_id).await.unwrap().unwrap();
        assert_eq!(last.chapter_id, chapters[0].chapter_id);
    }

    #[tokio::test]
    async fn delete_all_downloads_empties_table() {
        let (_dir, repo) = open_repo().await;
        let novel_id = seed_novel(&repo).await;
        repo.insert_chapters(novel_id, &sample_chapters(2)).await.unwrap();
        let chapters = repo
            .get_chapters(novel_id, ChapterSort::IdAsc, ChapterFilter::All)
            .await
            .unwrap();
        for c in &chapters {
            repo.mark_chapter_downloaded(c.chapter_id, c.chapter_name.clone(), "x".to_string())
                .await
                .unwrap();
        }

        repo.delete_all_downloads().await.unwrap();

        assert!(repo.get_downloaded_chapters().await.unwrap().is_empty());
        for c in &chapters {
            assert!(repo.get_download(c.chapter_id).await.unwrap().is_none());
        }
    }
}
