use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::Chapter;

use super::downloader::chapter_image_folder;

/// Removes downloaded chapters: image files first, then the database rows.
pub struct DownloadCleaner {
    downloads_root: PathBuf,
}

impl DownloadCleaner {
    pub fn new(config: &Config) -> Self {
        Self {
            downloads_root: config.downloads_root.clone(),
        }
    }

    /// Best-effort removal of a chapter's image files. Errors are traced and
    /// swallowed so a missing or unreadable folder never blocks the row delete.
    pub async fn delete_downloaded_images(&self, source_id: i64, novel_id: i64, chapter_id: i64) {
        let folder = chapter_image_folder(&self.downloads_root, source_id, novel_id, chapter_id);
        if let Err(e) = remove_b64_images(&folder) {
            tracing::debug!("Failed to clean image folder {}: {}", folder.display(), e);
        }
    }

    /// Remove one chapter's download: its image files, its downloads row and
    /// its downloaded flag.
    pub async fn delete_chapter(
        &self,
        repo: &Repository,
        source_id: i64,
        novel_id: i64,
        chapter_id: i64,
    ) -> Result<()> {
        self.delete_downloaded_images(source_id, novel_id, chapter_id)
            .await;
        repo.delete_chapter_download(chapter_id).await
    }

    /// Bulk removal. Image cleanup fans out concurrently, then the rows and
    /// flags are cleared in one batched transaction.
    pub async fn delete_chapters(
        &self,
        repo: &Repository,
        source_id: i64,
        chapters: &[Chapter],
    ) -> Result<()> {
        if chapters.is_empty() {
            return Ok(());
        }

        futures::future::join_all(chapters.iter().map(|chapter| {
            self.delete_downloaded_images(source_id, chapter.novel_id, chapter.chapter_id)
        }))
        .await;

        let ids: Vec<i64> = chapters.iter().map(|c| c.chapter_id).collect();
        repo.delete_chapter_downloads(&ids).await
    }
}

fn remove_b64_images(folder: &Path) -> std::io::Result<()> {
    if !folder.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_image = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(".b64.png"))
            .unwrap_or(false);
        if is_image {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_only_chapter_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0.b64.png"), b"a").unwrap();
        std::fs::write(dir.path().join("1.b64.png"), b"b").unwrap();
        std::fs::write(dir.path().join(".nomedia"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        remove_b64_images(dir.path()).unwrap();

        assert!(!dir.path().join("0.b64.png").exists());
        assert!(!dir.path().join("1.b64.png").exists());
        assert!(dir.path().join(".nomedia").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn missing_folder_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        remove_b64_images(&dir.path().join("absent")).unwrap();
    }
}
