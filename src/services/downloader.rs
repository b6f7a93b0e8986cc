use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::source::Source;
use crate::toast::Toast;

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Marker the reader checks to know the chapter body was served from disk.
const OFFLINE_MARKER: &str = "<input type=\"hidden\" offline/>";

pub struct DownloadManager {
    client: Client,
    downloads_root: PathBuf,
    toast: Arc<dyn Toast>,
}

impl DownloadManager {
    pub fn new(config: &Config, toast: Arc<dyn Toast>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            downloads_root: config.downloads_root.clone(),
            toast,
        }
    }

    /// Fetch a chapter through its source, localize inline images and record
    /// the rewritten HTML. Unlike the best-effort image handling below, this
    /// entry point propagates failure to the caller.
    pub async fn download_chapter(
        &self,
        source: &dyn Source,
        repo: &Repository,
        novel_url: &str,
        novel_id: i64,
        chapter_url: &str,
        chapter_id: i64,
    ) -> Result<()> {
        let chapter = source.parse_chapter(novel_url, chapter_url).await?;

        if chapter.chapter_text.trim().is_empty() {
            return Err(AppError::EmptyChapter);
        }

        let chapter_text = self
            .localize_images(&chapter.chapter_text, source, novel_id, chapter_id)
            .await;

        repo.mark_chapter_downloaded(chapter_id, chapter.chapter_name, chapter_text)
            .await?;

        tracing::debug!("Downloaded chapter {chapter_id} of novel {novel_id}");
        Ok(())
    }

    /// Download every `<img>` referenced by the chapter into the per-chapter
    /// image folder and rewrite its src to the local file. A failed image is
    /// reported through the toast sink and skipped; files already written for
    /// earlier images are kept.
    async fn localize_images(
        &self,
        html: &str,
        source: &dyn Source,
        novel_id: i64,
        chapter_id: i64,
    ) -> String {
        let image_urls = collect_image_urls(html);

        if image_urls.is_empty() {
            return with_offline_marker(html);
        }

        let headers = source.headers();
        let mut rewrites: Vec<(String, String)> = Vec::new();

        for (index, image_url) in image_urls.iter().enumerate() {
            if Url::parse(image_url).is_err() {
                tracing::debug!("Skipping image with unparseable url {image_url}");
                continue;
            }

            let folder = match create_image_folder(
                &self.downloads_root,
                source.id(),
                novel_id,
                chapter_id,
            ) {
                Ok(folder) => folder,
                Err(e) => {
                    tracing::warn!("Could not create image folder for chapter {chapter_id}: {e}");
                    self.toast
                        .show("Unexpected storage error! Remove the chapter and try downloading again");
                    return with_offline_marker(&apply_src_rewrites(html, &rewrites));
                }
            };

            let file_path = folder.join(format!("{index}.b64.png"));
            match self.fetch_image(image_url, &headers).await {
                Ok(bytes) => {
                    if let Err(e) = std::fs::write(&file_path, &bytes) {
                        tracing::warn!("Failed to write {}: {}", file_path.display(), e);
                        self.toast.show(&format!(
                            "Unexpected storage error! Remove {} and try downloading again",
                            file_path.display()
                        ));
                        continue;
                    }
                    rewrites.push((
                        image_url.clone(),
                        format!("file://{}", file_path.display()),
                    ));
                }
                Err(e) => {
                    tracing::debug!("Failed to fetch image {image_url}: {e}");
                    self.toast.show(&format!(
                        "Couldn't download image {index} of chapter {chapter_id}"
                    ));
                }
            }
        }

        with_offline_marker(&apply_src_rewrites(html, &rewrites))
    }

    async fn fetch_image(&self, url: &str, headers: &HeaderMap) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(
                anyhow::anyhow!("Failed to fetch image: HTTP {}", response.status()).into(),
            );
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Distinct `<img>` srcs of a chapter, in document order. `Html` is not Send,
/// so this runs before the first await of the download loop. A src appearing
/// under several tags is fetched once and every tag gets the same local file.
fn collect_image_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").unwrap();
    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .filter(|src| seen.insert(src.to_string()))
        .map(str::to_string)
        .collect()
}

/// Swap every fetched src for its local path. Longest urls go first so that a
/// url that is a prefix of another one cannot clobber the longer tag.
fn apply_src_rewrites(html: &str, rewrites: &[(String, String)]) -> String {
    let mut ordered: Vec<&(String, String)> = rewrites.iter().collect();
    ordered.sort_by_key(|(url, _)| std::cmp::Reverse(url.len()));

    let mut rewritten = html.to_string();
    for (url, local) in ordered {
        rewritten = rewritten.replace(url.as_str(), local);
    }
    rewritten
}

/// Path of the image folder for one chapter, below the downloads root.
pub(crate) fn chapter_image_folder(
    root: &Path,
    source_id: i64,
    novel_id: i64,
    chapter_id: i64,
) -> PathBuf {
    root.join(source_id.to_string())
        .join(novel_id.to_string())
        .join(chapter_id.to_string())
}

/// Create the chapter's image folder, dropping a `.nomedia` sentinel into
/// every directory created along the way.
pub(crate) fn create_image_folder(
    root: &Path,
    source_id: i64,
    novel_id: i64,
    chapter_id: i64,
) -> std::io::Result<PathBuf> {
    let mut path = root.to_path_buf();
    mkdir_with_nomedia(&path)?;
    for part in [source_id, novel_id, chapter_id] {
        path.push(part.to_string());
        mkdir_with_nomedia(&path)?;
    }
    Ok(path)
}

fn mkdir_with_nomedia(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join(".nomedia"), "")?;
    }
    Ok(())
}

fn with_offline_marker(html: &str) -> String {
    if let Some(start) = html.find("<body") {
        if let Some(end) = html[start..].find('>') {
            let insert_at = start + end + 1;
            return format!("{}{}{}", &html[..insert_at], OFFLINE_MARKER, &html[insert_at..]);
        }
    }
    format!("{OFFLINE_MARKER}{html}")
}
