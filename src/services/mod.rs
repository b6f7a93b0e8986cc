mod cleanup;
mod downloader;

pub use cleanup::DownloadCleaner;
pub use downloader::DownloadManager;
