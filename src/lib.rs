//! Persistence and download management for a light novel reader.
//!
//! The [`Repository`] stores novels, chapters and per-chapter read, bookmark
//! and downloaded state in SQLite. The [`DownloadManager`] fetches chapter
//! HTML through a [`Source`] scraper, pulls inline images to local storage
//! and records the rewritten HTML for offline reading; the [`DownloadCleaner`]
//! removes downloads again, files first.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod source;
pub mod toast;

pub use config::Config;
pub use db::{ChapterFilter, ChapterSort, Repository};
pub use error::{AppError, Result};
pub use services::{DownloadCleaner, DownloadManager};
pub use source::{ScrapedChapter, Source};
pub use toast::{Toast, TracingToast};
