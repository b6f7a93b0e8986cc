mod repository;
mod schema;

pub use repository::{ChapterFilter, ChapterSort, Repository};
