mod chapter;
mod download;
mod novel;

pub use chapter::{Chapter, DownloadedChapter, NewChapter};
pub use download::Download;
pub use novel::{NewNovel, Novel};
