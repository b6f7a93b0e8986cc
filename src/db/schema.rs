pub const SCHEMA: &str = r#"
-- novels table
CREATE TABLE IF NOT EXISTS novels (
    novelId INTEGER PRIMARY KEY AUTOINCREMENT,
    sourceId INTEGER NOT NULL,
    novelName TEXT NOT NULL,
    novelCover TEXT,
    novelUrl TEXT NOT NULL
);

-- chapters table
CREATE TABLE IF NOT EXISTS chapters (
    chapterId INTEGER PRIMARY KEY AUTOINCREMENT,
    chapterUrl TEXT NOT NULL,
    chapterName TEXT NOT NULL,
    releaseDate TEXT,
    novelId INTEGER NOT NULL REFERENCES novels(novelId) ON DELETE CASCADE,
    read INTEGER NOT NULL DEFAULT 0,
    bookmark INTEGER NOT NULL DEFAULT 0,
    downloaded INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_chapters_novel_id ON chapters(novelId);
CREATE INDEX IF NOT EXISTS idx_chapters_downloaded ON chapters(downloaded);

-- downloads table
CREATE TABLE IF NOT EXISTS downloads (
    downloadChapterId INTEGER PRIMARY KEY REFERENCES chapters(chapterId) ON DELETE CASCADE,
    chapterName TEXT NOT NULL,
    chapterText TEXT NOT NULL,
    downloadedAt TEXT NOT NULL DEFAULT (datetime('now'))
);

-- history table (written by the reader screen; read-only here)
CREATE TABLE IF NOT EXISTS history (
    historyNovelId INTEGER NOT NULL UNIQUE REFERENCES novels(novelId) ON DELETE CASCADE,
    historyChapterId INTEGER NOT NULL REFERENCES chapters(chapterId) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_history_novel_id ON history(historyNovelId);
"#;
