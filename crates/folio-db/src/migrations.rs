use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS magazines (
            id               TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            cover_image_url  TEXT NOT NULL,
            content          TEXT NOT NULL,
            views            INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_magazines_created
            ON magazines(created_at);

        -- Like set: one row per (magazine, reader)
        CREATE TABLE IF NOT EXISTS magazine_likes (
            magazine_id  TEXT NOT NULL REFERENCES magazines(id) ON DELETE CASCADE,
            user_id      TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            PRIMARY KEY (magazine_id, user_id)
        );

        -- author_id has no FK: anonymous readers have no users row
        CREATE TABLE IF NOT EXISTS comments (
            id           TEXT PRIMARY KEY,
            magazine_id  TEXT NOT NULL REFERENCES magazines(id) ON DELETE CASCADE,
            author_id    TEXT NOT NULL,
            author_name  TEXT NOT NULL,
            body         TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_magazine
            ON comments(magazine_id, created_at);

        CREATE TABLE IF NOT EXISTS feedback (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL,
            suggestion  TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS magazine_layouts (
            magazine_id  TEXT PRIMARY KEY REFERENCES magazines(id) ON DELETE CASCADE,
            pages        TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
