use std::collections::HashMap;

use crate::Database;
use crate::models::{CommentRow, FeedbackRow, LayoutRow, MagazineRow, NewMagazine, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Returns false if the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Magazines --

    pub fn insert_magazine(&self, magazine: &NewMagazine<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO magazines (id, title, description, cover_image_url, content, views, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![
                    magazine.id,
                    magazine.title,
                    magazine.description,
                    magazine.cover_image_url,
                    magazine.content,
                    magazine.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_magazine(&self, id: &str) -> Result<Option<MagazineRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, title, description, cover_image_url, content, views, created_at
                     FROM magazines WHERE id = ?1",
                    [id],
                    magazine_from_row,
                )
                .optional()?;

            match row {
                Some(mut row) => {
                    row.likes = query_likes(conn, &row.id)?;
                    Ok(Some(row))
                }
                None => Ok(None),
            }
        })
    }

    /// All magazines, newest first, with their like sets.
    pub fn list_magazines(&self) -> Result<Vec<MagazineRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, cover_image_url, content, views, created_at
                 FROM magazines
                 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt
                .query_map([], magazine_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over the like table instead of a query per magazine
            let mut likes: HashMap<String, Vec<String>> = HashMap::new();
            let mut stmt = conn.prepare(
                "SELECT magazine_id, user_id FROM magazine_likes ORDER BY created_at ASC",
            )?;
            let pairs = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
            for pair in pairs {
                let (magazine_id, user_id) = pair?;
                likes.entry(magazine_id).or_default().push(user_id);
            }

            for row in &mut rows {
                row.likes = likes.remove(&row.id).unwrap_or_default();
            }
            Ok(rows)
        })
    }

    /// Atomically bump the view counter. Returns the new count, or `None`
    /// if the magazine does not exist.
    pub fn increment_views(&self, id: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let views = conn
                .query_row(
                    "UPDATE magazines SET views = views + 1 WHERE id = ?1 RETURNING views",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(views)
        })
    }

    /// Toggle a reader's like: removes if present, inserts if not.
    /// Returns `(liked, like_count)` after the toggle, or `None` if the
    /// magazine does not exist.
    pub fn toggle_like(
        &self,
        magazine_id: &str,
        user_id: &str,
        now: &str,
    ) -> Result<Option<(bool, usize)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let exists: Option<String> = tx
                .query_row("SELECT id FROM magazines WHERE id = ?1", [magazine_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM magazine_likes WHERE magazine_id = ?1 AND user_id = ?2",
                (magazine_id, user_id),
            )?;
            let liked = if removed == 0 {
                tx.execute(
                    "INSERT INTO magazine_likes (magazine_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    (magazine_id, user_id, now),
                )?;
                true
            } else {
                false
            };

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM magazine_likes WHERE magazine_id = ?1",
                [magazine_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(Some((liked, count as usize)))
        })
    }

    /// Delete a magazine along with its comments, likes and layout.
    /// Returns false if nothing was deleted.
    pub fn delete_magazine(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM magazines WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Comments --

    /// Returns false if the magazine does not exist.
    pub fn insert_comment(&self, comment: &CommentRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let exists: Option<String> = tx
                .query_row(
                    "SELECT id FROM magazines WHERE id = ?1",
                    [&comment.magazine_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO comments (id, magazine_id, author_id, author_name, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    comment.id,
                    comment.magazine_id,
                    comment.author_id,
                    comment.author_name,
                    comment.body,
                    comment.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Comments of a magazine, oldest first.
    pub fn get_comments(&self, magazine_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, magazine_id, author_id, author_name, body, created_at
                 FROM comments
                 WHERE magazine_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([magazine_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        magazine_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_name: row.get(3)?,
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Feedback --

    pub fn insert_feedback(&self, feedback: &FeedbackRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (id, author_id, suggestion, created_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    &feedback.id,
                    &feedback.author_id,
                    &feedback.suggestion,
                    &feedback.created_at,
                ),
            )?;
            Ok(())
        })
    }

    /// All feedback, newest first.
    pub fn get_feedback(&self) -> Result<Vec<FeedbackRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, suggestion, created_at FROM feedback ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(FeedbackRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        suggestion: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Layouts --

    /// Overwrite the stored page layout of a magazine. Returns false if the
    /// magazine does not exist.
    pub fn save_layout(&self, magazine_id: &str, pages_json: &str, now: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let exists: Option<String> = tx
                .query_row("SELECT id FROM magazines WHERE id = ?1", [magazine_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO magazine_layouts (magazine_id, pages, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(magazine_id) DO UPDATE SET pages = excluded.pages, updated_at = excluded.updated_at",
                (magazine_id, pages_json, now),
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_layout(&self, magazine_id: &str) -> Result<Option<LayoutRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT magazine_id, pages, updated_at FROM magazine_layouts WHERE magazine_id = ?1",
                    [magazine_id],
                    |row| {
                        Ok(LayoutRow {
                            magazine_id: row.get(0)?,
                            pages: row.get(1)?,
                            updated_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_likes(conn: &Connection, magazine_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM magazine_likes WHERE magazine_id = ?1 ORDER BY created_at ASC",
    )?;
    let likes = stmt
        .query_map([magazine_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(likes)
}

fn magazine_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MagazineRow> {
    Ok(MagazineRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        cover_image_url: row.get(3)?,
        content: row.get(4)?,
        views: row.get(5)?,
        created_at: row.get(6)?,
        likes: Vec::new(),
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::timestamp;
    use chrono::{Duration, Utc};

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn publish(db: &Database, id: &str, title: &str, created_at: &str) {
        db.insert_magazine(&NewMagazine {
            id,
            title,
            description: "",
            cover_image_url: "https://example.com/cover.png",
            content: "Hello",
            created_at,
        })
        .unwrap();
    }

    #[test]
    fn duplicate_username_is_refused() {
        let db = db();
        assert!(db.create_user("u1", "chief", "hash").unwrap());
        assert!(!db.create_user("u2", "chief", "other").unwrap());
        assert_eq!(db.get_user_by_username("chief").unwrap().unwrap().id, "u1");
    }

    #[test]
    fn new_magazine_starts_unviewed_and_unliked() {
        let db = db();
        publish(&db, "m1", "Issue 1", &timestamp(Utc::now()));

        let row = db.get_magazine("m1").unwrap().unwrap();
        assert_eq!(row.views, 0);
        assert!(row.likes.is_empty());
        assert!(db.get_magazine("missing").unwrap().is_none());
    }

    #[test]
    fn views_increment_once_per_open() {
        let db = db();
        publish(&db, "m1", "Issue 1", &timestamp(Utc::now()));

        for n in 1..=5 {
            assert_eq!(db.increment_views("m1").unwrap(), Some(n));
        }
        assert_eq!(db.get_magazine("m1").unwrap().unwrap().views, 5);
        assert_eq!(db.increment_views("missing").unwrap(), None);
    }

    #[test]
    fn like_toggle_round_trips() {
        let db = db();
        let now = timestamp(Utc::now());
        publish(&db, "m1", "Issue 1", &now);

        assert_eq!(db.toggle_like("m1", "u2", &now).unwrap(), Some((true, 1)));
        assert_eq!(db.toggle_like("m1", "u1", &now).unwrap(), Some((true, 2)));
        assert_eq!(db.toggle_like("m1", "u1", &now).unwrap(), Some((false, 1)));

        let row = db.get_magazine("m1").unwrap().unwrap();
        assert_eq!(row.likes, vec!["u2".to_string()]);
        assert_eq!(db.toggle_like("missing", "u1", &now).unwrap(), None);
    }

    #[test]
    fn list_orders_newest_first_with_likes() {
        let db = db();
        let t0 = Utc::now();
        publish(&db, "old", "Old", &timestamp(t0));
        publish(&db, "new", "New", &timestamp(t0 + Duration::seconds(5)));
        db.toggle_like("old", "u1", &timestamp(t0)).unwrap();

        let rows = db.list_magazines().unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(rows[1].likes, vec!["u1".to_string()]);
        assert!(rows[0].likes.is_empty());
    }

    #[test]
    fn delete_cascades_to_children() {
        let db = db();
        let now = timestamp(Utc::now());
        publish(&db, "m1", "Issue 1", &now);
        db.toggle_like("m1", "u1", &now).unwrap();
        db.save_layout("m1", "[]", &now).unwrap();
        assert!(db
            .insert_comment(&CommentRow {
                id: "c1".into(),
                magazine_id: "m1".into(),
                author_id: "u1".into(),
                author_name: "reader".into(),
                body: "Nice".into(),
                created_at: now.clone(),
            })
            .unwrap());

        assert!(db.delete_magazine("m1").unwrap());
        assert!(!db.delete_magazine("m1").unwrap());
        assert!(db.get_comments("m1").unwrap().is_empty());
        assert!(db.get_layout("m1").unwrap().is_none());
    }

    #[test]
    fn comments_come_back_oldest_first() {
        let db = db();
        let t0 = Utc::now();
        publish(&db, "m1", "Issue 1", &timestamp(t0));
        for (id, offset) in [("late", 30), ("early", 10), ("mid", 20)] {
            db.insert_comment(&CommentRow {
                id: id.into(),
                magazine_id: "m1".into(),
                author_id: "u1".into(),
                author_name: "reader".into(),
                body: id.into(),
                created_at: timestamp(t0 + Duration::seconds(offset)),
            })
            .unwrap();
        }

        let ids: Vec<String> = db.get_comments("m1").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
    }

    #[test]
    fn comment_on_missing_magazine_is_refused() {
        let db = db();
        let inserted = db
            .insert_comment(&CommentRow {
                id: "c1".into(),
                magazine_id: "nope".into(),
                author_id: "u1".into(),
                author_name: "reader".into(),
                body: "hi".into(),
                created_at: timestamp(Utc::now()),
            })
            .unwrap();
        assert!(!inserted);
    }

    #[test]
    fn feedback_comes_back_newest_first() {
        let db = db();
        let t0 = Utc::now();
        for (id, offset) in [("a", 1), ("c", 3), ("b", 2)] {
            db.insert_feedback(&FeedbackRow {
                id: id.into(),
                author_id: "u1".into(),
                suggestion: id.into(),
                created_at: timestamp(t0 + Duration::seconds(offset)),
            })
            .unwrap();
        }
        let ids: Vec<String> = db.get_feedback().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn layout_save_overwrites() {
        let db = db();
        let now = timestamp(Utc::now());
        publish(&db, "m1", "Issue 1", &now);

        assert!(db.save_layout("m1", "[1]", &now).unwrap());
        assert!(db.save_layout("m1", "[2]", &now).unwrap());
        assert_eq!(db.get_layout("m1").unwrap().unwrap().pages, "[2]");
        assert!(!db.save_layout("missing", "[]", &now).unwrap());
    }
}
