//! Row → model conversion. Corrupt stored values are logged and replaced
//! with defaults rather than failing a whole listing.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use folio_types::models::{Comment, Feedback, Magazine};

use crate::models::{CommentRow, FeedbackRow, MagazineRow};

/// Fixed-width RFC 3339 so that text ordering in SQLite matches time ordering.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') default: "YYYY-MM-DD HH:MM:SS", no timezone
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}

fn parse_uuid(raw: &str, field: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", field, raw, owner, e);
        Uuid::default()
    })
}

impl From<MagazineRow> for Magazine {
    fn from(row: MagazineRow) -> Self {
        let likes = row
            .likes
            .iter()
            .map(|uid| parse_uuid(uid, "like user_id", &row.id))
            .collect();

        Magazine {
            id: parse_uuid(&row.id, "id", &row.id),
            created_at: parse_timestamp(&row.created_at, &row.id),
            views: row.views.max(0) as u64,
            title: row.title,
            description: row.description,
            cover_image_url: row.cover_image_url,
            content: row.content,
            likes,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: parse_uuid(&row.id, "id", &row.id),
            magazine_id: parse_uuid(&row.magazine_id, "magazine_id", &row.id),
            author_id: parse_uuid(&row.author_id, "author_id", &row.id),
            created_at: parse_timestamp(&row.created_at, &row.id),
            author_name: row.author_name,
            body: row.body,
        }
    }
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Feedback {
            id: parse_uuid(&row.id, "id", &row.id),
            author_id: parse_uuid(&row.author_id, "author_id", &row.id),
            created_at: parse_timestamp(&row.created_at, &row.id),
            suggestion: row.suggestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_and_sort_as_text() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(1);
        let (a, b) = (timestamp(earlier), timestamp(later));
        assert!(a < b);
        assert_eq!(timestamp(parse_timestamp(&a, "t")), a);
    }

    #[test]
    fn sqlite_default_format_parses() {
        let parsed = parse_timestamp("2024-03-01 12:30:00", "t");
        assert_eq!(timestamp(parsed), "2024-03-01T12:30:00.000000Z");
    }

    #[test]
    fn corrupt_ids_fall_back_to_nil() {
        let row = FeedbackRow {
            id: "not-a-uuid".into(),
            author_id: Uuid::new_v4().to_string(),
            suggestion: "More comics".into(),
            created_at: "garbage".into(),
        };
        let feedback = Feedback::from(row);
        assert_eq!(feedback.id, Uuid::nil());
        assert_eq!(feedback.created_at, DateTime::<Utc>::default());
        assert_eq!(feedback.suggestion, "More comics");
    }
}
