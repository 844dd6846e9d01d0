use anyhow::Result;

use folio_db::Database;
use folio_types::events::{GatewayEvent, Topic};
use folio_types::models::{
    Comment, Feedback, Magazine, sort_comments, sort_feedback, sort_magazines,
};

/// Load the full, display-ordered result set for `topic`. Blocking.
pub fn load(db: &Database, topic: Topic) -> Result<GatewayEvent> {
    let event = match topic {
        Topic::Magazines => {
            let mut magazines: Vec<Magazine> =
                db.list_magazines()?.into_iter().map(Magazine::from).collect();
            sort_magazines(&mut magazines);
            GatewayEvent::MagazinesSnapshot { magazines }
        }
        Topic::Magazine(magazine_id) => GatewayEvent::MagazineSnapshot {
            magazine_id,
            magazine: db.get_magazine(&magazine_id.to_string())?.map(Magazine::from),
        },
        Topic::Comments(magazine_id) => {
            let mut comments: Vec<Comment> = db
                .get_comments(&magazine_id.to_string())?
                .into_iter()
                .map(Comment::from)
                .collect();
            sort_comments(&mut comments);
            GatewayEvent::CommentsSnapshot {
                magazine_id,
                comments,
            }
        }
        Topic::Feedback => {
            let mut feedback: Vec<Feedback> =
                db.get_feedback()?.into_iter().map(Feedback::from).collect();
            sort_feedback(&mut feedback);
            GatewayEvent::FeedbackSnapshot { feedback }
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use folio_db::convert::timestamp;
    use folio_db::models::{CommentRow, NewMagazine};
    use uuid::Uuid;

    #[test]
    fn comments_snapshot_is_ascending() {
        let db = Database::open_in_memory().unwrap();
        let magazine_id = Uuid::new_v4();
        let mid = magazine_id.to_string();
        let t0 = Utc::now();
        db.insert_magazine(&NewMagazine {
            id: &mid,
            title: "Issue 1",
            description: "",
            cover_image_url: "c",
            content: "Hello",
            created_at: &timestamp(t0),
        })
        .unwrap();
        for offset in [3, 1, 2] {
            db.insert_comment(&CommentRow {
                id: Uuid::new_v4().to_string(),
                magazine_id: mid.clone(),
                author_id: Uuid::new_v4().to_string(),
                author_name: "reader".into(),
                body: offset.to_string(),
                created_at: timestamp(t0 + Duration::seconds(offset)),
            })
            .unwrap();
        }

        match load(&db, Topic::Comments(magazine_id)).unwrap() {
            GatewayEvent::CommentsSnapshot { comments, .. } => {
                let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
                assert_eq!(bodies, vec!["1", "2", "3"]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn deleted_magazine_snapshot_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        match load(&db, Topic::Magazine(id)).unwrap() {
            GatewayEvent::MagazineSnapshot {
                magazine_id,
                magazine,
            } => {
                assert_eq!(magazine_id, id);
                assert!(magazine.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
