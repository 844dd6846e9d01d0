//! Rows as stored. Ids and timestamps stay as text here; `convert` turns
//! them into the wire models.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct NewMagazine<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub cover_image_url: &'a str,
    pub content: &'a str,
    pub created_at: &'a str,
}

pub struct MagazineRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cover_image_url: String,
    pub content: String,
    pub views: i64,
    pub created_at: String,
    /// Filled from magazine_likes, not a column.
    pub likes: Vec<String>,
}

pub struct CommentRow {
    pub id: String,
    pub magazine_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
}

pub struct FeedbackRow {
    pub id: String,
    pub author_id: String,
    pub suggestion: String,
    pub created_at: String,
}

pub struct LayoutRow {
    pub magazine_id: String,
    pub pages: String,
    pub updated_at: String,
}
