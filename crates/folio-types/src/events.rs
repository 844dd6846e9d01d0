use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Feedback, Magazine};

/// A live-queryable collection. Subscribers receive the full result set
/// whenever anything in it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Topic {
    /// Every published magazine.
    Magazines,
    /// One magazine document (views, likes).
    Magazine(Uuid),
    /// Comments under one magazine.
    Comments(Uuid),
    /// Reader feedback. Admin only.
    Feedback,
}

impl Topic {
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::Feedback)
    }

    /// Collection path used in logs.
    pub fn path(&self) -> String {
        match self {
            Self::Magazines => "magazines".to_string(),
            Self::Magazine(id) => format!("magazines/{}", id),
            Self::Comments(id) => format!("magazines/{}/comments", id),
            Self::Feedback => "feedback".to_string(),
        }
    }

    /// Topics whose result set changes when the given magazine document does.
    pub fn for_magazine(id: Uuid) -> [Topic; 2] {
        [Self::Magazines, Self::Magazine(id)]
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready {
        user_id: Uuid,
        username: String,
        admin: bool,
    },

    /// Full magazine list, newest first
    MagazinesSnapshot { magazines: Vec<Magazine> },

    /// One magazine; `None` once it has been deleted
    MagazineSnapshot {
        magazine_id: Uuid,
        magazine: Option<Magazine>,
    },

    /// All comments of a magazine, oldest first
    CommentsSnapshot {
        magazine_id: Uuid,
        comments: Vec<Comment>,
    },

    /// All feedback, newest first
    FeedbackSnapshot { feedback: Vec<Feedback> },

    /// A subscription was refused or its snapshot could not be loaded
    SubscriptionError { topic: Topic, message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Start receiving snapshots for these topics
    Subscribe { topics: Vec<Topic> },

    /// Stop receiving snapshots for these topics
    Unsubscribe { topics: Vec<Topic> },
}
