use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum EditorError {
    #[error("element {0} is not on the selected page")]
    ElementNotFound(Uuid),

    #[error("page {index} does not exist (the magazine has {len} pages)")]
    PageOutOfRange { index: usize, len: usize },

    #[error("image upload is empty")]
    EmptyImage,

    #[error("image elements have no {0}")]
    StyleNotApplicable(&'static str),

    #[error("editor session {0} not found")]
    SessionNotFound(Uuid),

    #[error("editor session {0} belongs to another admin")]
    NotOwner(Uuid),
}

pub type Result<T> = std::result::Result<T, EditorError>;
