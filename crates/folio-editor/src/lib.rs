//! Page editor state for laying out flipbook pages.
//!
//! An [`EditorSession`] owns the page sequence, the selected page and the
//! selected element, plus any transient image objects created while
//! editing. Sessions live in an [`EditorSessions`] registry and are torn
//! down when their owner closes them or, once abandoned, by
//! [`cleanup::run_expiry_loop`].

pub mod cleanup;
pub mod error;
pub mod objects;
pub mod registry;
pub mod session;

pub use error::EditorError;
pub use objects::{TransientObject, TransientObjects};
pub use registry::{EditorSessions, Expired};
pub use session::EditorSession;
