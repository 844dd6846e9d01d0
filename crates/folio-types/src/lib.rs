pub mod api;
pub mod events;
pub mod layout;
pub mod models;
