pub mod auth;
pub mod grid;
pub mod layout;
pub mod sheets;
pub mod write;
