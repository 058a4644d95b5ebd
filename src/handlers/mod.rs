pub mod ai;
pub mod api;
pub mod auth;
pub mod images;
pub mod posts;
pub mod public;
pub mod tags;
