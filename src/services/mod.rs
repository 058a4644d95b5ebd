pub mod ai;
pub mod auth;
pub mod autosave;
pub mod media;
pub mod posts;
pub mod sitemap;
pub mod tags;
