pub mod ai;
pub mod posts;
pub mod query;
pub mod response;
pub mod tags;
pub mod users;
