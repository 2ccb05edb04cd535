//! Repositories and the query model they are built on.

pub mod articles;
pub mod error;
pub mod query;
pub mod repos;
pub mod tag_articles;
