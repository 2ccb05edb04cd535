//! Domain records mirrored from persistent storage.

use serde::{Deserialize, Serialize};

use crate::domain::fields::ArticleField;

/// A fully materialized article as stored and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: String,
    pub permalink: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author_id: String,
    pub published: bool,
    pub put_top: bool,
    /// Creation time in unix milliseconds.
    pub created: i64,
    /// Last write time in unix milliseconds.
    pub updated: i64,
    /// Sampling coordinate in `[0, 1)`, fixed at creation.
    pub random_double: f64,
    pub view_count: i64,
    pub comment_count: i64,
}

/// Parameters for a new article; id, timestamps and sampling coordinate are
/// assigned on insertion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewArticle {
    pub permalink: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author_id: String,
    pub published: bool,
    pub put_top: bool,
}

/// Lightweight previous/next link built from a projected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleNeighbor {
    pub title: String,
    pub permalink: String,
    pub excerpt: String,
}

impl ArticleNeighbor {
    /// Bumped whenever `FIELDS` changes shape.
    pub const PROJECTION_VERSION: u16 = 1;

    pub const FIELDS: [ArticleField; 3] = [
        ArticleField::Title,
        ArticleField::Permalink,
        ArticleField::Excerpt,
    ];
}

/// Tag to article relation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagArticleRecord {
    pub id: String,
    pub tag_id: String,
    pub article_id: String,
}
