//! Typed column names for each stored record.

use crate::domain::entities::{ArticleRecord, TagArticleRecord};
use crate::domain::types::{Entity, FieldName, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleField {
    Id,
    Permalink,
    Title,
    Excerpt,
    Content,
    AuthorId,
    Published,
    PutTop,
    Created,
    Updated,
    RandomDouble,
    ViewCount,
    CommentCount,
}

impl ArticleField {
    pub const ALL: [ArticleField; 13] = [
        ArticleField::Id,
        ArticleField::Permalink,
        ArticleField::Title,
        ArticleField::Excerpt,
        ArticleField::Content,
        ArticleField::AuthorId,
        ArticleField::Published,
        ArticleField::PutTop,
        ArticleField::Created,
        ArticleField::Updated,
        ArticleField::RandomDouble,
        ArticleField::ViewCount,
        ArticleField::CommentCount,
    ];
}

impl FieldName for ArticleField {
    fn column(self) -> &'static str {
        match self {
            ArticleField::Id => "id",
            ArticleField::Permalink => "permalink",
            ArticleField::Title => "title",
            ArticleField::Excerpt => "excerpt",
            ArticleField::Content => "content",
            ArticleField::AuthorId => "author_id",
            ArticleField::Published => "published",
            ArticleField::PutTop => "put_top",
            ArticleField::Created => "created",
            ArticleField::Updated => "updated",
            ArticleField::RandomDouble => "random_double",
            ArticleField::ViewCount => "view_count",
            ArticleField::CommentCount => "comment_count",
        }
    }
}

impl Entity for ArticleRecord {
    type Field = ArticleField;

    fn fields() -> &'static [ArticleField] {
        &ArticleField::ALL
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, field: ArticleField) -> Value {
        match field {
            ArticleField::Id => Value::from(self.id.as_str()),
            ArticleField::Permalink => Value::from(self.permalink.as_str()),
            ArticleField::Title => Value::from(self.title.as_str()),
            ArticleField::Excerpt => Value::from(self.excerpt.as_str()),
            ArticleField::Content => Value::from(self.content.as_str()),
            ArticleField::AuthorId => Value::from(self.author_id.as_str()),
            ArticleField::Published => Value::Bool(self.published),
            ArticleField::PutTop => Value::Bool(self.put_top),
            ArticleField::Created => Value::Int(self.created),
            ArticleField::Updated => Value::Int(self.updated),
            ArticleField::RandomDouble => Value::Float(self.random_double),
            ArticleField::ViewCount => Value::Int(self.view_count),
            ArticleField::CommentCount => Value::Int(self.comment_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagArticleField {
    Id,
    TagId,
    ArticleId,
}

impl TagArticleField {
    pub const ALL: [TagArticleField; 3] = [
        TagArticleField::Id,
        TagArticleField::TagId,
        TagArticleField::ArticleId,
    ];
}

impl FieldName for TagArticleField {
    fn column(self) -> &'static str {
        match self {
            TagArticleField::Id => "id",
            TagArticleField::TagId => "tag_id",
            TagArticleField::ArticleId => "article_id",
        }
    }
}

impl Entity for TagArticleRecord {
    type Field = TagArticleField;

    fn fields() -> &'static [TagArticleField] {
        &TagArticleField::ALL
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, field: TagArticleField) -> Value {
        match field {
            TagArticleField::Id => Value::from(self.id.as_str()),
            TagArticleField::TagId => Value::from(self.tag_id.as_str()),
            TagArticleField::ArticleId => Value::from(self.article_id.as_str()),
        }
    }
}
