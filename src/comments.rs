//! Comment threads and lookup listings, as explicit queries over foreign keys.

use crate::orm::{admins, review, review_comment, scam_type, url_comment, users};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterRole {
    User,
    Admin,
}

impl WriterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriterRole::User => "user",
            WriterRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for WriterRole {
    type Err = CommentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(WriterRole::User),
            "admin" => Ok(WriterRole::Admin),
            other => Err(CommentError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for WriterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a review comment: a user or an admin, by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriterRef {
    pub role: WriterRole,
    pub id: i32,
}

impl WriterRef {
    pub fn user(id: i32) -> Self {
        Self {
            role: WriterRole::User,
            id,
        }
    }

    pub fn admin(id: i32) -> Self {
        Self {
            role: WriterRole::Admin,
            id,
        }
    }
}

impl std::fmt::Display for WriterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

impl review_comment::Model {
    pub fn writer(&self) -> Result<WriterRef, CommentError> {
        Ok(WriterRef {
            role: self.writer_role.parse()?,
            id: self.writer_id,
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewReviewComment {
    pub review_id: i32,
    pub writer: WriterRef,
    /// Comment being replied to; must belong to the same review
    pub root_id: Option<i32>,
    pub content: String,
}

#[derive(Debug)]
pub enum CommentError {
    Database(DbErr),
    EmptyContent,
    ReviewNotFound(i32),
    WriterNotFound(WriterRef),
    RootNotFound(i32),
    /// The root comment exists but belongs to another review
    RootInOtherReview { root_id: i32, review_id: i32 },
    UnknownRole(String),
}

impl std::fmt::Display for CommentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentError::Database(e) => write!(f, "Database error: {}", e),
            CommentError::EmptyContent => write!(f, "Comment is empty"),
            CommentError::ReviewNotFound(id) => write!(f, "Review {} not found", id),
            CommentError::WriterNotFound(writer) => write!(f, "Writer {} not found", writer),
            CommentError::RootNotFound(id) => write!(f, "Root comment {} not found", id),
            CommentError::RootInOtherReview { root_id, review_id } => write!(
                f,
                "Root comment {} does not belong to review {}",
                root_id, review_id
            ),
            CommentError::UnknownRole(role) => write!(f, "Unknown writer role '{}'", role),
        }
    }
}

impl std::error::Error for CommentError {}

impl From<DbErr> for CommentError {
    fn from(e: DbErr) -> Self {
        CommentError::Database(e)
    }
}

/// Top-level and reply comments of a review, oldest first.
pub async fn review_comments<C>(db: &C, review_id: i32) -> Result<Vec<review_comment::Model>, DbErr>
where
    C: ConnectionTrait,
{
    review_comment::Entity::find()
        .filter(review_comment::Column::ReviewId.eq(review_id))
        .order_by_asc(review_comment::Column::CreatedAt)
        .order_by_asc(review_comment::Column::CommentId)
        .all(db)
        .await
}

/// Direct replies to a review comment, oldest first.
pub async fn replies<C>(db: &C, root_id: i32) -> Result<Vec<review_comment::Model>, DbErr>
where
    C: ConnectionTrait,
{
    review_comment::Entity::find()
        .filter(review_comment::Column::RootId.eq(root_id))
        .order_by_asc(review_comment::Column::CreatedAt)
        .order_by_asc(review_comment::Column::CommentId)
        .all(db)
        .await
}

/// Comments on a stored URL, oldest first.
pub async fn url_comments<C>(db: &C, url_id: i32) -> Result<Vec<url_comment::Model>, DbErr>
where
    C: ConnectionTrait,
{
    url_comment::Entity::find()
        .filter(url_comment::Column::UrlId.eq(url_id))
        .order_by_asc(url_comment::Column::CreatedAt)
        .order_by_asc(url_comment::Column::CommentId)
        .all(db)
        .await
}

#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct UrlRating {
    pub average: f64,
    pub count: i64,
}

/// Mean rating of a URL's comments, or `None` if it has none.
pub async fn url_rating<C>(db: &C, url_id: i32) -> Result<Option<UrlRating>, DbErr>
where
    C: ConnectionTrait,
{
    let rating = UrlRating::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"SELECT AVG(rating)::float8 AS average, COUNT(*)::int8 AS count
            FROM url_comment
            WHERE url_id = $1
            HAVING COUNT(*) > 0"#,
        vec![url_id.into()],
    ))
    .one(db)
    .await?;

    Ok(rating)
}

/// All scam types ordered by id.
pub async fn scam_types<C>(db: &C) -> Result<Vec<scam_type::Model>, DbErr>
where
    C: ConnectionTrait,
{
    scam_type::Entity::find()
        .order_by_asc(scam_type::Column::ScamTypeId)
        .all(db)
        .await
}

async fn writer_exists<C>(db: &C, writer: WriterRef) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let found = match writer.role {
        WriterRole::User => users::Entity::find_by_id(writer.id).count(db).await?,
        WriterRole::Admin => admins::Entity::find_by_id(writer.id).count(db).await?,
    };
    Ok(found > 0)
}

/// Validate and insert a review comment.
///
/// The writer must exist in the table chosen by its role, and a root must
/// be an existing comment on the same review.
pub async fn post_review_comment(
    db: &DatabaseConnection,
    new: NewReviewComment,
) -> Result<review_comment::Model, CommentError> {
    let content = new.content.trim();
    if content.is_empty() {
        return Err(CommentError::EmptyContent);
    }

    let txn = db.begin().await?;

    if review::Entity::find_by_id(new.review_id)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(CommentError::ReviewNotFound(new.review_id));
    }

    if !writer_exists(&txn, new.writer).await? {
        return Err(CommentError::WriterNotFound(new.writer));
    }

    if let Some(root_id) = new.root_id {
        let root = review_comment::Entity::find_by_id(root_id)
            .one(&txn)
            .await?
            .ok_or(CommentError::RootNotFound(root_id))?;
        if root.review_id != new.review_id {
            return Err(CommentError::RootInOtherReview {
                root_id,
                review_id: new.review_id,
            });
        }
    }

    let comment = review_comment::ActiveModel {
        root_id: Set(new.root_id),
        review_id: Set(new.review_id),
        writer_id: Set(new.writer.id),
        writer_role: Set(new.writer.role.as_str().to_string()),
        comment_content: Set(content.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    log::debug!(
        "Comment {} posted on review {} by {}",
        comment.comment_id,
        comment.review_id,
        new.writer
    );
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::WRITER_ROLES;

    #[test]
    fn test_roles_match_check_constraint() {
        for role in [WriterRole::User, WriterRole::Admin] {
            assert!(WRITER_ROLES.contains(&role.as_str()));
            assert_eq!(role.as_str().parse::<WriterRole>().unwrap(), role);
        }
        assert_eq!(WRITER_ROLES.len(), 2);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(matches!(
            "moderator".parse::<WriterRole>(),
            Err(CommentError::UnknownRole(r)) if r == "moderator"
        ));
    }

    #[test]
    fn test_writer_from_row() {
        let row = review_comment::Model {
            comment_id: 7,
            root_id: None,
            review_id: 1,
            writer_id: 3,
            writer_role: "admin".to_string(),
            comment_content: "Confirmed, same sender".to_string(),
            created_at: Utc::now().naive_utc(),
        };
        assert_eq!(row.writer().unwrap(), WriterRef::admin(3));
        assert_eq!(row.writer().unwrap().to_string(), "admin 3");
    }

    #[test]
    fn test_writer_ref_serializes_as_tagged_pair() {
        let json = serde_json::to_string(&WriterRef::user(5)).unwrap();
        assert_eq!(json, r#"{"role":"user","id":5}"#);
    }
}
