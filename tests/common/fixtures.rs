//! Row fixtures for comment tests
#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};
use sleuthdb::orm::{admins, review, review_content, url_comment, url_storage, users};

pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        name: Set(username.to_string()),
        password: Set("hashed-password".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_admin(db: &DatabaseConnection, username: &str) -> Result<admins::Model, DbErr> {
    admins::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@sleuth.example.com", username)),
        name: Set(username.to_string()),
        contact_info: Set("support desk".to_string()),
        password: Set("hashed-password".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// A review by `admin` under the seeded "Phishing" scam type.
pub async fn create_test_review(
    db: &DatabaseConnection,
    admin: &admins::Model,
    title: &str,
) -> Result<review::Model, DbErr> {
    let content = review_content::ActiveModel {
        review_content: Set(format!("Details about {}", title)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    review::ActiveModel {
        title: Set(title.to_string()),
        writer_id: Set(admin.admin_id),
        scam_type_id: Set(1),
        review_date: Set(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        review_content_id: Set(content.review_content_id),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_url(db: &DatabaseConnection, url: &str) -> Result<url_storage::Model, DbErr> {
    url_storage::ActiveModel {
        url: Set(url.to_string()),
        search_date: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn rate_url(
    db: &DatabaseConnection,
    url: &url_storage::Model,
    user: &users::Model,
    rating: i32,
) -> Result<url_comment::Model, DbErr> {
    url_comment::ActiveModel {
        url_id: Set(url.url_id),
        writer_id: Set(user.user_id),
        rating: Set(rating),
        comment_content: Set(format!("Rated {}", rating)),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}
