//! SeaORM entities, one per table in the schema registry.
//!
//! These give typed row access to the application queries. Navigation
//! between entities goes through explicit `Related` joins and filters on
//! foreign key columns.

pub mod admin_review;
pub mod admins;
pub mod conversation;
pub mod report;
pub mod report_media;
pub mod review;
pub mod review_banner;
pub mod review_comment;
pub mod review_content;
pub mod review_content_media;
pub mod review_tag;
pub mod scam_type;
pub mod schema_migrations;
pub mod tag;
pub mod url_comment;
pub mod url_storage;
pub mod user_report;
pub mod users;
