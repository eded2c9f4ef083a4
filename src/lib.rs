//! Persistence schema and bootstrap runner for the scam-report platform.

pub mod app_config;
pub mod bootstrap;
pub mod comments;
pub mod db;
pub mod error;
pub mod migrate;
pub mod orm;
pub mod schema;
pub mod seed;
