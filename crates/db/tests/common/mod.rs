//! Shared fixtures for repository integration tests.
//!
//! Each test gets its own `SQLite` file in a temp dir with the real migrator applied.

#![allow(dead_code)]

use chrono::NaiveDate;
use clubdocs_core::document::{NewCategory, NewDocument, NewTag};
use clubdocs_core::storage::StorageLocation;
use clubdocs_db::migration::{Migrator, MigratorTrait};
use clubdocs_db::CatalogRepository;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

/// Test database handle; the temp dir lives as long as the connection.
pub struct TestDb {
    pub db: DatabaseConnection,
    _dir: TempDir,
}

pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("clubdocs.db").display()
    );

    let mut options = ConnectOptions::new(url);
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    TestDb { db, _dir: dir }
}

pub async fn create_tag(db: &DatabaseConnection, name: &str) -> i32 {
    CatalogRepository::new(db.clone())
        .create_tag(NewTag {
            name: name.to_string(),
            color: None,
        })
        .await
        .expect("Failed to create tag")
        .id
}

pub async fn create_category(db: &DatabaseConnection, name: &str) -> i32 {
    CatalogRepository::new(db.clone())
        .create_category(NewCategory {
            name: name.to_string(),
            description: None,
            color: Some("#3b82f6".to_string()),
        })
        .await
        .expect("Failed to create category")
        .id
}

pub fn new_document(athlete_id: i32, file_name: &str) -> NewDocument {
    NewDocument {
        athlete_id,
        document_type: "medical_certificate".to_string(),
        category_id: None,
        tag_ids: Vec::new(),
        file_name: file_name.to_string(),
        file_location: StorageLocation::Local(format!(
            "documents/athlete_{athlete_id}/{file_name}"
        )),
        file_size_bytes: 1024,
        mime_type: "application/pdf".to_string(),
        expiry_date: None,
        notes: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
