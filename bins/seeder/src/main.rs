//! Reference data seeder for Clubdocs development and testing.
//!
//! Seeds the default document categories and tags. Existing names are skipped,
//! so the seeder can be re-run safely.
//!
//! Usage: cargo run --bin seeder

use std::collections::HashSet;

use clubdocs_core::document::{NewCategory, NewTag};
use clubdocs_db::CatalogRepository;

/// Default categories: name, description, color.
const CATEGORIES: &[(&str, &str, &str)] = &[
    ("Medical", "Medical certificates and health records", "#ef4444"),
    ("Identity", "Passports, ID cards and birth certificates", "#3b82f6"),
    ("Insurance", "Sports and accident insurance policies", "#10b981"),
    ("Licenses", "Federation licenses and registrations", "#f59e0b"),
    ("Consent", "Parental consent and image rights forms", "#8b5cf6"),
];

/// Default tags: name, color.
const TAGS: &[(&str, &str)] = &[
    ("urgent", "#dc2626"),
    ("annual", "#2563eb"),
    ("minor", "#7c3aed"),
    ("competition", "#059669"),
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = clubdocs_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let catalog = CatalogRepository::new(db);

    println!("Seeding document categories...");
    seed_categories(&catalog).await;

    println!("Seeding document tags...");
    seed_tags(&catalog).await;

    println!("Seeding complete!");
}

/// Seeds the default document categories.
async fn seed_categories(catalog: &CatalogRepository) {
    let existing: HashSet<String> = catalog
        .list_categories()
        .await
        .expect("Failed to list categories")
        .into_iter()
        .map(|c| c.name)
        .collect();

    for (name, description, color) in CATEGORIES {
        if existing.contains(*name) {
            println!("  Category {name} already exists, skipping...");
            continue;
        }
        catalog
            .create_category(NewCategory {
                name: (*name).to_string(),
                description: Some((*description).to_string()),
                color: Some((*color).to_string()),
            })
            .await
            .expect("Failed to create category");
        println!("  Created category {name}");
    }
}

/// Seeds the default document tags.
async fn seed_tags(catalog: &CatalogRepository) {
    let existing: HashSet<String> = catalog
        .list_tags()
        .await
        .expect("Failed to list tags")
        .into_iter()
        .map(|t| t.name)
        .collect();

    for (name, color) in TAGS {
        if existing.contains(*name) {
            println!("  Tag {name} already exists, skipping...");
            continue;
        }
        catalog
            .create_tag(NewTag {
                name: (*name).to_string(),
                color: Some((*color).to_string()),
            })
            .await
            .expect("Failed to create tag");
        println!("  Created tag {name}");
    }
}
