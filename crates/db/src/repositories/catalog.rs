//! Category and tag reference data.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, QueryOrder, Set};

use super::document::{category_to_domain, store_err, tag_to_domain};
use crate::entities::{document_categories, document_tags};
use clubdocs_core::document::{Category, DocumentError, NewCategory, NewTag, Tag, non_blank};

/// Repository for document categories and tags.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
}

impl CatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, DocumentError> {
        let models = document_categories::Entity::find()
            .order_by_asc(document_categories::Column::Name)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        Ok(models.into_iter().map(category_to_domain).collect())
    }

    /// All tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, DocumentError> {
        let models = document_tags::Entity::find()
            .order_by_asc(document_tags::Column::Name)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        Ok(models.into_iter().map(tag_to_domain).collect())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, or a conflict when the
    /// name is already taken.
    pub async fn create_category(&self, input: NewCategory) -> Result<Category, DocumentError> {
        let name = required_name(&input.name)?;

        let model = document_categories::ActiveModel {
            id: NotSet,
            name: Set(name),
            description: Set(non_blank(input.description)),
            color: Set(non_blank(input.color)),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .map_err(store_err)?;

        Ok(category_to_domain(model))
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, or a conflict when the
    /// name is already taken.
    pub async fn create_tag(&self, input: NewTag) -> Result<Tag, DocumentError> {
        let name = required_name(&input.name)?;

        let model = document_tags::ActiveModel {
            id: NotSet,
            name: Set(name),
            color: Set(non_blank(input.color)),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await
        .map_err(store_err)?;

        Ok(tag_to_domain(model))
    }
}

fn required_name(raw: &str) -> Result<String, DocumentError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DocumentError::validation("name is required"));
    }
    Ok(name.to_string())
}
