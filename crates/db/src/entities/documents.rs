//! `SeaORM` Entity for documents table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub athlete_id: i32,
    pub document_type: String,
    pub category_id: Option<i32>,
    pub file_name: String,
    /// Remote URL or provider-relative key.
    pub file_url: String,
    pub file_size_bytes: i64,
    pub mime_type: String,
    pub validation_status: String,
    pub validated_by: Option<i32>,
    pub validated_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub uploaded_at: DateTimeWithTimeZone,
    pub expiry_date: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document_categories::Entity",
        from = "Column::CategoryId",
        to = "super::document_categories::Column::Id"
    )]
    DocumentCategories,
    #[sea_orm(has_many = "super::document_versions::Entity")]
    DocumentVersions,
    #[sea_orm(has_many = "super::document_shares::Entity")]
    DocumentShares,
    #[sea_orm(has_many = "super::document_tag_relations::Entity")]
    DocumentTagRelations,
}

impl Related<super::document_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentCategories.def()
    }
}

impl Related<super::document_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentVersions.def()
    }
}

impl Related<super::document_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentShares.def()
    }
}

impl Related<super::document_tag_relations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentTagRelations.def()
    }
}

impl Related<super::document_tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::document_tag_relations::Relation::DocumentTags.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::document_tag_relations::Relation::Documents.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
