//! `SeaORM` Entity for document_tags table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "document_tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::document_tag_relations::Entity")]
    DocumentTagRelations,
}

impl Related<super::document_tag_relations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentTagRelations.def()
    }
}

impl Related<super::documents::Entity> for Entity {
    fn to() -> RelationDef {
        super::document_tag_relations::Relation::Documents.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::document_tag_relations::Relation::DocumentTags.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
