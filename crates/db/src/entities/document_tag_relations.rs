//! `SeaORM` Entity for document_tag_relations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "document_tag_relations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::documents::Entity",
        from = "Column::DocumentId",
        to = "super::documents::Column::Id"
    )]
    Documents,
    #[sea_orm(
        belongs_to = "super::document_tags::Entity",
        from = "Column::TagId",
        to = "super::document_tags::Column::Id"
    )]
    DocumentTags,
}

impl Related<super::documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::document_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
