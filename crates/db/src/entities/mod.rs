//! `SeaORM` entities for the document tables.

pub mod document_categories;
pub mod document_shares;
pub mod document_tag_relations;
pub mod document_tags;
pub mod document_versions;
pub mod documents;
