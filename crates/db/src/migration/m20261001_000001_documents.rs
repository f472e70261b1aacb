//! Document management schema.
//!
//! Built with the schema builder so the same migration runs on `PostgreSQL`
//! and `SQLite`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum DocumentCategories {
    Table,
    Id,
    Name,
    Description,
    Color,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DocumentTags {
    Table,
    Id,
    Name,
    Color,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    AthleteId,
    DocumentType,
    CategoryId,
    FileName,
    FileUrl,
    FileSizeBytes,
    MimeType,
    ValidationStatus,
    ValidatedBy,
    ValidatedAt,
    RejectionReason,
    UploadedAt,
    ExpiryDate,
    Notes,
}

#[derive(DeriveIden)]
enum DocumentTagRelations {
    Table,
    DocumentId,
    TagId,
}

#[derive(DeriveIden)]
enum DocumentVersions {
    Table,
    Id,
    DocumentId,
    VersionNumber,
    FileName,
    FileUrl,
    FileSizeBytes,
    MimeType,
    Notes,
    UploadedBy,
    UploadedAt,
}

#[derive(DeriveIden)]
enum DocumentShares {
    Table,
    Id,
    DocumentId,
    SharedBy,
    SharedWith,
    PermissionLevel,
    Notes,
    SharedAt,
    ExpiresAt,
}

fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn created_now<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentCategories::Table)
                    .if_not_exists()
                    .col(id_column(DocumentCategories::Id))
                    .col(
                        ColumnDef::new(DocumentCategories::Name)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DocumentCategories::Description).text())
                    .col(ColumnDef::new(DocumentCategories::Color).string_len(20))
                    .col(created_now(DocumentCategories::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentTags::Table)
                    .if_not_exists()
                    .col(id_column(DocumentTags::Id))
                    .col(
                        ColumnDef::new(DocumentTags::Name)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DocumentTags::Color).string_len(20))
                    .col(created_now(DocumentTags::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(id_column(Documents::Id))
                    .col(ColumnDef::new(Documents::AthleteId).integer().not_null())
                    .col(
                        ColumnDef::new(Documents::DocumentType)
                            .string_len(100)
                            .not_null()
                            .default("other"),
                    )
                    .col(ColumnDef::new(Documents::CategoryId).integer())
                    .col(ColumnDef::new(Documents::FileName).string_len(255).not_null())
                    .col(ColumnDef::new(Documents::FileUrl).text().not_null())
                    .col(
                        ColumnDef::new(Documents::FileSizeBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Documents::MimeType).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Documents::ValidationStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Documents::ValidatedBy).integer())
                    .col(ColumnDef::new(Documents::ValidatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Documents::RejectionReason).text())
                    .col(created_now(Documents::UploadedAt))
                    .col(ColumnDef::new(Documents::ExpiryDate).date())
                    .col(ColumnDef::new(Documents::Notes).text())
                    .check(
                        Expr::col(Documents::ValidationStatus)
                            .is_in(["pending", "approved", "rejected"]),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_category")
                            .from(Documents::Table, Documents::CategoryId)
                            .to(DocumentCategories::Table, DocumentCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentTagRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentTagRelations::DocumentId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DocumentTagRelations::TagId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(DocumentTagRelations::DocumentId)
                            .col(DocumentTagRelations::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tag_relations_document")
                            .from(DocumentTagRelations::Table, DocumentTagRelations::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tag_relations_tag")
                            .from(DocumentTagRelations::Table, DocumentTagRelations::TagId)
                            .to(DocumentTags::Table, DocumentTags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentVersions::Table)
                    .if_not_exists()
                    .col(id_column(DocumentVersions::Id))
                    .col(ColumnDef::new(DocumentVersions::DocumentId).integer().not_null())
                    .col(
                        ColumnDef::new(DocumentVersions::VersionNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DocumentVersions::FileName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DocumentVersions::FileUrl).text().not_null())
                    .col(
                        ColumnDef::new(DocumentVersions::FileSizeBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DocumentVersions::MimeType)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DocumentVersions::Notes).text())
                    .col(ColumnDef::new(DocumentVersions::UploadedBy).integer())
                    .col(created_now(DocumentVersions::UploadedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_versions_document")
                            .from(DocumentVersions::Table, DocumentVersions::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentShares::Table)
                    .if_not_exists()
                    .col(id_column(DocumentShares::Id))
                    .col(ColumnDef::new(DocumentShares::DocumentId).integer().not_null())
                    .col(ColumnDef::new(DocumentShares::SharedBy).integer().not_null())
                    .col(ColumnDef::new(DocumentShares::SharedWith).integer().not_null())
                    .col(
                        ColumnDef::new(DocumentShares::PermissionLevel)
                            .string_len(20)
                            .not_null()
                            .default("view"),
                    )
                    .col(ColumnDef::new(DocumentShares::Notes).text())
                    .col(created_now(DocumentShares::SharedAt))
                    .col(ColumnDef::new(DocumentShares::ExpiresAt).timestamp_with_time_zone())
                    .check(
                        Expr::col(DocumentShares::PermissionLevel)
                            .is_in(["view", "edit", "manage"]),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_document_shares_document")
                            .from(DocumentShares::Table, DocumentShares::DocumentId)
                            .to(Documents::Table, Documents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Version numbers are unique per document; concurrent appends retry on conflict.
        manager
            .create_index(
                Index::create()
                    .name("uq_document_versions_number")
                    .table(DocumentVersions::Table)
                    .col(DocumentVersions::DocumentId)
                    .col(DocumentVersions::VersionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One share per (document, grantee); re-sharing upserts.
        manager
            .create_index(
                Index::create()
                    .name("uq_document_shares_grantee")
                    .table(DocumentShares::Table)
                    .col(DocumentShares::DocumentId)
                    .col(DocumentShares::SharedWith)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_athlete")
                    .table(Documents::Table)
                    .col(Documents::AthleteId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_status")
                    .table(Documents::Table)
                    .col(Documents::ValidationStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_expiry")
                    .table(Documents::Table)
                    .col(Documents::ExpiryDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_document_shares_shared_with")
                    .table(DocumentShares::Table)
                    .col(DocumentShares::SharedWith)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentShares::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DocumentVersions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(DocumentTagRelations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Documents::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DocumentTags::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(DocumentCategories::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
