//! Document repository for database operations.
//!
//! Implements the document store using `SeaORM`. Loaded documents always
//! carry their category and tags, fetched in one batched query per page.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, NullOrdering, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, NotSet, Order, QueryFilter, QueryOrder, QuerySelect, SelectTwo, Set, SqlErr,
    TransactionTrait,
};

use crate::entities::{
    document_categories, document_shares, document_tag_relations, document_tags,
    document_versions, documents,
};
use clubdocs_core::document::{
    Category, Document, DocumentError, DocumentRepository as DocumentRepoTrait, DocumentShare,
    DocumentVersion, LIKE_ESCAPE, NewDocument, NewShare, NewVersion, PermissionLevel, Review,
    ReviewAction, ReviewService, SearchFilters, SharedDocument, SortOrder, Tag, ValidationStatus,
};
use clubdocs_core::storage::StorageLocation;

const REVIEW_ATTEMPTS: u32 = 2;

/// Document repository implementation.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
    version_retry_attempts: u32,
}

impl DocumentRepository {
    /// Create a new document repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            version_retry_attempts: 3,
        }
    }

    /// Set how many times a version insert is retried after a number clash.
    #[must_use]
    pub fn with_version_retry_attempts(mut self, attempts: u32) -> Self {
        self.version_retry_attempts = attempts.max(1);
        self
    }

    fn select() -> SelectTwo<documents::Entity, document_categories::Entity> {
        documents::Entity::find().find_also_related(document_categories::Entity)
    }

    async fn load_all(
        &self,
        query: SelectTwo<documents::Entity, document_categories::Entity>,
    ) -> Result<Vec<Document>, DocumentError> {
        let rows = query.all(&self.db).await.map_err(store_err)?;
        hydrate(&self.db, rows).await
    }

    async fn review<F>(&self, id: i32, decide: F) -> Result<Document, DocumentError>
    where
        F: Fn(ValidationStatus) -> Result<ReviewAction, DocumentError> + Send,
    {
        let observed = self.current_status(id).await?;
        self.review_from(id, observed, decide).await
    }

    /// Apply a review decision, starting from the status the caller last saw.
    ///
    /// The update only lands if the row still holds that status. When another
    /// reviewer got there first, the decision is re-checked against the new
    /// status and applied once more.
    async fn review_from<F>(
        &self,
        id: i32,
        mut observed: ValidationStatus,
        decide: F,
    ) -> Result<Document, DocumentError>
    where
        F: Fn(ValidationStatus) -> Result<ReviewAction, DocumentError> + Send,
    {
        for attempt in 1..=REVIEW_ATTEMPTS {
            let action = decide(observed)?;
            if self.apply_review(id, observed, &action).await? {
                tracing::info!(
                    document_id = id,
                    admin_id = action.review.by,
                    from = %observed,
                    to = %action.new_status,
                    "Document reviewed"
                );
                return self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DocumentError::document_not_found(id));
            }

            tracing::debug!(document_id = id, attempt, "Review raced, re-reading status");
            observed = self.current_status(id).await?;
        }

        Err(DocumentError::conflict(format!(
            "document {id} was reviewed concurrently, retry the request"
        )))
    }

    async fn current_status(&self, id: i32) -> Result<ValidationStatus, DocumentError> {
        let current = documents::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(store_err)?
            .ok_or_else(|| DocumentError::document_not_found(id))?;
        parse_status(&current.validation_status)
    }

    /// Conditional update; false when the row no longer holds `from`.
    async fn apply_review(
        &self,
        id: i32,
        from: ValidationStatus,
        action: &ReviewAction,
    ) -> Result<bool, DocumentError> {
        let result = documents::Entity::update_many()
            .col_expr(
                documents::Column::ValidationStatus,
                Expr::value(action.new_status.as_str()),
            )
            .col_expr(documents::Column::ValidatedBy, Expr::value(action.review.by))
            .col_expr(
                documents::Column::ValidatedAt,
                Expr::value(action.review.at.fixed_offset()),
            )
            .col_expr(
                documents::Column::RejectionReason,
                Expr::value(action.rejection_reason.clone()),
            )
            .filter(documents::Column::Id.eq(id))
            .filter(documents::Column::ValidationStatus.eq(from.as_str()))
            .exec(&self.db)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn share_by_key(
        &self,
        document_id: i32,
        user_id: i32,
    ) -> Result<DocumentShare, DocumentError> {
        let model = document_shares::Entity::find()
            .filter(document_shares::Column::DocumentId.eq(document_id))
            .filter(document_shares::Column::SharedWith.eq(user_id))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .ok_or(DocumentError::NotFound {
                entity: "share",
                id: user_id,
            })?;
        share_to_domain(model)
    }
}

impl DocumentRepoTrait for DocumentRepository {
    async fn create(&self, input: NewDocument) -> Result<Document, DocumentError> {
        let txn = self.db.begin().await.map_err(store_err)?;

        let model = documents::ActiveModel {
            id: NotSet,
            athlete_id: Set(input.athlete_id),
            document_type: Set(input.document_type),
            category_id: Set(input.category_id),
            file_name: Set(input.file_name),
            file_url: Set(input.file_location.as_str().to_string()),
            file_size_bytes: Set(input.file_size_bytes),
            mime_type: Set(input.mime_type),
            validation_status: Set(ValidationStatus::Pending.as_str().to_string()),
            validated_by: Set(None),
            validated_at: Set(None),
            rejection_reason: Set(None),
            uploaded_at: Set(Utc::now().fixed_offset()),
            expiry_date: Set(input.expiry_date),
            notes: Set(input.notes),
        }
        .insert(&txn)
        .await
        .map_err(store_err)?;

        let mut tag_ids = input.tag_ids;
        tag_ids.sort_unstable();
        tag_ids.dedup();
        if !tag_ids.is_empty() {
            let relations = tag_ids
                .into_iter()
                .map(|tag_id| document_tag_relations::ActiveModel {
                    document_id: Set(model.id),
                    tag_id: Set(tag_id),
                });
            document_tag_relations::Entity::insert_many(relations)
                .exec_without_returning(&txn)
                .await
                .map_err(store_err)?;
        }

        txn.commit().await.map_err(store_err)?;

        self.find_by_id(model.id)
            .await?
            .ok_or_else(|| DocumentError::document_not_found(model.id))
    }

    async fn create_version(&self, input: NewVersion) -> Result<DocumentVersion, DocumentError> {
        let exists = documents::Entity::find_by_id(input.document_id)
            .one(&self.db)
            .await
            .map_err(store_err)?;
        if exists.is_none() {
            return Err(DocumentError::document_not_found(input.document_id));
        }

        let attempts = self.version_retry_attempts.max(1);
        for attempt in 1..=attempts {
            let latest: Option<i32> = document_versions::Entity::find()
                .select_only()
                .column_as(document_versions::Column::VersionNumber.max(), "latest")
                .filter(document_versions::Column::DocumentId.eq(input.document_id))
                .into_tuple::<Option<i32>>()
                .one(&self.db)
                .await
                .map_err(store_err)?
                .flatten();

            let model = document_versions::ActiveModel {
                id: NotSet,
                document_id: Set(input.document_id),
                version_number: Set(latest.unwrap_or(0) + 1),
                file_name: Set(input.file_name.clone()),
                file_url: Set(input.file_location.as_str().to_string()),
                file_size_bytes: Set(input.file_size_bytes),
                mime_type: Set(input.mime_type.clone()),
                notes: Set(input.notes.clone()),
                uploaded_by: Set(input.uploaded_by),
                uploaded_at: Set(Utc::now().fixed_offset()),
            };

            match model.insert(&self.db).await {
                Ok(saved) => return Ok(version_to_domain(saved)),
                Err(err) if attempt < attempts && is_unique_violation(&err) => {
                    tracing::debug!(
                        document_id = input.document_id,
                        attempt,
                        "Version number taken, retrying"
                    );
                }
                Err(err) => return Err(store_err(err)),
            }
        }

        Err(DocumentError::store(format!(
            "could not allocate a version number for document {} after {attempts} attempts",
            input.document_id
        )))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Document>, DocumentError> {
        let docs = self
            .load_all(Self::select().filter(documents::Column::Id.eq(id)))
            .await?;
        Ok(docs.into_iter().next())
    }

    async fn list_by_athlete(&self, athlete_id: i32) -> Result<Vec<Document>, DocumentError> {
        self.load_all(
            Self::select()
                .filter(documents::Column::AthleteId.eq(athlete_id))
                .order_by_desc(documents::Column::UploadedAt)
                .order_by_desc(documents::Column::Id),
        )
        .await
    }

    async fn list_pending(&self) -> Result<Vec<Document>, DocumentError> {
        self.load_all(
            Self::select()
                .filter(documents::Column::ValidationStatus.eq(ValidationStatus::Pending.as_str()))
                .order_by_asc(documents::Column::UploadedAt)
                .order_by_asc(documents::Column::Id),
        )
        .await
    }

    async fn list_expiring(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Document>, DocumentError> {
        self.load_all(
            Self::select()
                .filter(documents::Column::ExpiryDate.gte(from))
                .filter(documents::Column::ExpiryDate.lte(until))
                .order_by_asc(documents::Column::ExpiryDate)
                .order_by_asc(documents::Column::Id),
        )
        .await
    }

    async fn list_expired(&self, today: NaiveDate) -> Result<Vec<Document>, DocumentError> {
        self.load_all(
            Self::select()
                .filter(documents::Column::ExpiryDate.lt(today))
                .order_by_asc(documents::Column::ExpiryDate)
                .order_by_asc(documents::Column::Id),
        )
        .await
    }

    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Document>, DocumentError> {
        let mut query = Self::select().filter(search_condition(filters));
        query = ordered(query, filters.sort);
        if let Some(limit) = filters.limit {
            query = query.limit(limit);
        }
        self.load_all(query).await
    }

    async fn validate(&self, id: i32, admin_id: i32) -> Result<Document, DocumentError> {
        self.review(id, |current| ReviewService::approve(current, admin_id)).await
    }

    async fn reject(
        &self,
        id: i32,
        admin_id: i32,
        reason: &str,
    ) -> Result<Document, DocumentError> {
        self.review(id, |current| ReviewService::reject(current, admin_id, reason)).await
    }

    async fn delete(&self, id: i32) -> Result<(), DocumentError> {
        let shares = document_shares::Entity::delete_many()
            .filter(document_shares::Column::DocumentId.eq(id))
            .exec(&self.db)
            .await;
        let versions = document_versions::Entity::delete_many()
            .filter(document_versions::Column::DocumentId.eq(id))
            .exec(&self.db)
            .await;
        let tags = document_tag_relations::Entity::delete_many()
            .filter(document_tag_relations::Column::DocumentId.eq(id))
            .exec(&self.db)
            .await;
        for (relation, outcome) in [("shares", shares), ("versions", versions), ("tags", tags)] {
            if let Err(err) = outcome {
                tracing::warn!(document_id = id, relation, error = %err, "Relation cleanup failed");
            }
        }

        let result = documents::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(store_err)?;

        if result.rows_affected == 0 {
            return Err(DocumentError::document_not_found(id));
        }

        Ok(())
    }

    async fn list_versions(&self, document_id: i32) -> Result<Vec<DocumentVersion>, DocumentError> {
        let models = document_versions::Entity::find()
            .filter(document_versions::Column::DocumentId.eq(document_id))
            .order_by_desc(document_versions::Column::VersionNumber)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        Ok(models.into_iter().map(version_to_domain).collect())
    }

    async fn share(&self, input: NewShare) -> Result<DocumentShare, DocumentError> {
        let model = document_shares::ActiveModel {
            id: NotSet,
            document_id: Set(input.document_id),
            shared_by: Set(input.shared_by),
            shared_with: Set(input.shared_with),
            permission_level: Set(input.permission_level.as_str().to_string()),
            notes: Set(input.notes),
            shared_at: Set(Utc::now().fixed_offset()),
            expires_at: Set(input.expires_at.map(|at| at.fixed_offset())),
        };

        document_shares::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    document_shares::Column::DocumentId,
                    document_shares::Column::SharedWith,
                ])
                .update_columns([
                    document_shares::Column::PermissionLevel,
                    document_shares::Column::Notes,
                    document_shares::Column::ExpiresAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(store_err)?;

        self.share_by_key(input.document_id, input.shared_with)
            .await
    }

    async fn unshare(&self, document_id: i32, user_id: i32) -> Result<bool, DocumentError> {
        let result = document_shares::Entity::delete_many()
            .filter(document_shares::Column::DocumentId.eq(document_id))
            .filter(document_shares::Column::SharedWith.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(store_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_shares(&self, document_id: i32) -> Result<Vec<DocumentShare>, DocumentError> {
        let models = document_shares::Entity::find()
            .filter(document_shares::Column::DocumentId.eq(document_id))
            .order_by_desc(document_shares::Column::SharedAt)
            .order_by_desc(document_shares::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        models.into_iter().map(share_to_domain).collect()
    }

    async fn list_shared_with(&self, user_id: i32) -> Result<Vec<SharedDocument>, DocumentError> {
        let shares = document_shares::Entity::find()
            .filter(document_shares::Column::SharedWith.eq(user_id))
            .order_by_desc(document_shares::Column::SharedAt)
            .order_by_desc(document_shares::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_err)?;

        if shares.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = shares.iter().map(|s| s.document_id).collect();
        let mut by_id: HashMap<i32, Document> = self
            .load_all(Self::select().filter(documents::Column::Id.is_in(ids)))
            .await?
            .into_iter()
            .map(|doc| (doc.id, doc))
            .collect();

        let mut shared = Vec::with_capacity(shares.len());
        for model in shares {
            // A document can carry at most one share per grantee.
            if let Some(document) = by_id.remove(&model.document_id) {
                shared.push(SharedDocument {
                    share: share_to_domain(model)?,
                    document,
                });
            }
        }
        Ok(shared)
    }
}

/// Map a database error, keeping constraint messages as caller-visible errors.
pub(crate) fn store_err(err: DbErr) -> DocumentError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => DocumentError::Constraint(msg),
        Some(SqlErr::UniqueConstraintViolation(msg)) => DocumentError::conflict(msg),
        _ => DocumentError::store(err.to_string()),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn search_condition(filters: &SearchFilters) -> Condition {
    let mut condition = Condition::all();

    if let Some(athlete_id) = filters.athlete_id {
        condition = condition.add(documents::Column::AthleteId.eq(athlete_id));
    }
    if let Some(document_type) = &filters.document_type {
        condition = condition.add(documents::Column::DocumentType.eq(document_type.as_str()));
    }
    if let Some(category_id) = filters.category_id {
        condition = condition.add(documents::Column::CategoryId.eq(category_id));
    }
    if let Some(status) = filters.status {
        condition = condition.add(documents::Column::ValidationStatus.eq(status.as_str()));
    }
    if let Some(pattern) = filters.like_pattern() {
        let lower_like = |column: documents::Column| {
            Expr::expr(Func::lower(Expr::col((documents::Entity, column))))
                .like(LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE))
        };
        condition = condition.add(
            Condition::any()
                .add(lower_like(documents::Column::FileName))
                .add(lower_like(documents::Column::Notes)),
        );
    }
    if !filters.tag_ids.is_empty() {
        condition = condition.add(
            documents::Column::Id.in_subquery(
                Query::select()
                    .column(document_tag_relations::Column::DocumentId)
                    .from(document_tag_relations::Entity)
                    .and_where(document_tag_relations::Column::TagId.is_in(filters.tag_ids.clone()))
                    .to_owned(),
            ),
        );
    }

    condition
}

fn ordered<Q: QueryOrder>(query: Q, sort: SortOrder) -> Q {
    let query = match sort {
        SortOrder::NameAsc => query.order_by_asc(documents::Column::FileName),
        SortOrder::NameDesc => query.order_by_desc(documents::Column::FileName),
        SortOrder::DateAsc => query.order_by_asc(documents::Column::UploadedAt),
        SortOrder::DateDesc => query.order_by_desc(documents::Column::UploadedAt),
        SortOrder::ExpiryAsc => {
            query.order_by_with_nulls(documents::Column::ExpiryDate, Order::Asc, NullOrdering::Last)
        }
        SortOrder::ExpiryDesc => query.order_by_with_nulls(
            documents::Column::ExpiryDate,
            Order::Desc,
            NullOrdering::Last,
        ),
    };
    match sort {
        SortOrder::NameDesc | SortOrder::DateDesc | SortOrder::ExpiryDesc => {
            query.order_by_desc(documents::Column::Id)
        }
        _ => query.order_by_asc(documents::Column::Id),
    }
}

async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<(documents::Model, Option<document_categories::Model>)>,
) -> Result<Vec<Document>, DocumentError> {
    let mut tags_by_document: HashMap<i32, Vec<Tag>> = HashMap::new();

    if !rows.is_empty() {
        let ids: Vec<i32> = rows.iter().map(|(doc, _)| doc.id).collect();
        let pairs = document_tag_relations::Entity::find()
            .filter(document_tag_relations::Column::DocumentId.is_in(ids))
            .find_also_related(document_tags::Entity)
            .order_by_asc(document_tags::Column::Name)
            .all(conn)
            .await
            .map_err(store_err)?;

        for (relation, tag) in pairs {
            if let Some(tag) = tag {
                tags_by_document
                    .entry(relation.document_id)
                    .or_default()
                    .push(tag_to_domain(tag));
            }
        }
    }

    rows.into_iter()
        .map(|(doc, category)| {
            let tags = tags_by_document.remove(&doc.id).unwrap_or_default();
            to_domain(doc, category, tags)
        })
        .collect()
}

fn parse_status(raw: &str) -> Result<ValidationStatus, DocumentError> {
    ValidationStatus::parse(raw)
        .ok_or_else(|| DocumentError::store(format!("unknown validation status '{raw}'")))
}

fn to_domain(
    model: documents::Model,
    category: Option<document_categories::Model>,
    tags: Vec<Tag>,
) -> Result<Document, DocumentError> {
    let review = model
        .validated_by
        .zip(model.validated_at)
        .map(|(by, at)| Review {
            by,
            at: at.with_timezone(&Utc),
        });

    Ok(Document {
        id: model.id,
        athlete_id: model.athlete_id,
        document_type: model.document_type,
        category_id: model.category_id,
        category: category.map(category_to_domain),
        file_name: model.file_name,
        file_location: StorageLocation::parse(&model.file_url),
        file_size_bytes: model.file_size_bytes,
        mime_type: model.mime_type,
        validation_status: parse_status(&model.validation_status)?,
        review,
        rejection_reason: model.rejection_reason,
        uploaded_at: model.uploaded_at.with_timezone(&Utc),
        expiry_date: model.expiry_date,
        notes: model.notes,
        tags,
    })
}

pub(crate) fn category_to_domain(model: document_categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        color: model.color,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn tag_to_domain(model: document_tags::Model) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
        color: model.color,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn version_to_domain(model: document_versions::Model) -> DocumentVersion {
    DocumentVersion {
        id: model.id,
        document_id: model.document_id,
        version_number: model.version_number,
        file_name: model.file_name,
        file_location: StorageLocation::parse(&model.file_url),
        file_size_bytes: model.file_size_bytes,
        mime_type: model.mime_type,
        notes: model.notes,
        uploaded_by: model.uploaded_by,
        uploaded_at: model.uploaded_at.with_timezone(&Utc),
    }
}

fn share_to_domain(model: document_shares::Model) -> Result<DocumentShare, DocumentError> {
    let permission_level = model
        .permission_level
        .parse::<PermissionLevel>()
        .map_err(|_| {
            DocumentError::store(format!(
                "unknown permission level '{}'",
                model.permission_level
            ))
        })?;

    Ok(DocumentShare {
        id: model.id,
        document_id: model.document_id,
        shared_by: model.shared_by,
        shared_with: model.shared_with,
        permission_level,
        notes: model.notes,
        shared_at: model.shared_at.with_timezone(&Utc),
        expires_at: model.expires_at.map(|at| at.with_timezone(&Utc)),
    })
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod document_tests;
