//! Service and orchestrator tests against in-memory collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, NaiveDate, Utc};
use clubdocs_shared::config::DocumentSettings;

use super::*;
use crate::storage::{ObjectStore, ObjectUpload, StorageError, StorageLocation};

#[derive(Default)]
struct State {
    next_id: i32,
    documents: HashMap<i32, Document>,
    versions: Vec<DocumentVersion>,
    shares: Vec<DocumentShare>,
}

/// In-memory repository. `fail_create` makes inserts fail like a broken FK.
#[derive(Default)]
struct MockRepo {
    state: Mutex<State>,
    fail_create_for: HashSet<i32>,
}

impl MockRepo {
    fn failing_for(athletes: &[i32]) -> Self {
        Self {
            fail_create_for: athletes.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn next_id(state: &mut State) -> i32 {
        state.next_id += 1;
        state.next_id
    }

    fn review(
        &self,
        id: i32,
        decide: impl FnOnce(ValidationStatus) -> Result<ReviewAction, DocumentError>,
    ) -> Result<Document, DocumentError> {
        let mut state = self.state.lock().unwrap();
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| DocumentError::document_not_found(id))?;
        let action = decide(doc.validation_status)?;
        doc.validation_status = action.new_status;
        doc.review = Some(action.review);
        doc.rejection_reason = action.rejection_reason;
        Ok(doc.clone())
    }
}

impl DocumentRepository for MockRepo {
    async fn create(&self, input: NewDocument) -> Result<Document, DocumentError> {
        if self.fail_create_for.contains(&input.athlete_id) {
            return Err(DocumentError::store("FOREIGN KEY constraint failed"));
        }
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        let doc = Document {
            id,
            athlete_id: input.athlete_id,
            document_type: input.document_type,
            category_id: input.category_id,
            category: None,
            file_name: input.file_name,
            file_location: input.file_location,
            file_size_bytes: input.file_size_bytes,
            mime_type: input.mime_type,
            validation_status: ValidationStatus::Pending,
            review: None,
            rejection_reason: None,
            uploaded_at: Utc::now(),
            expiry_date: input.expiry_date,
            notes: input.notes,
            tags: input
                .tag_ids
                .iter()
                .map(|&tag_id| Tag {
                    id: tag_id,
                    name: format!("tag-{tag_id}"),
                    color: None,
                    created_at: Utc::now(),
                })
                .collect(),
        };
        state.documents.insert(id, doc.clone());
        Ok(doc)
    }

    async fn create_version(&self, input: NewVersion) -> Result<DocumentVersion, DocumentError> {
        let mut state = self.state.lock().unwrap();
        let next = state
            .versions
            .iter()
            .filter(|v| v.document_id == input.document_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        let id = Self::next_id(&mut state);
        let version = DocumentVersion {
            id,
            document_id: input.document_id,
            version_number: next,
            file_name: input.file_name,
            file_location: input.file_location,
            file_size_bytes: input.file_size_bytes,
            mime_type: input.mime_type,
            notes: input.notes,
            uploaded_by: input.uploaded_by,
            uploaded_at: Utc::now(),
        };
        state.versions.push(version.clone());
        Ok(version)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Document>, DocumentError> {
        Ok(self.state.lock().unwrap().documents.get(&id).cloned())
    }

    async fn list_by_athlete(&self, athlete_id: i32) -> Result<Vec<Document>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .documents
            .values()
            .filter(|d| d.athlete_id == athlete_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(docs)
    }

    async fn list_pending(&self) -> Result<Vec<Document>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .documents
            .values()
            .filter(|d| d.validation_status == ValidationStatus::Pending)
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.id);
        Ok(docs)
    }

    async fn list_expiring(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Document>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .documents
            .values()
            .filter(|d| d.expiry_date.is_some_and(|e| e >= from && e <= until))
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.expiry_date);
        Ok(docs)
    }

    async fn list_expired(&self, today: NaiveDate) -> Result<Vec<Document>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .documents
            .values()
            .filter(|d| d.expiry_date.is_some_and(|e| e < today))
            .cloned()
            .collect();
        docs.sort_by_key(|d| d.expiry_date);
        Ok(docs)
    }

    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Document>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<_> = state
            .documents
            .values()
            .filter(|d| filters.matches(d))
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(docs)
    }

    async fn validate(&self, id: i32, admin_id: i32) -> Result<Document, DocumentError> {
        self.review(id, |current| ReviewService::approve(current, admin_id))
    }

    async fn reject(
        &self,
        id: i32,
        admin_id: i32,
        reason: &str,
    ) -> Result<Document, DocumentError> {
        self.review(id, |current| ReviewService::reject(current, admin_id, reason))
    }

    async fn delete(&self, id: i32) -> Result<(), DocumentError> {
        let mut state = self.state.lock().unwrap();
        state.shares.retain(|s| s.document_id != id);
        state.versions.retain(|v| v.document_id != id);
        state
            .documents
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DocumentError::document_not_found(id))
    }

    async fn list_versions(&self, document_id: i32) -> Result<Vec<DocumentVersion>, DocumentError> {
        let state = self.state.lock().unwrap();
        let mut versions: Vec<_> = state
            .versions
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn share(&self, input: NewShare) -> Result<DocumentShare, DocumentError> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .shares
            .iter_mut()
            .find(|s| s.document_id == input.document_id && s.shared_with == input.shared_with)
        {
            existing.permission_level = input.permission_level;
            existing.notes = input.notes;
            existing.expires_at = input.expires_at;
            return Ok(existing.clone());
        }
        let id = Self::next_id(&mut state);
        let share = DocumentShare {
            id,
            document_id: input.document_id,
            shared_by: input.shared_by,
            shared_with: input.shared_with,
            permission_level: input.permission_level,
            notes: input.notes,
            shared_at: Utc::now(),
            expires_at: input.expires_at,
        };
        state.shares.push(share.clone());
        Ok(share)
    }

    async fn unshare(&self, document_id: i32, user_id: i32) -> Result<bool, DocumentError> {
        let mut state = self.state.lock().unwrap();
        let before = state.shares.len();
        state
            .shares
            .retain(|s| !(s.document_id == document_id && s.shared_with == user_id));
        Ok(state.shares.len() < before)
    }

    async fn list_shares(&self, document_id: i32) -> Result<Vec<DocumentShare>, DocumentError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .shares
            .iter()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn list_shared_with(&self, user_id: i32) -> Result<Vec<SharedDocument>, DocumentError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .shares
            .iter()
            .rev()
            .filter(|s| s.shared_with == user_id)
            .filter_map(|s| {
                state.documents.get(&s.document_id).map(|d| SharedDocument {
                    share: s.clone(),
                    document: d.clone(),
                })
            })
            .collect())
    }
}

/// In-memory blob store. Uploads named `fail*` fail; the first few
/// uploads can be delayed to scramble completion order.
#[derive(Default)]
struct MockStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    uploads: AtomicUsize,
    delay_first: usize,
}

impl ObjectStore for MockStore {
    async fn upload(&self, upload: ObjectUpload) -> Result<StorageLocation, StorageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if n < self.delay_first {
            tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        }
        if upload.file_name.starts_with("fail") {
            return Err(StorageError::operation("bucket unavailable"));
        }
        let key = format!("{}/{n}_{}", upload.folder, upload.file_name);
        self.blobs.lock().unwrap().insert(key.clone(), upload.data);
        Ok(StorageLocation::Local(key))
    }

    async fn remove(&self, location: &StorageLocation) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(location.as_str());
        Ok(())
    }

    async fn read(&self, location: &StorageLocation) -> Result<Bytes, StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .get(location.as_str())
            .cloned()
            .ok_or_else(|| StorageError::not_found(location.as_str()))
    }
}

type Service = DocumentService<MockRepo, MockStore>;

fn service_with(repo: MockRepo, store: MockStore) -> (Arc<Service>, Arc<MockRepo>, Arc<MockStore>) {
    let repo = Arc::new(repo);
    let store = Arc::new(store);
    let service = Arc::new(DocumentService::new(
        Arc::clone(&repo),
        Arc::clone(&store),
        DocumentSettings::default(),
    ));
    (service, repo, store)
}

fn file(name: &str) -> FilePayload {
    FilePayload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        data: Bytes::from(format!("content of {name}")),
    }
}

fn medical() -> DocumentMetadata {
    DocumentMetadata {
        document_type: "medical_certificate".to_string(),
        ..DocumentMetadata::default()
    }
}

const ADMIN: Actor = Actor::admin(3);

#[tokio::test]
async fn test_upload_then_validate() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());

    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();
    assert_eq!(doc.validation_status, ValidationStatus::Pending);
    assert_eq!(doc.document_type, "medical_certificate");
    assert!(doc.file_location.as_str().starts_with("documents/athlete_10/"));

    let doc = service.validate(&ADMIN, doc.id).await.unwrap();
    assert_eq!(doc.validation_status, ValidationStatus::Approved);
    assert_eq!(doc.review.map(|r| r.by), Some(3));
}

#[tokio::test]
async fn test_reject_then_approve_is_invalid() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();

    let doc = service.reject(&ADMIN, doc.id, "illegible").await.unwrap();
    assert_eq!(doc.rejection_reason.as_deref(), Some("illegible"));

    let err = service.validate(&ADMIN, doc.id).await.unwrap_err();
    assert!(matches!(err, DocumentError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_validate_missing_document_is_not_found() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let err = service.validate(&ADMIN, 999).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound { id: 999, .. }));
}

#[tokio::test]
async fn test_review_requires_admin() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();

    let owner = Actor::athlete(40, 10);
    let err = service.validate(&owner, doc.id).await.unwrap_err();
    assert!(matches!(err, DocumentError::Forbidden(_)));
}

#[tokio::test]
async fn test_athlete_cannot_upload_for_someone_else() {
    let (service, _, store) = service_with(MockRepo::default(), MockStore::default());
    let err = service
        .upload(&Actor::athlete(40, 10), 11, &medical(), file("cert.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Forbidden(_)));
    assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_removes_uploaded_blob() {
    let (service, _, store) = service_with(MockRepo::failing_for(&[10]), MockStore::default());

    let err = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap_err();

    assert!(matches!(err, DocumentError::Store(_)));
    assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
    assert!(store.blobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_surfaces() {
    let (service, repo, _) = service_with(MockRepo::default(), MockStore::default());
    let err = service.upload(&ADMIN, 10, &medical(), file("fail.pdf")).await.unwrap_err();

    assert!(matches!(err, DocumentError::Storage(_)));
    assert!(repo.state.lock().unwrap().documents.is_empty());
}

#[tokio::test]
async fn test_versions_number_sequentially() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();

    let v1 = service.upload_version(&ADMIN, doc.id, file("cert_v1.pdf"), None).await.unwrap();
    let v2 = service
        .upload_version(&ADMIN, doc.id, file("cert_v2.pdf"), Some("renewed".into()))
        .await
        .unwrap();
    assert_eq!((v1.version_number, v2.version_number), (1, 2));
    assert!(
        v2.file_location
            .as_str()
            .starts_with(&format!("documents/athlete_10/document_{}/versions/", doc.id))
    );

    let numbers: Vec<_> = service
        .versions(&ADMIN, doc.id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![2, 1]);
}

#[tokio::test]
async fn test_version_of_missing_document() {
    let (service, _, store) = service_with(MockRepo::default(), MockStore::default());
    let err = service.upload_version(&ADMIN, 42, file("x.pdf"), None).await.unwrap_err();

    assert!(matches!(err, DocumentError::NotFound { id: 42, .. }));
    assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_share_upsert_and_unshare_idempotent() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();
    let request = |level| ShareRequest {
        shared_with: 55,
        permission_level: level,
        notes: None,
        expires_at: None,
    };

    service.share(&ADMIN, doc.id, request(PermissionLevel::View)).await.unwrap();
    service.share(&ADMIN, doc.id, request(PermissionLevel::Manage)).await.unwrap();

    let shares = service.shares(&ADMIN, doc.id).await.unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].permission_level, PermissionLevel::Manage);

    service.unshare(&ADMIN, doc.id, 55).await.unwrap();
    service.unshare(&ADMIN, doc.id, 55).await.unwrap();
    assert!(service.shares(&ADMIN, doc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_grantee_access_follows_share() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();
    let grantee = Actor::athlete(55, 11);

    assert!(matches!(
        service.get(&grantee, doc.id).await,
        Err(DocumentError::Forbidden(_))
    ));

    service
        .share(
            &ADMIN,
            doc.id,
            ShareRequest {
                shared_with: 55,
                permission_level: PermissionLevel::View,
                notes: Some("for the away game".into()),
                expires_at: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(service.get(&grantee, doc.id).await.unwrap().id, doc.id);
    assert!(matches!(
        service.upload_version(&grantee, doc.id, file("v.pdf"), None).await,
        Err(DocumentError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_shared_with_me_hides_expired() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let first = service.upload(&ADMIN, 10, &medical(), file("a.pdf")).await.unwrap();
    let second = service.upload(&ADMIN, 10, &medical(), file("b.pdf")).await.unwrap();

    for (doc, expires_at) in [
        (&first, Some(Utc::now() - Duration::days(1))),
        (&second, Some(Utc::now() + Duration::days(1))),
    ] {
        service
            .share(
                &ADMIN,
                doc.id,
                ShareRequest {
                    shared_with: 55,
                    permission_level: PermissionLevel::View,
                    notes: None,
                    expires_at,
                },
            )
            .await
            .unwrap();
    }

    let visible = service.shared_with_me(&Actor::athlete(55, 11)).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].document.id, second.id);
}

#[tokio::test]
async fn test_delete_removes_document_and_blobs() {
    let (service, _, store) = service_with(MockRepo::default(), MockStore::default());
    let owner = Actor::athlete(40, 10);
    let doc = service.upload(&owner, 10, &medical(), file("cert.pdf")).await.unwrap();
    service.upload_version(&owner, doc.id, file("v1.pdf"), None).await.unwrap();
    assert_eq!(store.blobs.lock().unwrap().len(), 2);

    service.delete(&owner, doc.id).await.unwrap();

    assert!(store.blobs.lock().unwrap().is_empty());
    assert!(matches!(
        service.get(&ADMIN, doc.id).await,
        Err(DocumentError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_open_local_document_returns_bytes() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let doc = service.upload(&ADMIN, 10, &medical(), file("cert.pdf")).await.unwrap();

    let (_, content) = service.open(&ADMIN, doc.id).await.unwrap();
    assert_eq!(
        content,
        DocumentContent::Inline(Bytes::from("content of cert.pdf"))
    );
}

#[tokio::test]
async fn test_athlete_search_is_confined() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    service.upload(&ADMIN, 10, &medical(), file("a.pdf")).await.unwrap();
    service.upload(&ADMIN, 11, &medical(), file("b.pdf")).await.unwrap();

    let found = service
        .search(&Actor::athlete(40, 10), SearchFilters::default())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].athlete_id, 10);
}

#[tokio::test]
async fn test_expiring_uses_window() {
    let (service, _, _) = service_with(MockRepo::default(), MockStore::default());
    let today = Utc::now().date_naive();
    for (name, days) in [("soon.pdf", 10), ("later.pdf", 60), ("past.pdf", -3)] {
        let meta = DocumentMetadata {
            expiry_date: Some(today + Duration::days(days)),
            ..medical()
        };
        service.upload(&ADMIN, 10, &meta, file(name)).await.unwrap();
    }

    let expiring = service.expiring(&ADMIN).await.unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].file_name, "soon.pdf");

    let expired = service.expired(&ADMIN).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].file_name, "past.pdf");
}

mod bulk_tests {
    use super::*;

    fn orchestrator(
        repo: MockRepo,
        store: MockStore,
    ) -> (BulkUploadOrchestrator<MockRepo, MockStore>, Arc<MockStore>) {
        let (service, _, store) = service_with(repo, store);
        (BulkUploadOrchestrator::new(service), store)
    }

    #[tokio::test]
    async fn test_missing_file_is_isolated() {
        let (bulk, _) = orchestrator(MockRepo::default(), MockStore::default());
        let items = vec![
            BulkItem { athlete_id: 1, file: Some(file("a.pdf")) },
            BulkItem { athlete_id: 2, file: None },
            BulkItem { athlete_id: 3, file: Some(file("c.pdf")) },
        ];

        let outcomes = bulk.upload_all(&ADMIN, items, medical()).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(outcomes[1].error.as_deref().unwrap().contains("athlete 2"));
        assert!(outcomes[2].is_success());

        let ids: HashSet<i32> = outcomes
            .iter()
            .filter_map(|o| o.document.as_ref().map(|d| d.id))
            .collect();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let store = MockStore {
            delay_first: 2,
            ..MockStore::default()
        };
        let (bulk, _) = orchestrator(MockRepo::default(), store);
        let items: Vec<_> = (1..=6)
            .map(|id| BulkItem {
                athlete_id: id,
                file: Some(file(&format!("doc{id}.pdf"))),
            })
            .collect();

        let outcomes = bulk.upload_all(&ADMIN, items, medical()).await.unwrap();

        let athletes: Vec<i32> = outcomes.iter().map(|o| o.athlete_id).collect();
        assert_eq!(athletes, vec![1, 2, 3, 4, 5, 6]);
        for outcome in &outcomes {
            let doc = outcome.document.as_ref().unwrap();
            assert_eq!(doc.athlete_id, outcome.athlete_id);
            assert_eq!(doc.validation_status, ValidationStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_storage_and_store_failures_stay_local() {
        let (bulk, store) = orchestrator(MockRepo::failing_for(&[3]), MockStore::default());
        let items = vec![
            BulkItem { athlete_id: 1, file: Some(file("fail.pdf")) },
            BulkItem { athlete_id: 2, file: Some(file("ok.pdf")) },
            BulkItem { athlete_id: 3, file: Some(file("orphan.pdf")) },
        ];

        let outcomes = bulk.upload_all(&ADMIN, items, medical()).await.unwrap();

        assert!(outcomes[0].error.as_deref().unwrap().contains("bucket unavailable"));
        assert!(outcomes[1].is_success());
        assert!(outcomes[2].error.as_deref().unwrap().contains("FOREIGN KEY"));
        // Only the successful upload's blob remains.
        assert_eq!(store.blobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_requires_admin() {
        let (bulk, _) = orchestrator(MockRepo::default(), MockStore::default());
        let items = vec![BulkItem { athlete_id: 1, file: Some(file("a.pdf")) }];

        let err = bulk
            .upload_all(&Actor::athlete(40, 1), items, medical())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let (bulk, _) = orchestrator(MockRepo::default(), MockStore::default());
        let err = bulk.upload_all(&ADMIN, vec![], medical()).await.unwrap_err();
        assert!(matches!(err, DocumentError::Validation(_)));
    }
}
