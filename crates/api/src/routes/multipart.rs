//! Buffered multipart form parsing shared by the upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{ApiError, ApiResult};
use clubdocs_core::document::{DocumentMetadata, FilePayload, parse_date};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Text fields and file parts of one multipart request.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePayload>,
}

impl UploadForm {
    /// Read every part of the request into memory.
    pub(crate) async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::validation(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("failed to read '{name}': {e}")))?;
                form.files.insert(
                    name,
                    FilePayload {
                        file_name,
                        content_type,
                        data,
                    },
                );
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("failed to read '{name}': {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, blank counted as absent.
    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// An optional integer field.
    pub(crate) fn id(&self, name: &str) -> ApiResult<Option<i32>> {
        self.text(name)
            .map(|raw| parse_id(name, raw))
            .transpose()
    }

    /// A comma separated list of integers.
    pub(crate) fn ids(&self, name: &str) -> ApiResult<Vec<i32>> {
        self.text(name)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| parse_id(name, part))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// A file part. Repeated lookups get the same bytes.
    pub(crate) fn file(&self, name: &str) -> Option<FilePayload> {
        self.files.get(name).cloned()
    }

    /// Descriptive fields shared by single and bulk uploads.
    pub(crate) fn metadata(&self) -> ApiResult<DocumentMetadata> {
        Ok(DocumentMetadata {
            document_type: self.text("document_type").unwrap_or_default().to_string(),
            category_id: self.id("category_id")?,
            tag_ids: self.ids("tag_ids")?,
            notes: self.text("notes").map(str::to_string),
            expiry_date: parse_date(self.text("expiry_date"))?,
        })
    }
}

fn parse_id(name: &str, raw: &str) -> ApiResult<i32> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("invalid {name} '{raw}'")))
}
