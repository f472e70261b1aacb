//! Search filter vocabulary.
//!
//! The query-string keys and the `all` sentinel are a stable wire contract:
//! `athlete_id`, `document_type`, `category_id`, `status`, `search`,
//! `tag_ids` (comma separated), `sort`, `limit`. Blank values count as absent.

use std::collections::HashMap;

use serde::Serialize;

use super::error::DocumentError;
use super::types::{Document, ValidationStatus};

/// Sentinel meaning "do not filter on this key".
pub const ALL: &str = "all";

/// Escape character used in [`SearchFilters::like_pattern`].
pub const LIKE_ESCAPE: char = '\\';

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// File name A-Z.
    NameAsc,
    /// File name Z-A.
    NameDesc,
    /// Oldest upload first.
    DateAsc,
    /// Newest upload first.
    #[default]
    DateDesc,
    /// Soonest expiry first, undated last.
    ExpiryAsc,
    /// Latest expiry first, undated last.
    ExpiryDesc,
}

impl SortOrder {
    /// Parse a sort key. Unrecognized keys fall back to [`SortOrder::DateDesc`].
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "name_asc" => Self::NameAsc,
            "name_desc" => Self::NameDesc,
            "date_asc" => Self::DateAsc,
            "expiry_asc" => Self::ExpiryAsc,
            "expiry_desc" => Self::ExpiryDesc,
            _ => Self::DateDesc,
        }
    }
}

/// Parsed, typed search filters. Present filters are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Exact owner match.
    pub athlete_id: Option<i32>,
    /// Exact type match.
    pub document_type: Option<String>,
    /// Exact category match.
    pub category_id: Option<i32>,
    /// Exact status match.
    pub status: Option<ValidationStatus>,
    /// Case-insensitive substring of file name or notes.
    pub search: Option<String>,
    /// Documents carrying ANY of these tags.
    pub tag_ids: Vec<i32>,
    /// Ordering.
    pub sort: SortOrder,
    /// Maximum number of results.
    pub limit: Option<u64>,
}

fn present<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_id(key: &str, raw: &str) -> Result<i32, DocumentError> {
    raw.trim()
        .parse()
        .map_err(|_| DocumentError::validation(format!("invalid {key} '{raw}'")))
}

impl SearchFilters {
    /// Build filters from raw query parameters.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Validation` for malformed ids, an unknown
    /// status or a non-numeric limit.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DocumentError> {
        let athlete_id = present(params, "athlete_id")
            .map(|raw| parse_id("athlete_id", raw))
            .transpose()?;

        let category_id = present(params, "category_id")
            .filter(|raw| *raw != ALL)
            .map(|raw| parse_id("category_id", raw))
            .transpose()?;

        let status = present(params, "status")
            .filter(|raw| *raw != ALL)
            .map(|raw| {
                ValidationStatus::parse(raw)
                    .ok_or_else(|| DocumentError::validation(format!("invalid status '{raw}'")))
            })
            .transpose()?;

        let tag_ids = present(params, "tag_ids")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| parse_id("tag_ids", part))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let limit = present(params, "limit")
            .map(|raw| {
                raw.parse::<u64>()
                    .map_err(|_| DocumentError::validation(format!("invalid limit '{raw}'")))
            })
            .transpose()?;

        Ok(Self {
            athlete_id,
            document_type: present(params, "document_type").map(str::to_string),
            category_id,
            status,
            search: present(params, "search").map(str::to_string),
            tag_ids,
            sort: present(params, "sort").map_or(SortOrder::default(), SortOrder::parse_or_default),
            limit,
        })
    }

    /// Lower-cased `LIKE` pattern for the free-text filter, with wildcards
    /// in the user text escaped by [`LIKE_ESCAPE`].
    #[must_use]
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|text| {
            let mut pattern = String::with_capacity(text.len() + 2);
            pattern.push('%');
            for c in text.to_lowercase().chars() {
                if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
                    pattern.push(LIKE_ESCAPE);
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }

    /// In-memory evaluation of the filter predicates (ordering and limit excluded).
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        let text_hit = self.search.as_ref().is_none_or(|text| {
            let needle = text.to_lowercase();
            document.file_name.to_lowercase().contains(&needle)
                || document
                    .notes
                    .as_ref()
                    .is_some_and(|notes| notes.to_lowercase().contains(&needle))
        });

        self.athlete_id.is_none_or(|id| document.athlete_id == id)
            && self
                .document_type
                .as_ref()
                .is_none_or(|t| &document.document_type == t)
            && self
                .category_id
                .is_none_or(|id| document.category_id == Some(id))
            && self.status.is_none_or(|s| document.validation_status == s)
            && text_hit
            && (self.tag_ids.is_empty()
                || document.tags.iter().any(|tag| self.tag_ids.contains(&tag.id)))
    }
}
