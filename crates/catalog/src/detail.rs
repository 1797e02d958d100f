use foundation::LngLat;
use serde::{Deserialize, Serialize};

use crate::{
    Language, MemoryRow, PhotoRef, RecordError, RecordId, UNKNOWN_LOCATION, UNTITLED, UserRow,
    time_period,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub profile_pic_url: Option<String>,
}

impl From<&UserRow> for AuthorSummary {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            profile_pic_url: row.profile_pic_url.clone(),
        }
    }
}

/// Everything the detail page shows for one memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDetail {
    pub id: RecordId,
    pub title: String,
    pub story: String,
    pub language: Language,
    pub location_name: String,
    pub position: Option<LngLat>,
    pub year: Option<i32>,
    /// Derived from `year` on read.
    pub time_period: Option<String>,
    pub tags: Vec<String>,
    /// Ordered by `display_order`.
    pub photos: Vec<PhotoRef>,
    pub author: Option<AuthorSummary>,
    pub created_at_ms: u64,
}

impl MemoryDetail {
    /// Builds the detail view from a visible row. `author` overrides the row's
    /// embedded user when the caller resolved it separately.
    pub fn from_row(row: &MemoryRow, author: Option<&UserRow>) -> Result<Self, RecordError> {
        if row.id.trim().is_empty() {
            return Err(RecordError::MissingId);
        }
        let id = RecordId::new(row.id.clone());
        if row.is_deleted {
            return Err(RecordError::Deleted(id));
        }
        if row.is_hidden {
            return Err(RecordError::Hidden(id));
        }

        let language: Language = row
            .language
            .as_deref()
            .and_then(|code| code.parse().ok())
            .unwrap_or_default();
        Ok(Self {
            id,
            title: non_empty(&row.title).unwrap_or_else(|| UNTITLED.to_string()),
            story: row.story.clone().unwrap_or_default(),
            language,
            location_name: non_empty(&row.location_name)
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            position: row.position().filter(LngLat::is_valid),
            year: row.year,
            time_period: row.year.map(time_period),
            tags: row.tags.clone(),
            photos: row.photos(),
            author: author.or(row.user.as_ref()).map(AuthorSummary::from),
            created_at_ms: row.created_at_ms,
        })
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
