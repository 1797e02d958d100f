//! The data-access seam between the app and its hosted backend.
//!
//! `MemoryStore` is object-safe and async; each backend (hosted REST, in-memory
//! fixture) implements it. Rows are turned into typed records inside the store,
//! so callers only ever see [`GeoRecord`] and [`MemoryDetail`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use foundation::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    CurrentUser, GeoRecord, Language, MediaRow, MemoryDetail, MemoryDraft, MemoryRow, NewMemory,
    PointGeometry, PreparedPhoto, RecordId, StoreError, UserRow, ValidationErrors, check_photo,
    object_key, records_from_rows,
};

/// Boxed future type used by the async store trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Typed replacement for the loose filter object of the list page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFilter {
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub language: Option<Language>,
    /// Matches memories sharing at least one tag.
    pub tags: Vec<String>,
    pub author_id: Option<String>,
}

impl MemoryFilter {
    pub fn matches(&self, memory: &MemoryDetail) -> bool {
        if self.year_from.is_some() || self.year_to.is_some() {
            let Some(year) = memory.year else {
                return false;
            };
            if self.year_from.is_some_and(|from| year < from)
                || self.year_to.is_some_and(|to| year > to)
            {
                return false;
            }
        }
        if self.language.is_some_and(|lang| lang != memory.language) {
            return false;
        }
        if !self.tags.is_empty() {
            let overlap = self.tags.iter().any(|wanted| {
                let wanted = wanted.trim().to_lowercase();
                memory.tags.iter().any(|t| t.to_lowercase() == wanted)
            });
            if !overlap {
                return false;
            }
        }
        if let Some(author) = &self.author_id {
            if memory.author.as_ref().map(|a| &a.id) != Some(author) {
                return false;
            }
        }
        true
    }
}

/// Where an uploaded photo ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPhoto {
    pub object_key: String,
    pub file_url: String,
    /// The prepared thumbnail, when the photo could be decoded.
    pub thumbnail_url: Option<String>,
}

pub trait MemoryStore: Send + Sync {
    /// Memories that can be placed on the map: not hidden, not deleted, located.
    fn list_visible_memories(&self) -> BoxFuture<'_, Result<Vec<GeoRecord>, StoreError>>;

    /// Visible memories matching `filter`, newest first.
    fn list_memories(
        &self,
        filter: MemoryFilter,
    ) -> BoxFuture<'_, Result<Vec<MemoryDetail>, StoreError>>;

    fn get_memory_detail(&self, id: RecordId) -> BoxFuture<'_, Result<MemoryDetail, StoreError>>;

    fn create_memory(&self, memory: NewMemory) -> BoxFuture<'_, Result<RecordId, StoreError>>;

    /// Marks a memory deleted; it disappears from every listing.
    fn soft_delete_memory(&self, id: RecordId) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Stores a prepared photo and returns its public URL with its thumbnail.
    fn upload_photo(
        &self,
        owner_id: String,
        photo: PreparedPhoto,
    ) -> BoxFuture<'_, Result<StoredPhoto, StoreError>>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validates a draft locally and creates it only when it is valid.
pub async fn submit_memory(
    store: &dyn MemoryStore,
    draft: &MemoryDraft,
    author: &CurrentUser,
) -> Result<RecordId, SubmitError> {
    let memory = draft.validate(&author.id)?;
    let id = store.create_memory(memory).await?;
    Ok(id)
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<MemoryRow>,
    users: BTreeMap<String, UserRow>,
    objects: BTreeMap<String, Vec<u8>>,
    last_created_ms: u64,
}

impl State {
    fn visible(&self, id: &RecordId) -> Option<&MemoryRow> {
        self.rows
            .iter()
            .find(|r| r.id == id.as_str() && r.is_visible())
    }

    fn detail(&self, row: &MemoryRow) -> Option<MemoryDetail> {
        let author = row.user_id.as_ref().and_then(|id| self.users.get(id));
        MemoryDetail::from_row(row, author).ok()
    }
}

/// Store backed by process memory. Used by tests, the CLI and offline demos.
#[derive(Debug)]
pub struct InMemoryMemoryStore {
    state: RwLock<State>,
    public_url: String,
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMemoryStore {
    pub const DEFAULT_PUBLIC_URL: &'static str = "memory://memories-photos";

    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            public_url: Self::DEFAULT_PUBLIC_URL.to_string(),
        }
    }

    /// Seeds the store with backend rows; embedded users are registered too.
    pub fn with_rows(rows: Vec<MemoryRow>) -> Self {
        let mut store = Self::new();
        let state = store.state.get_mut();
        for row in &rows {
            if let Some(user) = &row.user {
                state.users.insert(user.id.clone(), user.clone());
            }
            state.last_created_ms = state.last_created_ms.max(row.created_at_ms);
        }
        state.rows = rows;
        store
    }

    /// Parses a JSON array of backend rows.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let rows: Vec<MemoryRow> =
            serde_json::from_str(json).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Self::with_rows(rows))
    }

    pub fn with_user(mut self, user: UserRow) -> Self {
        self.state.get_mut().users.insert(user.id.clone(), user);
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Number of stored rows, including hidden and deleted ones.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.read().await.objects.get(key).cloned()
    }
}

// Newest first, then id, so listings are deterministic.
fn sort_newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (u64, &str)) {
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        tb.cmp(&ta).then_with(|| ia.cmp(ib))
    });
}

impl MemoryStore for InMemoryMemoryStore {
    fn list_visible_memories(&self) -> BoxFuture<'_, Result<Vec<GeoRecord>, StoreError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut records = records_from_rows(state.rows.iter().cloned());
            sort_newest_first(&mut records, |r| (r.created_at_ms, r.id.as_str()));
            Ok(records)
        })
    }

    fn list_memories(
        &self,
        filter: MemoryFilter,
    ) -> BoxFuture<'_, Result<Vec<MemoryDetail>, StoreError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut out: Vec<MemoryDetail> = state
                .rows
                .iter()
                .filter(|r| r.is_visible())
                .filter_map(|r| state.detail(r))
                .filter(|d| filter.matches(d))
                .collect();
            sort_newest_first(&mut out, |d| (d.created_at_ms, d.id.as_str()));
            Ok(out)
        })
    }

    fn get_memory_detail(&self, id: RecordId) -> BoxFuture<'_, Result<MemoryDetail, StoreError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            state
                .visible(&id)
                .and_then(|row| state.detail(row))
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn create_memory(&self, memory: NewMemory) -> BoxFuture<'_, Result<RecordId, StoreError>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let id = uuid::Uuid::new_v4().to_string();
            let created_at_ms = Timestamp::now()
                .as_millis()
                .max(state.last_created_ms.saturating_add(1));
            state.last_created_ms = created_at_ms;

            let media = memory
                .photos
                .iter()
                .map(|p| MediaRow {
                    id: Some(uuid::Uuid::new_v4().to_string()),
                    memory_id: Some(id.clone()),
                    file_url: Some(p.file_url.clone()),
                    thumbnail_url: p.thumbnail_url.clone(),
                    display_order: Some(p.display_order),
                })
                .collect::<Vec<_>>();

            state.rows.push(MemoryRow {
                id: id.clone(),
                user_id: Some(memory.author_id),
                title: Some(memory.title),
                story: Some(memory.story),
                language: Some(memory.language.code().to_string()),
                location_name: Some(memory.location_name),
                coordinates: Some(PointGeometry {
                    kind: "Point".to_string(),
                    coordinates: [memory.position.lng, memory.position.lat],
                }),
                latitude: Some(memory.position.lat),
                longitude: Some(memory.position.lng),
                year: memory.year,
                time_period: memory.time_period,
                tags: memory.tags,
                photo_count: Some(media.len() as u32),
                is_hidden: false,
                is_deleted: false,
                created_at_ms,
                media,
                user: None,
            });

            tracing::info!(memory = %id, "memory created");
            Ok(RecordId(id))
        })
    }

    fn soft_delete_memory(&self, id: RecordId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let Some(row) = state
                .rows
                .iter_mut()
                .find(|r| r.id == id.as_str() && !r.is_deleted)
            else {
                return Err(StoreError::NotFound(id));
            };
            row.is_deleted = true;
            tracing::info!(memory = %id, "memory deleted");
            Ok(())
        })
    }

    fn upload_photo(
        &self,
        owner_id: String,
        photo: PreparedPhoto,
    ) -> BoxFuture<'_, Result<StoredPhoto, StoreError>> {
        Box::pin(async move {
            check_photo(&photo.file_name, photo.kind.mime(), photo.bytes.len())?;
            let key = object_key(&owner_id, &photo.bytes, &photo.file_name);
            let file_url = format!("{}/{}", self.public_url, key);

            let mut state = self.state.write().await;
            state.objects.insert(key.clone(), photo.bytes);
            tracing::debug!(key = %key, "photo stored");
            Ok(StoredPhoto {
                object_key: key,
                file_url,
                thumbnail_url: photo.thumbnail,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldError, PhotoKind, Place, UploadError};
    use foundation::LngLat;
    use pretty_assertions::assert_eq;

    fn row(id: &str, created_at_ms: u64) -> MemoryRow {
        MemoryRow {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            story: Some("We walked along the canal every Sunday.".to_string()),
            language: Some("en".to_string()),
            coordinates: Some(PointGeometry {
                kind: "Point".to_string(),
                coordinates: [4.35, 50.85],
            }),
            created_at_ms,
            ..MemoryRow::default()
        }
    }

    fn store() -> InMemoryMemoryStore {
        InMemoryMemoryStore::with_rows(vec![
            MemoryRow {
                year: Some(1985),
                tags: vec!["music".to_string()],
                ..row("old", 10)
            },
            MemoryRow {
                year: Some(2010),
                language: Some("fr".to_string()),
                tags: vec!["family".to_string(), "beach".to_string()],
                user_id: Some("u2".to_string()),
                ..row("new", 30)
            },
            MemoryRow {
                is_hidden: true,
                ..row("hidden", 40)
            },
            MemoryRow {
                coordinates: None,
                ..row("unplaced", 20)
            },
        ])
        .with_user(UserRow {
            id: "u1".to_string(),
            name: Some("Ann".to_string()),
            ..UserRow::default()
        })
        .with_user(UserRow {
            id: "u2".to_string(),
            name: Some("Bert".to_string()),
            ..UserRow::default()
        })
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &RecordId) -> Vec<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    fn draft(story: &str) -> MemoryDraft {
        MemoryDraft {
            story: story.to_string(),
            location: Some(Place {
                name: "Antwerp".to_string(),
                position: LngLat::new(4.40, 51.22),
            }),
            year: Some(2001),
            ..MemoryDraft::default()
        }
    }

    fn author() -> CurrentUser {
        CurrentUser {
            id: "u1".to_string(),
            name: "Ann".to_string(),
            is_anonymous: false,
        }
    }

    #[tokio::test]
    async fn map_listing_skips_hidden_and_unplaced() {
        let records = store().list_visible_memories().await.unwrap();
        assert_eq!(ids(&records, |r| &r.id), vec!["new", "old"]);
    }

    #[tokio::test]
    async fn filtered_listing_includes_unplaced_memories() {
        let all = store().list_memories(MemoryFilter::default()).await.unwrap();
        assert_eq!(ids(&all, |d| &d.id), vec!["new", "unplaced", "old"]);
        assert_eq!(all[2].author.as_ref().map(|a| a.name.as_str()), Some("Ann"));
    }

    #[tokio::test]
    async fn filters_by_year_language_tags_and_author() {
        let s = store();
        let by_year = MemoryFilter {
            year_from: Some(1980),
            year_to: Some(1990),
            ..MemoryFilter::default()
        };
        let by_lang = MemoryFilter {
            language: Some(Language::Fr),
            ..MemoryFilter::default()
        };
        let by_tag = MemoryFilter {
            tags: vec!["Beach".to_string(), "sports".to_string()],
            ..MemoryFilter::default()
        };
        let by_author = MemoryFilter {
            author_id: Some("u2".to_string()),
            ..MemoryFilter::default()
        };

        assert_eq!(ids(&s.list_memories(by_year).await.unwrap(), |d| &d.id), vec!["old"]);
        assert_eq!(ids(&s.list_memories(by_lang).await.unwrap(), |d| &d.id), vec!["new"]);
        assert_eq!(ids(&s.list_memories(by_tag).await.unwrap(), |d| &d.id), vec!["new"]);
        assert_eq!(ids(&s.list_memories(by_author).await.unwrap(), |d| &d.id), vec!["new"]);
    }

    #[tokio::test]
    async fn hidden_and_unknown_details_are_not_found() {
        let s = store();
        assert!(s.get_memory_detail(RecordId::new("old")).await.is_ok());
        assert_eq!(
            s.get_memory_detail(RecordId::new("hidden")).await,
            Err(StoreError::NotFound(RecordId::new("hidden")))
        );
        assert!(s.get_memory_detail(RecordId::new("nope")).await.is_err());
    }

    #[tokio::test]
    async fn created_memory_appears_first() {
        let s = store();
        let id = submit_memory(&s, &draft("Ferry rides across the Scheldt."), &author())
            .await
            .unwrap();

        let records = s.list_visible_memories().await.unwrap();
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].position, LngLat::new(4.40, 51.22));

        let detail = s.get_memory_detail(id).await.unwrap();
        assert_eq!(detail.time_period.as_deref(), Some("2000s"));
        assert_eq!(detail.title, "Untitled Memory");
        assert_eq!(detail.author.map(|a| a.id), Some("u1".to_string()));
    }

    #[tokio::test]
    async fn short_story_never_reaches_the_store() {
        let s = InMemoryMemoryStore::new();
        let err = submit_memory(&s, &draft("Hello"), &author()).await.unwrap_err();

        let errors = match err {
            SubmitError::Invalid(errors) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        };
        assert_eq!(
            errors.iter().cloned().collect::<Vec<_>>(),
            vec![FieldError::StoryTooShort { min: 10 }]
        );
        assert_eq!(s.row_count().await, 0);
    }

    #[tokio::test]
    async fn soft_delete_hides_memory() {
        let s = store();
        s.soft_delete_memory(RecordId::new("old")).await.unwrap();

        let records = s.list_visible_memories().await.unwrap();
        assert_eq!(ids(&records, |r| &r.id), vec!["new"]);
        assert!(s.get_memory_detail(RecordId::new("old")).await.is_err());
        assert_eq!(
            s.soft_delete_memory(RecordId::new("old")).await,
            Err(StoreError::NotFound(RecordId::new("old")))
        );
        assert_eq!(s.row_count().await, 4);
    }

    #[tokio::test]
    async fn uploads_are_keyed_by_owner() {
        let s = InMemoryMemoryStore::new().with_public_url("https://cdn.example/photos/");
        let photo = PreparedPhoto {
            file_name: "day one.jpg".to_string(),
            kind: PhotoKind::Jpeg,
            bytes: vec![1, 2, 3],
            dimensions: None,
            thumbnail: Some("data:image/jpeg;base64,AAAA".to_string()),
        };
        let stored = s.upload_photo("u1".to_string(), photo).await.unwrap();

        assert!(stored.object_key.starts_with("u1/"));
        assert!(stored.object_key.ends_with("_day_one.jpg"));
        assert_eq!(
            stored.file_url,
            format!("https://cdn.example/photos/{}", stored.object_key)
        );
        assert_eq!(s.object(&stored.object_key).await, Some(vec![1, 2, 3]));
        assert_eq!(
            stored.thumbnail_url.as_deref(),
            Some("data:image/jpeg;base64,AAAA")
        );
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let s = InMemoryMemoryStore::new();
        let photo = PreparedPhoto {
            file_name: "huge.heic".to_string(),
            kind: PhotoKind::Heic,
            bytes: vec![0; crate::MAX_UPLOAD_BYTES + 1],
            dimensions: None,
            thumbnail: None,
        };
        let err = s.upload_photo("u1".to_string(), photo).await.unwrap_err();
        assert!(matches!(err, StoreError::Upload(UploadError::TooLarge { .. })));
    }

    #[test]
    fn parses_row_fixtures() {
        let json = r#"[{"id": "a", "coordinates": {"type": "Point", "coordinates": [1.0, 2.0]}}]"#;
        assert!(InMemoryMemoryStore::from_json(json).is_ok());
        assert!(matches!(
            InMemoryMemoryStore::from_json("{not json"),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn backend_rows_list_newest_first() {
        let json = r#"[
            {"id": "a_old", "story": "An afternoon at the old harbour.",
             "coordinates": {"type": "Point", "coordinates": [4.35, 50.85]},
             "created_at": "2020-01-01T00:00:00Z"},
            {"id": "b_new", "story": "The last concert before the hall closed.",
             "coordinates": {"type": "Point", "coordinates": [4.36, 50.86]},
             "created_at": "2024-06-01T00:00:00Z"}
        ]"#;
        let s = InMemoryMemoryStore::from_json(json).unwrap();

        let details = s.list_memories(MemoryFilter::default()).await.unwrap();
        let got: Vec<(String, u64)> = details
            .iter()
            .map(|d| (d.id.to_string(), d.created_at_ms))
            .collect();
        assert_eq!(
            got,
            vec![
                ("b_new".to_string(), 1_717_200_000_000),
                ("a_old".to_string(), 1_577_836_800_000),
            ]
        );

        let records = s.list_visible_memories().await.unwrap();
        assert_eq!(ids(&records, |r| &r.id), vec!["b_new", "a_old"]);
    }
}
