use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use foundation::LngLat;
use serde::{Deserialize, Serialize};

use crate::RecordError;

pub const UNTITLED: &str = "Untitled Memory";
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Opaque backend id of a memory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decade bucket for a year, e.g. `1994 -> "1990s"`.
pub fn time_period(year: i32) -> String {
    format!("{}s", year.div_euclid(10) * 10)
}

/// Milliseconds since the Unix epoch for an RFC 3339 timestamp such as
/// `2024-06-01T12:30:00.250+00:00`. Instants before 1970 are rejected.
pub fn parse_timestamp_ms(s: &str) -> Result<u64, String> {
    let at = DateTime::parse_from_rfc3339(s.trim()).map_err(|e| format!("{s:?}: {e}"))?;
    u64::try_from(at.timestamp_millis()).map_err(|_| format!("{s:?} is before 1970"))
}

pub fn format_timestamp_ms(ms: u64) -> Option<String> {
    let ms = i64::try_from(ms).ok()?;
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// `created_at` arrives as RFC 3339 text from the backend; fixtures may carry
/// plain milliseconds. Null counts as unknown.
mod created_at {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Millis(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Option::<Wire>::deserialize(deserializer)? {
            None => Ok(0),
            Some(Wire::Millis(ms)) => Ok(ms),
            Some(Wire::Text(text)) => super::parse_timestamp_ms(&text).map_err(de::Error::custom),
        }
    }

    pub fn serialize<S: Serializer>(ms: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        match super::format_timestamp_ms(*ms) {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_u64(*ms),
        }
    }
}

/// GeoJSON point as returned by the backend's geography column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRow {
    pub id: Option<String>,
    pub memory_id: Option<String>,
    pub file_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub display_order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub profile_pic_url: Option<String>,
    pub auth_type: Option<String>,
}

/// A `memories` row with its embedded `media` and `user` relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRow {
    pub id: String,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub story: Option<String>,
    pub language: Option<String>,
    pub location_name: Option<String>,
    pub coordinates: Option<PointGeometry>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year: Option<i32>,
    /// Stored decade bucket; ignored on read in favor of `year`.
    pub time_period: Option<String>,
    pub tags: Vec<String>,
    pub photo_count: Option<u32>,
    pub is_hidden: bool,
    pub is_deleted: bool,
    /// Read from the backend's `created_at` timestamp.
    #[serde(rename = "created_at", alias = "created_at_ms", with = "created_at")]
    pub created_at_ms: u64,
    pub media: Vec<MediaRow>,
    pub user: Option<UserRow>,
}

impl MemoryRow {
    pub fn is_visible(&self) -> bool {
        !self.is_hidden && !self.is_deleted
    }

    /// Geometry column first, then the plain latitude/longitude pair.
    pub fn position(&self) -> Option<LngLat> {
        if let Some(geom) = &self.coordinates {
            return Some(LngLat::new(geom.coordinates[0], geom.coordinates[1]));
        }
        match (self.longitude, self.latitude) {
            (Some(lng), Some(lat)) => Some(LngLat::new(lng, lat)),
            _ => None,
        }
    }

    pub fn photos(&self) -> Vec<PhotoRef> {
        photos_from_rows(&self.media)
    }
}

/// One stored photo of a memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub display_order: u32,
}

/// Media rows without a file are dropped; the rest are ordered by `display_order`,
/// with row order breaking ties.
pub fn photos_from_rows(rows: &[MediaRow]) -> Vec<PhotoRef> {
    let mut photos: Vec<PhotoRef> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let file_url = m.file_url.clone().filter(|u| !u.is_empty())?;
            Some(PhotoRef {
                file_url,
                thumbnail_url: m.thumbnail_url.clone().filter(|u| !u.is_empty()),
                display_order: m.display_order.unwrap_or(i as u32),
            })
        })
        .collect();
    photos.sort_by_key(|p| p.display_order);
    photos
}

/// What a leaf marker shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumbnail<'a> {
    Image(&'a str),
    Pin,
}

/// A memory as the map sees it. Always carries valid coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub id: RecordId,
    pub position: LngLat,
    pub title: Option<String>,
    pub location_name: Option<String>,
    pub year: Option<i32>,
    pub photo_count: u32,
    pub photos: Vec<PhotoRef>,
    pub created_at_ms: u64,
}

impl GeoRecord {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
    }

    pub fn display_location(&self) -> &str {
        self.location_name
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
    }

    pub fn time_period(&self) -> Option<String> {
        self.year.map(time_period)
    }

    /// First photo's thumbnail, then its full image, then a pin.
    pub fn thumbnail(&self) -> Thumbnail<'_> {
        match self.photos.first() {
            Some(PhotoRef {
                thumbnail_url: Some(thumb),
                ..
            }) => Thumbnail::Image(thumb),
            Some(photo) => Thumbnail::Image(&photo.file_url),
            None => Thumbnail::Pin,
        }
    }
}

impl TryFrom<MemoryRow> for GeoRecord {
    type Error = RecordError;

    fn try_from(row: MemoryRow) -> Result<Self, Self::Error> {
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
        let Some(position) = row.position() else {
            return Err(RecordError::MissingCoordinates(id));
        };
        if !position.is_valid() {
            return Err(RecordError::InvalidCoordinates {
                id,
                lng: position.lng,
                lat: position.lat,
            });
        }

        let photos = row.photos();
        Ok(Self {
            id,
            position,
            title: row.title,
            location_name: row.location_name,
            year: row.year,
            photo_count: row.photo_count.unwrap_or(photos.len() as u32),
            photos,
            created_at_ms: row.created_at_ms,
        })
    }
}

/// Converts rows at the backend boundary, dropping those the map cannot show.
pub fn records_from_rows(rows: impl IntoIterator<Item = MemoryRow>) -> Vec<GeoRecord> {
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        match GeoRecord::try_from(row) {
            Ok(record) => out.push(record),
            Err(err) => {
                skipped += 1;
                tracing::debug!(%err, "skipping memory row");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(kept = out.len(), skipped, "dropped memory rows without a map position");
    }
    out
}
