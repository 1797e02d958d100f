use std::ops::RangeInclusive;

use foundation::LngLat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Language, MAX_PHOTOS, MAX_TAGS, PhotoRef, TagError, UNTITLED, detect_language, normalize_tag,
    time_period,
};

pub const STORY_MIN_CHARS: usize = 10;
pub const STORY_MAX_CHARS: usize = 10_000;
pub const TITLE_MAX_CHARS: usize = 500;
pub const YEAR_RANGE: RangeInclusive<i32> = 1972..=2025;

/// A place picked on the share form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub position: LngLat,
}

/// Share-form input before validation. Every field is optional here; the
/// constraints are applied by [`MemoryDraft::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDraft {
    pub title: String,
    pub story: String,
    pub location: Option<Place>,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    pub photos: Vec<PhotoRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Story,
    Location,
    Year,
    Tags,
    Photos,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Title cannot exceed {max} characters")]
    TitleTooLong { max: usize },
    #[error("Story must be at least {min} characters")]
    StoryTooShort { min: usize },
    #[error("Story cannot exceed {max} characters")]
    StoryTooLong { max: usize },
    #[error("Please select a location")]
    MissingLocation,
    #[error("Selected location has invalid coordinates")]
    InvalidLocation,
    #[error("Year must be between {min} and {max}")]
    YearOutOfRange { min: i32, max: i32 },
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("Maximum {max} photos allowed")]
    TooManyPhotos { max: usize },
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::TitleTooLong { .. } => Field::Title,
            FieldError::StoryTooShort { .. } | FieldError::StoryTooLong { .. } => Field::Story,
            FieldError::MissingLocation | FieldError::InvalidLocation => Field::Location,
            FieldError::YearOutOfRange { .. } => Field::Year,
            FieldError::Tag(_) => Field::Tags,
            FieldError::TooManyPhotos { .. } => Field::Photos,
        }
    }
}

/// Every problem found in a draft, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", join_messages(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |e| e.field() == field)
    }

    fn push(&mut self, err: impl Into<FieldError>) {
        self.errors.push(err.into());
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A validated memory ready to hand to a [`crate::MemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemory {
    pub author_id: String,
    pub title: String,
    pub story: String,
    pub language: Language,
    pub location_name: String,
    pub position: LngLat,
    pub year: Option<i32>,
    pub time_period: Option<String>,
    pub tags: Vec<String>,
    pub photos: Vec<PhotoRef>,
}

impl MemoryDraft {
    pub fn validate(&self, author_id: &str) -> Result<NewMemory, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = self.title.trim();
        if title.chars().count() > TITLE_MAX_CHARS {
            errors.push(FieldError::TitleTooLong {
                max: TITLE_MAX_CHARS,
            });
        }

        let story = self.story.trim();
        if story.chars().count() < STORY_MIN_CHARS {
            errors.push(FieldError::StoryTooShort {
                min: STORY_MIN_CHARS,
            });
        } else if self.story.chars().count() > STORY_MAX_CHARS {
            errors.push(FieldError::StoryTooLong {
                max: STORY_MAX_CHARS,
            });
        }

        match &self.location {
            None => errors.push(FieldError::MissingLocation),
            Some(place) if !place.position.is_valid() => errors.push(FieldError::InvalidLocation),
            Some(_) => {}
        }

        if let Some(year) = self.year {
            if !YEAR_RANGE.contains(&year) {
                errors.push(FieldError::YearOutOfRange {
                    min: *YEAR_RANGE.start(),
                    max: *YEAR_RANGE.end(),
                });
            }
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for raw in &self.tags {
            match normalize_tag(raw) {
                Ok(tag) if !tags.contains(&tag) => tags.push(tag),
                Ok(_) | Err(TagError::Empty) => {}
                Err(err) => errors.push(err),
            }
        }
        if tags.len() > MAX_TAGS {
            errors.push(TagError::LimitReached { max: MAX_TAGS });
        }

        if self.photos.len() > MAX_PHOTOS {
            errors.push(FieldError::TooManyPhotos { max: MAX_PHOTOS });
        }

        let Some(place) = self.location.as_ref().filter(|_| errors.is_empty()) else {
            return Err(errors);
        };

        let mut photos = self.photos.clone();
        for (i, photo) in photos.iter_mut().enumerate() {
            photo.display_order = i as u32;
        }

        Ok(NewMemory {
            author_id: author_id.to_string(),
            title: if title.is_empty() {
                UNTITLED.to_string()
            } else {
                title.to_string()
            },
            story: story.to_string(),
            language: detect_language(story),
            location_name: place.name.trim().to_string(),
            position: place.position,
            year: self.year,
            time_period: self.year.map(time_period),
            tags,
            photos,
        })
    }
}
