use thiserror::Error;

pub const MAX_TAGS: usize = 10;
pub const TAG_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag is empty")]
    Empty,
    #[error("Tag too long (max {max} characters): {tag}")]
    TooLong { tag: String, max: usize },
    #[error("Tag already added: {0}")]
    Duplicate(String),
    #[error("Maximum {max} tags allowed")]
    LimitReached { max: usize },
}

/// Trims and lower-cases a tag, rejecting empty or overlong input.
pub fn normalize_tag(raw: &str) -> Result<String, TagError> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        return Err(TagError::Empty);
    }
    if tag.chars().count() > TAG_MAX_CHARS {
        return Err(TagError::TooLong {
            tag,
            max: TAG_MAX_CHARS,
        });
    }
    Ok(tag)
}

/// Ordered, case-folded, duplicate-free tag list capped at [`MAX_TAGS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, raw: &str) -> Result<&str, TagError> {
        let tag = normalize_tag(raw)?;
        if self.tags.len() >= MAX_TAGS {
            return Err(TagError::LimitReached { max: MAX_TAGS });
        }
        if self.tags.contains(&tag) {
            return Err(TagError::Duplicate(tag));
        }
        self.tags.push(tag);
        Ok(self.tags.last().map(String::as_str).unwrap_or_default())
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Drops the last tag, like backspace on an empty input.
    pub fn pop(&mut self) -> Option<String> {
        self.tags.pop()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_TAGS, TagError, TagSet, normalize_tag};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_tag("  Family "), Ok("family".to_string()));
        assert_eq!(normalize_tag("   "), Err(TagError::Empty));
        assert!(matches!(
            normalize_tag(&"x".repeat(31)),
            Err(TagError::TooLong { max: 30, .. })
        ));
    }

    #[test]
    fn rejects_duplicates_after_folding() {
        let mut tags = TagSet::new();
        tags.add("Brussels").unwrap();
        assert_eq!(
            tags.add("BRUSSELS"),
            Err(TagError::Duplicate("brussels".to_string()))
        );
        assert_eq!(tags.as_slice(), ["brussels".to_string()]);
    }

    #[test]
    fn caps_at_ten() {
        let mut tags = TagSet::new();
        for i in 0..MAX_TAGS {
            tags.add(&format!("tag{i}")).unwrap();
        }
        assert_eq!(tags.add("one-more"), Err(TagError::LimitReached { max: 10 }));
        assert_eq!(tags.pop().as_deref(), Some("tag9"));
        assert_eq!(tags.remove(42), None);
    }
}
