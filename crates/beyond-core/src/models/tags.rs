use serde::{Deserialize, Serialize};

/// Insertion-ordered, deduplicated set of trimmed labels.
///
/// Tags are a convenience affordance: invalid input is ignored, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns whether the set changed.
    pub fn add(&mut self, raw: &str) -> bool {
        let tag = raw.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Add every comma-separated entry of `raw`.
    pub fn extend_csv(&mut self, raw: &str) {
        for part in raw.split(',') {
            self.add(part);
        }
    }

    /// Remove a tag. Returns whether it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Current tags in insertion order.
    pub fn list(&self) -> &[String] {
        &self.tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.add(tag);
        }
        set
    }
}
