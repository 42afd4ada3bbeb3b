use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    Auto,
    User,
}

/// A label on a file. Identity is `(name, source)`: an auto tag and a user
/// tag with the same name are different tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTag {
    pub name: String,
    pub source: TagSource,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}

impl FileTag {
    pub fn new(name: impl Into<String>, source: TagSource, confidence: f32) -> Self {
        Self {
            name: name.into(),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }

    pub fn auto(name: impl Into<String>, confidence: f32) -> Self {
        Self::new(name, TagSource::Auto, confidence)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, TagSource::User, 1.0)
    }
}

impl PartialEq for FileTag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.source == other.source
    }
}

impl Eq for FileTag {}

impl Hash for FileTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.source.hash(state);
    }
}

impl Ord for FileTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for FileTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub type TagSet = BTreeSet<FileTag>;

/// Insert `tag`, keeping whichever of the two equal tags is more confident.
pub fn insert_tag(tags: &mut TagSet, tag: FileTag) {
    match tags.get(&tag) {
        Some(existing) if existing.confidence >= tag.confidence => {}
        _ => {
            tags.replace(tag);
        }
    }
}

/// Size ladder: tiny < 1 KiB <= small < 1 MiB <= medium < 10 MiB <= large < 100 MiB <= huge.
pub fn size_bucket(size: u64) -> &'static str {
    match size {
        s if s < KIB => "tiny",
        s if s < MIB => "small",
        s if s < 10 * MIB => "medium",
        s if s < 100 * MIB => "large",
        _ => "huge",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_buckets() {
        assert_eq!(size_bucket(500), "tiny");
        assert_eq!(size_bucket(1023), "tiny");
        assert_eq!(size_bucket(1024), "small");
        assert_eq!(size_bucket(5 * MIB), "medium");
        assert_eq!(size_bucket(10 * MIB), "large");
        assert_eq!(size_bucket(100 * MIB), "huge");
    }

    #[test]
    fn test_identity_is_name_and_source() {
        let mut tags = TagSet::new();
        insert_tag(&mut tags, FileTag::auto("status:Final", 0.8));
        insert_tag(&mut tags, FileTag::user("status:Final"));
        assert_eq!(tags.len(), 2);

        insert_tag(&mut tags, FileTag::auto("status:Final", 0.9));
        assert_eq!(tags.len(), 2);
        let auto = tags
            .iter()
            .find(|t| t.source == TagSource::Auto)
            .unwrap();
        assert!((auto.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lower_confidence_does_not_replace() {
        let mut tags = TagSet::new();
        insert_tag(&mut tags, FileTag::auto("project:ABC-100", 0.9));
        insert_tag(&mut tags, FileTag::auto("project:ABC-100", 0.6));
        assert!((tags.iter().next().unwrap().confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(FileTag::auto("x", 1.5).confidence, 1.0);
        assert_eq!(FileTag::auto("x", -0.5).confidence, 0.0);
    }
}
