use super::content::{default_patterns, FilePattern, PatternStat};
use super::extensions::{categorize, ExtensionCategory};
use super::tags::{insert_tag, size_bucket, FileTag, TagSet, TagSource};
use crate::patterns::{parse_name, DirectoryGroup, ParsedName};
use crate::scanner::FileRecord;
use ahash::AHashMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONTENT_PATTERN_CONFIDENCE: f32 = 0.8;
const PARSED_NAME_CONFIDENCE: f32 = 0.9;
const DIRECTORY_PROJECT_CONFIDENCE: f32 = 0.95;
const DIRECTORY_CONFIDENCE: f32 = 0.9;

pub const MULTI_PROJECT_DIRECTORY: &str = "multi-project-directory";

/// A file record with everything the tagging engine derived for it.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedFile {
    pub record: FileRecord,
    pub category: Option<ExtensionCategory>,
    pub patterns: Vec<String>,
    pub parsed: ParsedName,
    pub tags: Vec<FileTag>,
    pub directory_info: Option<Value>,
}

/// Combines extension categories, content patterns, parsed names and
/// directory groups into per-file tags, and keeps user tags layered on top.
///
/// Pattern statistics accumulate across every file this instance sees,
/// including files from earlier scans when the instance is reused.
pub struct MetadataEngine {
    patterns: Vec<FilePattern>,
    tags: AHashMap<PathBuf, TagSet>,
}

impl Default for MetadataEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataEngine {
    pub fn new() -> Self {
        Self::with_patterns(default_patterns())
    }

    pub fn with_patterns(patterns: Vec<FilePattern>) -> Self {
        Self {
            patterns,
            tags: AHashMap::new(),
        }
    }

    /// Names of the library patterns matching `file_name` (compared
    /// lower-cased). Each match is counted in the pattern's statistics.
    pub fn detect_patterns(&mut self, file_name: &str) -> Vec<String> {
        let lower = file_name.to_lowercase();
        let mut matched = Vec::new();
        for pattern in self.patterns.iter_mut() {
            if pattern.is_match(&lower) {
                pattern.record_match(file_name);
                matched.push(pattern.name().to_string());
            }
        }
        matched
    }

    /// Auto tags for one file. Every source is applied independently.
    pub fn generate_tags(
        &self,
        file: &FileRecord,
        patterns: &[String],
        parsed: &ParsedName,
        group: Option<&DirectoryGroup>,
    ) -> TagSet {
        let mut tags = TagSet::new();

        if let Some(category) = categorize(file.extension.as_deref()) {
            insert_tag(&mut tags, FileTag::auto(format!("category:{}", category.main), 1.0));
            insert_tag(
                &mut tags,
                FileTag::auto(format!("subcategory:{}", category.sub), 1.0),
            );
        }

        for pattern in patterns {
            insert_tag(
                &mut tags,
                FileTag::auto(format!("pattern:{}", pattern), CONTENT_PATTERN_CONFIDENCE),
            );
        }

        insert_tag(
            &mut tags,
            FileTag::auto(format!("size:{}", size_bucket(file.size)), 1.0),
        );

        for (prefix, value) in [
            ("project", &parsed.project_code),
            ("discipline", &parsed.discipline),
            ("status", &parsed.status),
        ] {
            if let Some(value) = value {
                insert_tag(
                    &mut tags,
                    FileTag::auto(format!("{}:{}", prefix, value), PARSED_NAME_CONFIDENCE),
                );
            }
        }

        if let Some(group) = group {
            if let Some(code) = &group.project_code {
                insert_tag(
                    &mut tags,
                    FileTag::auto(
                        format!("dir-project:{}", code),
                        DIRECTORY_PROJECT_CONFIDENCE,
                    ),
                );
            }
            if let Some(pattern) = &group.pattern {
                for label in pattern.split(" + ") {
                    insert_tag(
                        &mut tags,
                        FileTag::auto(format!("dir-pattern:{}", label), DIRECTORY_CONFIDENCE),
                    );
                }
            }
            if group.is_multi_project() {
                insert_tag(
                    &mut tags,
                    FileTag::auto(MULTI_PROJECT_DIRECTORY, DIRECTORY_CONFIDENCE),
                );
            }
        }

        tags
    }

    /// Replace the auto tags stored for `file` with freshly generated ones.
    /// User tags already on the file are kept.
    pub fn tag_file(
        &mut self,
        file: &FileRecord,
        patterns: &[String],
        parsed: &ParsedName,
        group: Option<&DirectoryGroup>,
    ) -> Vec<FileTag> {
        let generated = self.generate_tags(file, patterns, parsed, group);
        let stored = self.tags.entry(file.path.clone()).or_default();
        stored.retain(|t| t.source == TagSource::User);
        stored.extend(generated);
        stored.iter().cloned().collect()
    }

    /// Parse, detect, categorize and tag one file.
    pub fn enrich(&mut self, file: &FileRecord, group: Option<&DirectoryGroup>) -> EnrichedFile {
        let parsed = parse_name(file.stem());
        let patterns = self.detect_patterns(&file.name);
        let tags = self.tag_file(file, &patterns, &parsed, group);
        EnrichedFile {
            record: file.clone(),
            category: categorize(file.extension.as_deref()),
            patterns,
            parsed,
            tags,
            directory_info: group.map(DirectoryGroup::summary),
        }
    }

    /// Returns false when the file already carries this user tag.
    pub fn add_user_tag(&mut self, path: &Path, name: &str) -> bool {
        self.tags
            .entry(path.to_path_buf())
            .or_default()
            .insert(FileTag::user(name))
    }

    /// Remove every tag called `name` from the file, whatever its source.
    /// Returns how many were removed.
    pub fn remove_tag(&mut self, path: &Path, name: &str) -> usize {
        let Some(tags) = self.tags.get_mut(path) else {
            return 0;
        };
        let before = tags.len();
        tags.retain(|t| t.name != name);
        let removed = before - tags.len();
        if removed > 0 {
            debug!("Removed {} tag(s) '{}' from {}", removed, name, path.display());
        }
        removed
    }

    pub fn tags_for(&self, path: &Path) -> Vec<FileTag> {
        self.tags
            .get(path)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn pattern_stats(&self) -> Vec<PatternStat> {
        self.patterns.iter().map(FilePattern::stat).collect()
    }

    /// Patterns seen at least once, most frequent first.
    pub fn most_common_patterns(&self, limit: usize) -> Vec<PatternStat> {
        let mut stats: Vec<PatternStat> = self
            .pattern_stats()
            .into_iter()
            .filter(|s| s.match_count > 0)
            .collect();
        stats.sort_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        stats.truncate(limit);
        stats
    }
}
