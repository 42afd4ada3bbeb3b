use regex::Regex;
use serde::Serialize;

/// Examples kept per pattern.
pub const MAX_EXAMPLES: usize = 4;

/// A named rule run against lower-cased file names, plus the matches it has
/// seen over the lifetime of the engine that owns it.
#[derive(Debug, Clone)]
pub struct FilePattern {
    name: String,
    description: String,
    regex: Regex,
    match_count: usize,
    examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternStat {
    pub name: String,
    pub description: String,
    pub match_count: usize,
    pub examples: Vec<String>,
}

impl FilePattern {
    pub fn new(name: &str, pattern: &str, description: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            regex: Regex::new(pattern)?,
            match_count: 0,
            examples: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn is_match(&self, lower_name: &str) -> bool {
        self.regex.is_match(lower_name)
    }

    pub(crate) fn record_match(&mut self, file_name: &str) {
        self.match_count += 1;
        if self.examples.len() < MAX_EXAMPLES && !self.examples.iter().any(|e| e == file_name) {
            self.examples.push(file_name.to_string());
        }
    }

    pub fn stat(&self) -> PatternStat {
        PatternStat {
            name: self.name.clone(),
            description: self.description.clone(),
            match_count: self.match_count,
            examples: self.examples.clone(),
        }
    }
}

const LIBRARY: &[(&str, &str, &str)] = &[
    ("date", r"\d{4}-\d{2}-\d{2}", "Date pattern (YYYY-MM-DD)"),
    ("version", r"v\d+", "Version number"),
    ("sequence", r"[\w-]+_\d+", "Sequence number"),
    (
        "version-indicator",
        r"backup|bak|old|new|final|draft",
        "Version indicator",
    ),
    ("temporary", r"temp|tmp|cache", "Temporary file"),
    ("test-demo", r"test|demo|sample|example", "Test/Demo file"),
    ("data", r"data|export|import|report", "Data file"),
    ("config", r"config|settings|preferences", "Configuration file"),
];

/// The built-in pattern library.
pub fn default_patterns() -> Vec<FilePattern> {
    LIBRARY
        .iter()
        .filter_map(|(name, pattern, description)| {
            FilePattern::new(name, pattern, description).ok()
        })
        .collect()
}
