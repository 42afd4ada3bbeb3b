use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    ProjectCode,
    Version,
    Date,
    Sequence,
    Discipline,
    Status,
}

/// One fact found in a stem and where it started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameComponent {
    pub kind: ComponentKind,
    pub value: String,
    pub confidence: f32,
    pub position: usize,
}

/// Facts extracted from a file name stem. At most one value per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedName {
    pub project_code: Option<String>,
    pub version: Option<String>,
    pub date: Option<NaiveDate>,
    pub sequence: Option<u64>,
    pub discipline: Option<String>,
    pub status: Option<String>,
    /// Ordered by position in the stem.
    pub components: Vec<NameComponent>,
}

impl ParsedName {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&NameComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

pub const DISCIPLINES: &[(&str, &str)] = &[
    ("ARCH", "Architecture"),
    ("STR", "Structural"),
    ("MEP", "Mechanical/Electrical/Plumbing"),
    ("CIVIL", "Civil"),
    ("LAND", "Landscape"),
    ("INT", "Interior"),
    ("GEN", "General"),
];

pub const STATUSES: &[(&str, &str)] = &[
    ("DRAFT", "Draft"),
    ("REVIEW", "Under Review"),
    ("APPROVED", "Approved"),
    ("FINAL", "Final"),
    ("ISSUED", "Issued"),
    ("WIP", "Work in Progress"),
    ("SUPERSEDED", "Superseded"),
    ("ARCHIVED", "Archived"),
];

lazy_static::lazy_static! {
    // (pattern, confidence), highest priority first
    static ref PROJECT_CODE_PATTERNS: Vec<(Regex, f32)> = vec![
        (Regex::new(r"[A-Z]{2,4}-\d{3,6}").unwrap(), 0.9),
        (Regex::new(r"\d{4,6}-[A-Z]{2,4}").unwrap(), 0.9),
        (Regex::new(r"PRJ-\d{4,6}").unwrap(), 0.8),
        (Regex::new(r"P\d{5,8}").unwrap(), 0.7),
    ];

    // group 1: the version without its marker
    static ref VERSION_PATTERNS: Vec<Regex> = [
        r"[vV](\d+(?:\.\d+)*)",
        r"[rR](\d+(?:\.\d+)*)",
        r"_(\d+(?:\.\d+)*)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref DATE_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap(), "%Y-%m-%d"),
        (Regex::new(r"(\d{8})").unwrap(), "%Y%m%d"),
        (Regex::new(r"(\d{2}-\d{2}-\d{4})").unwrap(), "%d-%m-%Y"),
    ];

    static ref SEQUENCE_PATTERN: Regex = Regex::new(r"_(\d+)(?:_|$)").unwrap();
}

/// Extract project code, version, date, sequence, discipline and status from
/// a file name stem. Within each category the first pattern that matches wins.
pub fn parse_name(stem: &str) -> ParsedName {
    let mut parsed = ParsedName::default();
    let mut components = Vec::new();

    if let Some((value, position, confidence)) = match_project_code(stem) {
        parsed.project_code = Some(value.clone());
        components.push(NameComponent {
            kind: ComponentKind::ProjectCode,
            value,
            confidence,
            position,
        });
    }

    if let Some((value, position)) = match_version(stem) {
        parsed.version = Some(value.clone());
        components.push(component(ComponentKind::Version, value, position));
    }

    if let Some((date, position)) = match_date(stem) {
        parsed.date = Some(date);
        components.push(component(
            ComponentKind::Date,
            date.format("%Y-%m-%d").to_string(),
            position,
        ));
    }

    if let Some((sequence, position)) = match_sequence(stem) {
        parsed.sequence = Some(sequence);
        components.push(component(
            ComponentKind::Sequence,
            sequence.to_string(),
            position,
        ));
    }

    let upper = stem.to_uppercase();
    if let Some((label, position)) = match_vocabulary(&upper, DISCIPLINES) {
        parsed.discipline = Some(label.to_string());
        components.push(component(
            ComponentKind::Discipline,
            label.to_string(),
            position,
        ));
    }
    if let Some((label, position)) = match_vocabulary(&upper, STATUSES) {
        parsed.status = Some(label.to_string());
        components.push(component(ComponentKind::Status, label.to_string(), position));
    }

    components.sort_by_key(|c| c.position);
    parsed.components = components;
    parsed
}

/// Code, position and the confidence of the pattern that found it.
pub fn match_project_code(stem: &str) -> Option<(String, usize, f32)> {
    PROJECT_CODE_PATTERNS.iter().find_map(|(re, confidence)| {
        re.find(stem)
            .map(|m| (m.as_str().to_string(), m.start(), *confidence))
    })
}

pub fn match_version(stem: &str) -> Option<(String, usize)> {
    VERSION_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(stem)?;
        let token = caps.get(0)?;
        let value = caps.get(1)?;
        Some((value.as_str().to_string(), token.start()))
    })
}

/// A pattern whose text is not a real calendar date is skipped in favour of
/// the next one.
pub fn match_date(stem: &str) -> Option<(NaiveDate, usize)> {
    DATE_PATTERNS.iter().find_map(|(re, format)| {
        let m = re.captures(stem)?.get(1)?;
        NaiveDate::parse_from_str(m.as_str(), format)
            .ok()
            .map(|date| (date, m.start()))
    })
}

/// True when the stem carries a valid `YYYY-MM-DD` date.
pub fn has_iso_date(stem: &str) -> bool {
    let (re, format) = &DATE_PATTERNS[0];
    re.captures(stem)
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| NaiveDate::parse_from_str(m.as_str(), format).is_ok())
}

pub fn match_sequence(stem: &str) -> Option<(u64, usize)> {
    let m = SEQUENCE_PATTERN.captures(stem)?.get(1)?;
    m.as_str().parse().ok().map(|n| (n, m.start()))
}

fn match_vocabulary(
    upper_stem: &str,
    vocabulary: &'static [(&'static str, &'static str)],
) -> Option<(&'static str, usize)> {
    vocabulary
        .iter()
        .find_map(|(key, label)| upper_stem.find(key).map(|pos| (*label, pos)))
}

/// Only project codes are weighted; every other matcher is taken at face value.
fn component(kind: ComponentKind, value: String, position: usize) -> NameComponent {
    NameComponent {
        kind,
        value,
        confidence: 1.0,
        position,
    }
}
