//! Citation data model.
//!
//! `CitationRecord` is the structured document stored under `current_citation`
//! and shown to the user. `AuthorName` exists only while generating: the record
//! keeps display strings, not the initials needed to rebuild the APA string.

use serde::{Deserialize, Serialize};

/// A generated citation, as stored and displayed.
///
/// Field names serialize in camelCase (`publishedYear`, `pageStart`, ...) and
/// a missing DOI serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRecord {
    /// Author display strings, e.g. "Ann B. Lee" (1 to 3 entries)
    pub authors: Vec<String>,
    pub published_year: i32,
    pub title: String,
    /// Journal name
    pub periodical: String,
    pub volume: String,
    pub issue: String,
    pub page_start: String,
    pub page_end: String,
    pub doi: Option<String>,
}

impl CitationRecord {
    /// The record served when the store cannot provide today's citation.
    ///
    /// Only the display path uses it; grading never falls back.
    pub fn fallback() -> Self {
        CitationRecord {
            authors: vec!["John".to_string(), "Doe".to_string()],
            published_year: 2024,
            title: "Sample Research Paper".to_string(),
            periodical: "Journal of Studies".to_string(),
            volume: "1".to_string(),
            issue: "1".to_string(),
            page_start: "1".to_string(),
            page_end: "10".to_string(),
            doi: None,
        }
    }
}

/// A synthesized author name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub first_name: String,
    /// A single character, without the trailing period
    pub middle_initial: String,
    pub last_name: String,
}

impl AuthorName {
    pub fn new(
        first_name: impl Into<String>,
        middle_initial: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        AuthorName {
            first_name: first_name.into(),
            middle_initial: middle_initial.into(),
            last_name: last_name.into(),
        }
    }

    /// First character of the first name.
    pub fn first_initial(&self) -> &str {
        match self.first_name.char_indices().nth(1) {
            Some((end, _)) => &self.first_name[..end],
            None => &self.first_name,
        }
    }

    /// The form shown on the challenge card: "Ann B. Lee".
    pub fn display_name(&self) -> String {
        format!(
            "{} {}. {}",
            self.first_name, self.middle_initial, self.last_name
        )
    }
}

/// One day's generated challenge: the record, the names it was built from,
/// and the canonical APA answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCitation {
    pub record: CitationRecord,
    pub authors: Vec<AuthorName>,
    pub apa: String,
}
