//! Shared test constants and helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

/// Canonical answer for [`sample_record_json`].
pub const CANONICAL: &str =
    "Lee, A. B. (2023). A Short Title. *Nature, 10*(2), 5-9. https://doi.org/10.1/x";

/// The OpenAlex work used in the end-to-end example.
pub const NATURE_WORK: &str = r#"{
    "language": "en",
    "type": "article",
    "display_name": "A Short Title",
    "publication_year": 2023,
    "primary_location": {"source": {"display_name": "Nature", "volume": "10"}},
    "biblio": {"issue": "2", "first_page": "5", "last_page": "9"},
    "doi": "https://doi.org/10.1/x"
}"#;

/// The stored citation record matching [`CANONICAL`].
pub fn sample_record_json() -> serde_json::Value {
    json!({
        "authors": ["Ann B. Lee"],
        "publishedYear": 2023,
        "title": "A Short Title",
        "periodical": "Nature",
        "volume": "10",
        "issue": "2",
        "pageStart": "5",
        "pageEnd": "9",
        "doi": "https://doi.org/10.1/x"
    })
}

/// Writes a file store holding today's record and canonical answer.
pub fn write_store(dir: &Path) -> PathBuf {
    let path = dir.join("store.json");
    let content = json!({
        "current_citation": sample_record_json(),
        "apa_citation": CANONICAL,
    });
    fs::write(&path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
    path
}
