//! APA 7 formatting of the daily citation.
//!
//! Builds the canonical answer string from a `CitationRecord` and the author
//! names it was generated from.

use crate::record::{AuthorName, CitationRecord};

/// Formats one author as `Last, F. M.`.
fn format_author(author: &AuthorName) -> String {
    format!(
        "{}, {}. {}.",
        author.last_name,
        author.first_initial(),
        author.middle_initial
    )
}

/// Formats the author list of an APA reference.
///
/// Authors are separated by `, ` and the last one is introduced by `, & `:
///
/// - 1 author: `Last, F. M.`
/// - 2 authors: `Last1, F1. M1., & Last2, F2. M2.`
/// - 3 authors: `Last1, F1. M1., Last2, F2. M2., & Last3, F3. M3.`
///
/// # Examples
///
/// ```
/// use apa_daily::{format_authors, AuthorName};
///
/// let authors = vec![
///     AuthorName::new("Ann", "B", "Lee"),
///     AuthorName::new("Tom", "K", "Ross"),
/// ];
/// assert_eq!(format_authors(&authors), "Lee, A. B., & Ross, T. K.");
/// ```
pub fn format_authors(authors: &[AuthorName]) -> String {
    let formatted: Vec<String> = authors.iter().map(format_author).collect();

    match formatted.split_last() {
        None => String::new(),
        Some((only, [])) => only.clone(),
        Some((last, rest)) => format!("{}, & {}", rest.join(", "), last),
    }
}

/// Formats the full APA reference for a journal article.
///
/// Template: `<Authors> (<year>). <title>. *<periodical>, <volume>*(<issue>), <start>-<end>.`
/// followed by ` <doi>` when the record has one. Asterisks mark italics.
///
/// # Examples
///
/// ```
/// use apa_daily::{format_apa_citation, AuthorName, CitationRecord};
///
/// let record = CitationRecord {
///     authors: vec!["Ann B. Lee".to_string()],
///     published_year: 2023,
///     title: "A Short Title".to_string(),
///     periodical: "Nature".to_string(),
///     volume: "10".to_string(),
///     issue: "2".to_string(),
///     page_start: "5".to_string(),
///     page_end: "9".to_string(),
///     doi: None,
/// };
/// let apa = format_apa_citation(&record, &[AuthorName::new("Ann", "B", "Lee")]);
/// assert_eq!(apa, "Lee, A. B. (2023). A Short Title. *Nature, 10*(2), 5-9.");
/// ```
pub fn format_apa_citation(record: &CitationRecord, authors: &[AuthorName]) -> String {
    let mut apa = format!(
        "{} ({}). {}. *{}, {}*({}), {}-{}.",
        format_authors(authors),
        record.published_year,
        record.title,
        record.periodical,
        record.volume,
        record.issue,
        record.page_start,
        record.page_end
    );

    if let Some(doi) = record.doi.as_deref().filter(|d| !d.is_empty()) {
        apa.push(' ');
        apa.push_str(doi);
    }

    apa
}
