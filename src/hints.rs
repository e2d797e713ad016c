//! Hints shown on request while formatting today's citation.

use crate::record::CitationRecord;

/// Builds the hint lines for `record`.
pub fn hints(record: &CitationRecord) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} author(s). Separate authors with commas; use & before the last author.",
            record.authors.len()
        ),
        format!(
            "Year: {}. Year goes in parentheses after authors.",
            record.published_year
        ),
        format!(
            "Journal title is italicized. Volume {}({}), pages {}-{}.",
            record.volume, record.issue, record.page_start, record.page_end
        ),
    ];

    if record.doi.as_deref().is_some_and(|doi| !doi.is_empty()) {
        lines.push("Include DOI as https://doi.org/... at the end.".to_string());
    }

    lines.push(
        "Remember: Only italicize the journal name and volume number. Title in sentence case."
            .to_string(),
    );

    lines
}
