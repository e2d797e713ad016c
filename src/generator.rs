//! Daily citation generation.
//!
//! One invocation fetches works from a [`WorkSource`] until one qualifies,
//! invents the authors, fills in the record (with defaults for anything the
//! work lacks), shortens unwieldy DOIs and formats the canonical APA answer.
//! [`publish`] then writes both to the store.

use std::thread;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::apa::format_apa_citation;
use crate::names::{draw_bounded_name, NameSource};
use crate::openalex::{SourceError, Work, WorkSource};
use crate::record::{AuthorName, CitationRecord, DailyCitation};
use crate::store::{record_document, Store, StoreError, APA_CITATION_KEY, CURRENT_CITATION_KEY};

const DEFAULT_YEAR: i32 = 2025;
const DEFAULT_TITLE: &str = "Fictional Study";
const DEFAULT_PERIODICAL: &str = "The Journal of Fictional Studies";
const DEFAULT_VOLUME: &str = "5";
const DEFAULT_ISSUE: &str = "8";
const DEFAULT_PAGE_START: &str = "50";
const DEFAULT_PAGE_END: &str = "55";

const SHORT_DOI_PREFIX: &str = "https://doi.org/";
const SHORT_DOI_ID_LEN: usize = 10;
const SHORT_DOI_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Errors that can occur while generating a citation.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("No matching work found after {attempts} attempt(s)")]
    NoMatchingWork { attempts: usize },

    #[error("Bibliographic source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("No {kind} of at most {max_len} characters after {draws} draws")]
    NameExhausted {
        kind: &'static str,
        max_len: usize,
        draws: usize,
    },

    #[error("Failed to publish citation: {0}")]
    Store(#[from] StoreError),
}

/// Tunables for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Fetch budget for finding an acceptable work
    pub max_attempts: usize,
    /// Pause after each rejected work before fetching again
    pub retry_delay: Duration,
    pub max_title_words: usize,
    /// Longest accepted first or last name, in characters
    pub max_name_len: usize,
    /// Cap on rejection-sampling draws per name
    pub max_name_draws: usize,
    /// DOIs longer than this are replaced by a short synthetic one
    pub max_doi_len: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(5),
            max_title_words: 12,
            max_name_len: 6,
            max_name_draws: 1000,
            max_doi_len: 30,
        }
    }
}

/// Whether a work qualifies for the daily challenge: an English article whose
/// title has at most `max_title_words` words.
pub fn is_acceptable(work: &Work, max_title_words: usize) -> bool {
    work.language.as_deref() == Some("en")
        && work.work_type.as_deref() == Some("article")
        && work.title_word_count() <= max_title_words
}

/// Keeps a DOI of at most `max_len` characters; replaces a longer one with
/// `https://doi.org/<10 random URL-safe characters>`. An empty DOI is kept
/// as is; the APA string leaves it out.
pub fn shorten_doi<R: Rng + ?Sized>(
    doi: Option<&str>,
    max_len: usize,
    rng: &mut R,
) -> Option<String> {
    let doi = doi?;
    if doi.chars().count() <= max_len {
        return Some(doi.to_string());
    }

    let id: String = (0..SHORT_DOI_ID_LEN)
        .map(|_| SHORT_DOI_ALPHABET[rng.gen_range(0..SHORT_DOI_ALPHABET.len())] as char)
        .collect();
    Some(format!("{}{}", SHORT_DOI_PREFIX, id))
}

/// Builds the record for `work`, substituting defaults for missing fields.
pub fn build_record<R: Rng + ?Sized>(
    work: &Work,
    authors: &[AuthorName],
    max_doi_len: usize,
    rng: &mut R,
) -> CitationRecord {
    let or = |value: Option<&str>, default: &str| value.unwrap_or(default).to_string();

    CitationRecord {
        authors: authors.iter().map(AuthorName::display_name).collect(),
        published_year: work.publication_year.unwrap_or(DEFAULT_YEAR),
        title: or(work.display_name.as_deref(), DEFAULT_TITLE),
        periodical: or(work.periodical(), DEFAULT_PERIODICAL),
        volume: or(work.volume(), DEFAULT_VOLUME),
        issue: or(work.issue(), DEFAULT_ISSUE),
        page_start: or(work.first_page(), DEFAULT_PAGE_START),
        page_end: or(work.last_page(), DEFAULT_PAGE_END),
        doi: shorten_doi(work.doi.as_deref(), max_doi_len, rng),
    }
}

/// Turns a work and its invented authors into the day's citation.
pub fn assemble<R: Rng + ?Sized>(
    work: &Work,
    authors: Vec<AuthorName>,
    max_doi_len: usize,
    rng: &mut R,
) -> DailyCitation {
    let record = build_record(work, &authors, max_doi_len, rng);
    let apa = format_apa_citation(&record, &authors);
    DailyCitation {
        record,
        authors,
        apa,
    }
}

/// Produces one [`DailyCitation`] per call.
pub struct Generator<W, N, R> {
    source: W,
    names: N,
    rng: R,
    settings: GeneratorSettings,
}

impl<W: WorkSource, N: NameSource, R: Rng> Generator<W, N, R> {
    pub fn new(source: W, names: N, rng: R) -> Self {
        Self::with_settings(source, names, rng, GeneratorSettings::default())
    }

    pub fn with_settings(source: W, names: N, rng: R, settings: GeneratorSettings) -> Self {
        Self {
            source,
            names,
            rng,
            settings,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Fetches works until one is acceptable or the budget runs out.
    pub fn find_work(&mut self) -> Result<Work, GenerateError> {
        let max_attempts = self.settings.max_attempts;
        info!(max_attempts, "fetching work from source");

        for attempt in 1..=max_attempts {
            let work = self.source.random_work().map_err(|e| {
                error!(attempt, error = %e, "failed to fetch from source");
                GenerateError::SourceUnavailable(e)
            })?;

            let title_word_count = work.title_word_count();
            info!(
                attempt,
                language = work.language.as_deref().unwrap_or("-"),
                work_type = work.work_type.as_deref().unwrap_or("-"),
                title_word_count,
                doi = work.doi.as_deref().unwrap_or("-"),
                "checking work"
            );

            if is_acceptable(&work, self.settings.max_title_words) {
                info!(
                    attempt,
                    title = work.display_name.as_deref().unwrap_or("-"),
                    "found matching work"
                );
                return Ok(work);
            }

            warn!(attempt, "work rejected");
            if attempt < max_attempts && !self.settings.retry_delay.is_zero() {
                thread::sleep(self.settings.retry_delay);
            }
        }

        error!(attempts = max_attempts, "no matching work found");
        Err(GenerateError::NoMatchingWork {
            attempts: max_attempts,
        })
    }

    /// Invents 1 to 3 authors with short first and last names.
    pub fn synthesize_authors(&mut self) -> Result<Vec<AuthorName>, GenerateError> {
        let count = self.rng.gen_range(1..=3);
        let max_len = self.settings.max_name_len;
        let draws = self.settings.max_name_draws;

        let mut authors = Vec::with_capacity(count);
        for _ in 0..count {
            let names = &mut self.names;
            let first_name = draw_bounded_name(|| names.first_name(), max_len, draws)
                .ok_or_else(|| name_exhausted("first name", max_len, draws))?;
            let last_name = draw_bounded_name(|| names.last_name(), max_len, draws)
                .ok_or_else(|| name_exhausted("last name", max_len, draws))?;
            let middle_initial: String = names.middle_name().chars().take(1).collect();

            authors.push(AuthorName {
                first_name,
                middle_initial,
                last_name,
            });
        }

        Ok(authors)
    }

    /// Runs the whole generation: find a work, invent authors, format.
    pub fn generate(&mut self) -> Result<DailyCitation, GenerateError> {
        let work = self.find_work()?;
        let authors = self.synthesize_authors()?;
        let citation = assemble(&work, authors, self.settings.max_doi_len, &mut self.rng);

        info!(apa = %citation.apa, "apa citation");
        Ok(citation)
    }
}

fn name_exhausted(kind: &'static str, max_len: usize, draws: usize) -> GenerateError {
    error!(kind, max_len, draws, "name rejection sampling exhausted");
    GenerateError::NameExhausted {
        kind,
        max_len,
        draws,
    }
}

/// Writes the citation record and canonical string, replacing the previous day's.
///
/// Both keys go through [`Store::set_citation`], so the record and its answer
/// are replaced together.
pub fn publish(store: &dyn Store, citation: &DailyCitation) -> Result<(), StoreError> {
    store
        .set_citation(&record_document(&citation.record)?, &citation.apa)
        .inspect_err(|e| {
            error!(
                keys = ?[CURRENT_CITATION_KEY, APA_CITATION_KEY],
                error = %e,
                "failed to store citation"
            )
        })?;
    info!(
        keys = ?[CURRENT_CITATION_KEY, APA_CITATION_KEY],
        "citation updated"
    );

    Ok(())
}

/// Generates and publishes in one step.
pub fn generate_and_publish<W: WorkSource, N: NameSource, R: Rng>(
    generator: &mut Generator<W, N, R>,
    store: &dyn Store,
) -> Result<DailyCitation, GenerateError> {
    let citation = generator.generate()?;
    publish(store, &citation)?;
    Ok(citation)
}
