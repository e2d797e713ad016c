//! Bibliographic source: OpenAlex random works.
//!
//! Only the fields the generator consumes are modelled. Every field is
//! optional because OpenAlex omits or nulls them freely.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Endpoint returning one randomly selected work.
pub const OPENALEX_RANDOM_URL: &str = "https://api.openalex.org/works/random";

/// Errors that can occur when fetching a work.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {message}")]
    Unreachable { url: String, message: String },

    #[error("Source answered with status {status}")]
    Status { status: u16 },

    #[error("Invalid work record: {0}")]
    InvalidRecord(String),
}

/// A scholarly work as returned by the source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Work {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "type")]
    pub work_type: Option<String>,
    /// The work's title
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub primary_location: Option<Location>,
    #[serde(default)]
    pub biblio: Option<Biblio>,
    #[serde(default)]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub source: Option<Source>,
}

/// The venue (journal) a work was published in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Biblio {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub first_page: Option<String>,
    #[serde(default)]
    pub last_page: Option<String>,
}

impl Work {
    /// Number of whitespace-separated words in the title (0 if untitled).
    pub fn title_word_count(&self) -> usize {
        self.display_name
            .as_deref()
            .map_or(0, |t| t.split_whitespace().count())
    }

    pub fn source(&self) -> Option<&Source> {
        self.primary_location.as_ref()?.source.as_ref()
    }

    pub fn periodical(&self) -> Option<&str> {
        self.source()?.display_name.as_deref()
    }

    pub fn volume(&self) -> Option<&str> {
        self.source()?.volume.as_deref()
    }

    pub fn issue(&self) -> Option<&str> {
        self.biblio.as_ref()?.issue.as_deref()
    }

    pub fn first_page(&self) -> Option<&str> {
        self.biblio.as_ref()?.first_page.as_deref()
    }

    pub fn last_page(&self) -> Option<&str> {
        self.biblio.as_ref()?.last_page.as_deref()
    }
}

/// Anything that can hand out a randomly selected work.
pub trait WorkSource {
    fn random_work(&self) -> Result<Work, SourceError>;
}

/// Blocking client for the OpenAlex API.
#[derive(Clone)]
pub struct OpenAlexClient {
    http_client: Client,
    url: String,
}

impl OpenAlexClient {
    pub fn new(http_client: Client) -> Self {
        Self::with_url(http_client, OPENALEX_RANDOM_URL)
    }

    pub fn with_url(http_client: Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
        }
    }

    /// Builds a client with a request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            SourceError::Unreachable {
                url: OPENALEX_RANDOM_URL.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::new(http_client))
    }
}

impl WorkSource for OpenAlexClient {
    fn random_work(&self) -> Result<Work, SourceError> {
        debug!(url = %self.url, "fetching random work");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .map_err(|e| SourceError::Unreachable {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Work>()
            .map_err(|e| SourceError::InvalidRecord(e.to_string()))
    }
}
