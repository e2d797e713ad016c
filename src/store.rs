//! Shared key-value store.
//!
//! The generator writes today's citation here and the reader and grading paths
//! read it back. The store is an explicitly constructed client handed to each
//! path; there is no process-wide connection.
//!
//! Two keys are used:
//! - [`CURRENT_CITATION_KEY`]: the `CitationRecord` as a JSON document
//! - [`APA_CITATION_KEY`]: the canonical APA string, read only when grading

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::record::CitationRecord;

pub const CURRENT_CITATION_KEY: &str = "current_citation";
pub const APA_CITATION_KEY: &str = "apa_citation";

/// Errors that can occur when talking to the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Store answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Store rejected command: {0}")]
    Command(String),

    #[error("Failed to access store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Value under '{key}' is malformed: {message}")]
    Malformed { key: String, message: String },
}

/// A string key-value store with JSON document support.
pub trait Store {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores a JSON document. Defaults to storing its serialized text.
    fn set_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.set(key, &value.to_string())
    }

    /// Writes today's record document and canonical string together.
    ///
    /// The default issues two writes; stores that can write both keys in one
    /// operation override it so a reader never sees one key updated without
    /// the other.
    fn set_citation(&self, document: &Value, apa: &str) -> Result<(), StoreError> {
        self.set_json(CURRENT_CITATION_KEY, document)?;
        self.set(APA_CITATION_KEY, apa)
    }

    /// Reads a JSON document written by [`Store::set_json`].
    fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.get(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

impl<S: Store + ?Sized> Store for &S {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        (**self).set_json(key, value)
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get_json(key)
    }

    fn set_citation(&self, document: &Value, apa: &str) -> Result<(), StoreError> {
        (**self).set_citation(document, apa)
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Reads today's citation record, if one has been published.
pub fn read_citation(store: &dyn Store) -> Result<Option<CitationRecord>, StoreError> {
    let Some(value) = store.get_json(CURRENT_CITATION_KEY)? else {
        return Ok(None);
    };

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StoreError::Malformed {
            key: CURRENT_CITATION_KEY.to_string(),
            message: e.to_string(),
        })
}

/// Reads today's citation for display, falling back to a placeholder record.
///
/// This is the degraded path: any failure is logged and replaced by
/// [`CitationRecord::fallback`].
pub fn read_citation_or_fallback(store: &dyn Store) -> CitationRecord {
    match read_citation(store) {
        Ok(Some(record)) => record,
        Ok(None) => {
            warn!(key = CURRENT_CITATION_KEY, "no citation data found, using fallback");
            CitationRecord::fallback()
        }
        Err(e) => {
            warn!(key = CURRENT_CITATION_KEY, error = %e, "failed to read citation, using fallback");
            CitationRecord::fallback()
        }
    }
}

/// Reads the canonical APA string.
///
/// A blank value counts as missing: there is nothing to grade against.
pub fn read_canonical(store: &dyn Store) -> Result<Option<String>, StoreError> {
    Ok(store
        .get(APA_CITATION_KEY)?
        .filter(|canonical| !canonical.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Request("memory store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Request("memory store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set_citation(&self, document: &Value, apa: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Request("memory store lock poisoned".to_string()))?;
        values.insert(CURRENT_CITATION_KEY.to_string(), document.to_string());
        values.insert(APA_CITATION_KEY.to_string(), apa.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Store backed by a single JSON object file.
///
/// Plain strings are stored as JSON strings and documents as nested JSON, so
/// the file stays readable:
///
/// ```json
/// {
///   "apa_citation": "Lee, A. B. (2023). ...",
///   "current_citation": { "authors": ["Ann B. Lee"], "publishedYear": 2023 }
/// }
/// ```
///
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, values: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value);
        self.save(&values)
    }
}

impl Store for FileStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put(key, Value::String(value.to_string()))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key).map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    fn set_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.put(key, value.clone())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set_citation(&self, document: &Value, apa: &str) -> Result<(), StoreError> {
        let mut values = self.load()?;
        values.insert(CURRENT_CITATION_KEY.to_string(), document.clone());
        values.insert(APA_CITATION_KEY.to_string(), Value::String(apa.to_string()));
        self.save(&values)
    }
}

// ---------------------------------------------------------------------------
// UpstashStore
// ---------------------------------------------------------------------------

/// Client for a Redis database behind the Upstash REST API.
///
/// Each command is a `POST` of a JSON array (`["SET", key, value]`) with a
/// bearer token. Documents use RedisJSON (`JSON.SET key $ ...`).
#[derive(Clone)]
pub struct UpstashStore {
    http_client: Client,
    url: String,
    token: String,
}

impl UpstashStore {
    pub fn new(http_client: Client, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            token: token.into(),
        }
    }

    /// Runs one command and returns its `result` field.
    fn command(&self, args: &[&str]) -> Result<Value, StoreError> {
        debug!(command = args.first().copied().unwrap_or_default(), "upstash command");
        parse_upstash_response(self.post(&self.url, &args)?)
    }

    /// Runs commands in one MULTI/EXEC transaction and returns their results.
    fn transaction(&self, commands: &[Vec<&str>]) -> Result<Vec<Value>, StoreError> {
        debug!(commands = commands.len(), "upstash transaction");
        let url = format!("{}/multi-exec", self.url.trim_end_matches('/'));
        parse_transaction_response(self.post(&url, &commands)?)
    }

    fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value, StoreError> {
        let response = self
            .http_client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(body)
            .send()
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| StoreError::Request(e.to_string()))
    }
}

/// Extracts `result` from an Upstash response, turning `error` into an error.
fn parse_upstash_response(mut body: Value) -> Result<Value, StoreError> {
    if let Some(error) = body.get("error") {
        let message = error.as_str().map_or_else(|| error.to_string(), str::to_string);
        return Err(StoreError::Command(message));
    }
    Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
}

/// Extracts the per-command results of a MULTI/EXEC response.
///
/// The whole transaction fails if any command reports an error.
fn parse_transaction_response(body: Value) -> Result<Vec<Value>, StoreError> {
    match body {
        Value::Array(items) => items.into_iter().map(parse_upstash_response).collect(),
        other => match parse_upstash_response(other)? {
            Value::Array(items) => items.into_iter().map(parse_upstash_response).collect(),
            result => Err(StoreError::Command(format!(
                "expected transaction results, got {}",
                result
            ))),
        },
    }
}

/// Unwraps a `JSON.GET key $` result: a JSON text holding a one-element array.
fn unwrap_json_path_result(key: &str, result: Value) -> Result<Option<Value>, StoreError> {
    let text = match result {
        Value::Null => return Ok(None),
        Value::String(text) => text,
        other => {
            return Err(StoreError::Malformed {
                key: key.to_string(),
                message: format!("expected a JSON string, got {}", other),
            })
        }
    };

    match serde_json::from_str::<Value>(&text)? {
        Value::Array(mut items) if !items.is_empty() => Ok(Some(items.swap_remove(0))),
        Value::Array(_) => Ok(None),
        other => Ok(Some(other)),
    }
}

impl Store for UpstashStore {
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.command(&["SET", key, value]).map(|_| ())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.command(&["GET", key])? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    fn set_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let document = value.to_string();
        self.command(&["JSON.SET", key, "$", &document]).map(|_| ())
    }

    fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let result = self.command(&["JSON.GET", key, "$"])?;
        unwrap_json_path_result(key, result)
    }

    fn set_citation(&self, document: &Value, apa: &str) -> Result<(), StoreError> {
        let document = document.to_string();
        self.transaction(&[
            vec!["JSON.SET", CURRENT_CITATION_KEY, "$", document.as_str()],
            vec!["SET", APA_CITATION_KEY, apa],
        ])
        .map(|_| ())
    }
}

/// Serializes a record for [`Store::set_json`].
pub fn record_document(record: &CitationRecord) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(record)?)
}
