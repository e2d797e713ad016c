//! apa-daily: a daily APA citation challenge.
//!
//! This library provides functionality to:
//! - Fetch a random scholarly work and turn it into a citation with invented authors
//! - Format the canonical APA 7 reference for it
//! - Publish and read today's citation through a key-value store
//! - Grade a submitted answer and diff it against the canonical string
//! - Gate submissions to one per day and track the streak

pub mod apa;
pub mod gate;
pub mod generator;
pub mod grading;
pub mod hints;
pub mod names;
pub mod openalex;
pub mod record;
pub mod render;
pub mod schedule;
pub mod store;

pub use apa::{format_apa_citation, format_authors};
pub use gate::{
    can_submit, next_milestone, rank, time_until_reset, Celebration, CompletionState, GateError,
    Rank, SubmissionOutcome, CHALLENGE_TIME_ZONE,
};
pub use generator::{
    generate_and_publish, publish, GenerateError, Generator, GeneratorSettings,
};
pub use grading::{grade, grade_from_store, Diff, DiffKind, DiffSegment, Grade, GradeError};
pub use hints::hints;
pub use names::{NameSource, RandomNames};
pub use openalex::{OpenAlexClient, SourceError, Work, WorkSource};
pub use record::{AuthorName, CitationRecord, DailyCitation};
pub use render::{emphasis_spans, render_diff, RenderMode, Span};
pub use store::{
    read_canonical, read_citation, read_citation_or_fallback, FileStore, MemoryStore, Store,
    StoreError, UpstashStore, APA_CITATION_KEY, CURRENT_CITATION_KEY,
};
