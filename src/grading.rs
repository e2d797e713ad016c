//! Grading of a submitted citation against the canonical answer.
//!
//! An answer is either exactly right or wrong; there is no partial credit.
//! The character-level diff only explains the verdict.

use std::iter::Peekable;

use serde::Serialize;
use similar::{capture_diff_slices, Algorithm, DiffOp, DiffTag};
use thiserror::Error;
use tracing::error;

use crate::store::{read_canonical, Store, StoreError, APA_CITATION_KEY};

/// Errors that can occur when grading against the store.
#[derive(Error, Debug)]
pub enum GradeError {
    #[error("No canonical citation found under 'apa_citation'")]
    MissingCanonical,

    #[error("Failed to read canonical citation: {0}")]
    Store(#[from] StoreError),
}

/// How a diff segment relates the answer to the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Present in both
    Unchanged,
    /// Missing from the answer, present in the canonical string
    Added,
    /// Present in the answer, absent from the canonical string
    Removed,
}

/// A run of characters sharing one [`DiffKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSegment {
    pub text: String,
    pub kind: DiffKind,
}

impl DiffSegment {
    fn new(chars: &[char], kind: DiffKind) -> Self {
        Self {
            text: chars.iter().collect(),
            kind,
        }
    }
}

/// Character-level edit script from a (trimmed) answer to the (trimmed)
/// canonical string.
#[derive(Debug, Clone)]
pub struct Diff {
    answer: Vec<char>,
    canonical: Vec<char>,
    ops: Vec<DiffOp>,
}

impl Diff {
    pub fn new(answer: &str, canonical: &str) -> Self {
        let answer: Vec<char> = answer.chars().collect();
        let canonical: Vec<char> = canonical.chars().collect();
        let ops = capture_diff_slices(Algorithm::Myers, &answer[..], &canonical[..]);
        Self {
            answer,
            canonical,
            ops,
        }
    }

    /// Iterates over the diff segments in order.
    ///
    /// Segments are produced lazily; each call starts over from the beginning.
    /// Adjacent segments of the same kind are merged.
    pub fn segments(&self) -> impl Iterator<Item = DiffSegment> + '_ {
        Coalesce::new(self.ops.iter().flat_map(move |op| self.op_segments(op)))
    }

    fn op_segments(&self, op: &DiffOp) -> impl Iterator<Item = DiffSegment> {
        let (tag, old, new) = op.as_tag_tuple();
        let removed = || DiffSegment::new(&self.answer[old.clone()], DiffKind::Removed);
        let added = || DiffSegment::new(&self.canonical[new.clone()], DiffKind::Added);

        let pair = match tag {
            DiffTag::Equal => [
                Some(DiffSegment::new(&self.answer[old.clone()], DiffKind::Unchanged)),
                None,
            ],
            DiffTag::Delete => [Some(removed()), None],
            DiffTag::Insert => [Some(added()), None],
            DiffTag::Replace => [Some(removed()), Some(added())],
        };
        pair.into_iter().flatten()
    }

    /// The (trimmed) canonical string this diff was computed against.
    pub fn canonical(&self) -> String {
        self.canonical.iter().collect()
    }

    /// True when the answer and canonical string are identical.
    pub fn is_identical(&self) -> bool {
        self.segments().all(|s| s.kind == DiffKind::Unchanged)
    }
}

/// Merges consecutive segments of the same kind.
struct Coalesce<I: Iterator<Item = DiffSegment>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = DiffSegment>> Coalesce<I> {
    fn new(inner: I) -> Self {
        Self {
            inner: inner.peekable(),
        }
    }
}

impl<I: Iterator<Item = DiffSegment>> Iterator for Coalesce<I> {
    type Item = DiffSegment;

    fn next(&mut self) -> Option<DiffSegment> {
        let mut current = self.inner.next()?;
        while let Some(next) = self.inner.next_if(|s| s.kind == current.kind) {
            current.text.push_str(&next.text);
        }
        Some(current)
    }
}

/// The verdict on one submission.
#[derive(Debug, Clone)]
pub struct Grade {
    pub is_correct: bool,
    pub diff: Diff,
}

/// Grades `answer` against `canonical`.
///
/// Both sides are trimmed; the answer is correct only if the trimmed strings
/// are identical.
///
/// # Examples
///
/// ```
/// use apa_daily::{grade, DiffKind};
///
/// let result = grade("  Lee, A. B. (2023).  ", "Lee, A. B. (2023).");
/// assert!(result.is_correct);
///
/// let result = grade("Lee, A. (2023).", "Lee, A. B. (2023).");
/// assert!(!result.is_correct);
/// assert!(result.diff.segments().any(|s| s.kind == DiffKind::Added));
/// ```
pub fn grade(answer: &str, canonical: &str) -> Grade {
    let answer = answer.trim();
    let canonical = canonical.trim();

    Grade {
        is_correct: answer == canonical,
        diff: Diff::new(answer, canonical),
    }
}

/// Grades `answer` against the canonical string held in the store.
///
/// A missing or blank canonical string is an error; no stand-in answer is
/// used.
pub fn grade_from_store(store: &dyn Store, answer: &str) -> Result<Grade, GradeError> {
    let canonical = read_canonical(store)
        .inspect_err(|e| error!(error = %e, "failed to read canonical citation"))?
        .ok_or_else(|| {
            error!(key = APA_CITATION_KEY, "no canonical citation found");
            GradeError::MissingCanonical
        })?;

    Ok(grade(answer, &canonical))
}
