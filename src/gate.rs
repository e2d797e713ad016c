//! Daily completion gate and streak tracking.
//!
//! One submission is accepted per calendar day in the challenge time zone
//! (America/New_York). The check trusts the caller's clock: whoever holds the
//! `CompletionState` can move `last_completed` and submit again.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Time zone whose calendar day bounds one challenge.
pub const CHALLENGE_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// Streak lengths that trigger a full celebration.
pub const MILESTONES: [u32; 4] = [5, 10, 20, 30];

/// Errors raised by the gate.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("Today's citation is already completed (resets in {resets_in})")]
    AlreadyCompleted { resets_in: String },
}

/// Calendar date of `instant` in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn same_local_day(a: DateTime<Utc>, b: DateTime<Utc>, tz: Tz) -> bool {
    local_date(a, tz) == local_date(b, tz)
}

/// A new submission is allowed when the last completion fell on another
/// local calendar date.
pub fn can_submit(last_completed: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> bool {
    !same_local_day(last_completed, now, tz)
}

/// First instant of the local day after `now`.
///
/// If local midnight does not exist (a DST gap), the first existing hour of
/// that day is used.
pub fn next_local_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let Some(tomorrow) = local_date(now, tz).succ_opt() else {
        return now + Duration::days(1);
    };

    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| tz.from_local_datetime(&tomorrow.and_time(time)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Time left until the gate reopens.
pub fn time_until_reset(now: DateTime<Utc>, tz: Tz) -> Duration {
    next_local_midnight(now, tz) - now
}

/// Formats a countdown as `HH:MM:SS`.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Celebration level for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Celebration {
    None,
    Light,
    Full,
}

/// Title earned at a streak length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Rookie,
    Star,
    Champion,
    Legend,
}

impl Rank {
    pub fn title(self) -> &'static str {
        match self {
            Rank::Rookie => "Citation Rookie",
            Rank::Star => "Citation Star",
            Rank::Champion => "Citation Champion",
            Rank::Legend => "Citation Legend",
        }
    }

    pub fn min_streak(self) -> u32 {
        match self {
            Rank::Rookie => 5,
            Rank::Star => 10,
            Rank::Champion => 20,
            Rank::Legend => 30,
        }
    }
}

/// Highest rank reached at `streak`, if any.
pub fn rank(streak: u32) -> Option<Rank> {
    [Rank::Legend, Rank::Champion, Rank::Star, Rank::Rookie]
        .into_iter()
        .find(|r| streak >= r.min_streak())
}

/// The next milestone above `streak`, or `None` past the last one.
pub fn next_milestone(streak: u32) -> Option<u32> {
    MILESTONES.into_iter().find(|&m| streak < m)
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub is_correct: bool,
    pub streak: u32,
    /// Set when this submission reached a milestone
    pub milestone: Option<u32>,
    pub celebration: Celebration,
}

/// Per-player progress, owned and persisted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionState {
    pub streak: u32,
    pub last_completed: DateTime<Utc>,
}

impl Default for CompletionState {
    fn default() -> Self {
        Self {
            streak: 0,
            last_completed: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl CompletionState {
    pub fn is_completed_today(&self, now: DateTime<Utc>, tz: Tz) -> bool {
        same_local_day(self.last_completed, now, tz)
    }

    /// Records a graded submission made at `now`.
    ///
    /// Rejected if a submission was already accepted on the same local date.
    /// Otherwise `last_completed` moves to `now` whatever the verdict; a
    /// correct answer extends the streak and a wrong one resets it.
    pub fn submit(
        &mut self,
        now: DateTime<Utc>,
        is_correct: bool,
        tz: Tz,
    ) -> Result<SubmissionOutcome, GateError> {
        if !can_submit(self.last_completed, now, tz) {
            return Err(GateError::AlreadyCompleted {
                resets_in: format_countdown(time_until_reset(now, tz)),
            });
        }

        self.last_completed = now;

        if !is_correct {
            info!(previous = self.streak, "streak reset");
            self.streak = 0;
            return Ok(SubmissionOutcome {
                is_correct,
                streak: 0,
                milestone: None,
                celebration: Celebration::None,
            });
        }

        self.streak += 1;
        let milestone = MILESTONES.contains(&self.streak).then_some(self.streak);
        info!(streak = self.streak, ?milestone, "streak extended");

        Ok(SubmissionOutcome {
            is_correct,
            streak: self.streak,
            milestone,
            celebration: if milestone.is_some() {
                Celebration::Full
            } else {
                Celebration::Light
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    const NY: Tz = CHALLENGE_TIME_ZONE;

    #[test]
    fn test_same_day_in_new_york_blocks_second_submission() {
        // Given: Two instants on 2024-03-01 in New York (EST, UTC-5)
        let first = utc("2024-03-01T14:00:00Z");
        let second = utc("2024-03-02T04:30:00Z"); // 23:30 local

        // Then: The second submission is blocked
        assert!(same_local_day(first, second, NY));
        assert!(!can_submit(first, second, NY));
    }

    #[test]
    fn test_local_midnight_reopens_gate() {
        // Given: 23:59 and 00:01 local time, straddling New York midnight
        let before = utc("2024-03-02T04:59:00Z");
        let after = utc("2024-03-02T05:01:00Z");

        // Then: The second instant is on a new local day
        assert!(can_submit(before, after, NY));
    }

    #[test]
    fn test_utc_midnight_is_not_the_boundary() {
        // 23:00 UTC and 01:00 UTC next day are both the same New York evening
        let a = utc("2024-07-10T23:00:00Z");
        let b = utc("2024-07-11T01:00:00Z");
        assert!(!can_submit(a, b, NY));
    }

    #[test]
    fn test_next_local_midnight_est_and_edt() {
        // Winter: UTC-5
        assert_eq!(
            next_local_midnight(utc("2024-01-15T12:00:00Z"), NY),
            utc("2024-01-16T05:00:00Z")
        );
        // Summer: UTC-4
        assert_eq!(
            next_local_midnight(utc("2024-07-15T12:00:00Z"), NY),
            utc("2024-07-16T04:00:00Z")
        );
    }

    #[test]
    fn test_next_local_midnight_across_dst_change() {
        // 2024-03-10 is the spring-forward day; the following midnight is EDT
        assert_eq!(
            next_local_midnight(utc("2024-03-10T12:00:00Z"), NY),
            utc("2024-03-11T04:00:00Z")
        );
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::seconds(3661)), "01:01:01");
        assert_eq!(format_countdown(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_countdown(Duration::seconds(-5)), "00:00:00");
        assert_eq!(format_countdown(Duration::hours(23) + Duration::minutes(59)), "23:59:00");
    }

    #[test]
    fn test_default_state_allows_submission() {
        let state = CompletionState::default();
        assert_eq!(state.streak, 0);
        assert!(!state.is_completed_today(utc("2025-05-05T12:00:00Z"), NY));
    }

    #[test]
    fn test_submit_correct_extends_streak() {
        let mut state = CompletionState {
            streak: 2,
            last_completed: utc("2024-03-01T14:00:00Z"),
        };
        let now = utc("2024-03-02T14:00:00Z");

        let outcome = state.submit(now, true, NY).unwrap();

        assert_eq!(outcome.streak, 3);
        assert_eq!(outcome.celebration, Celebration::Light);
        assert_eq!(outcome.milestone, None);
        assert_eq!(state.last_completed, now);
    }

    #[test]
    fn test_submit_wrong_resets_streak_and_still_blocks() {
        // Given: A streak of 7
        let mut state = CompletionState {
            streak: 7,
            last_completed: utc("2024-03-01T14:00:00Z"),
        };
        let now = utc("2024-03-02T14:00:00Z");

        // When: A wrong answer is submitted
        let outcome = state.submit(now, false, NY).unwrap();

        // Then: The streak resets and the day is used up
        assert_eq!(outcome.streak, 0);
        assert_eq!(outcome.celebration, Celebration::None);
        assert_eq!(state.streak, 0);
        assert!(state.submit(now + Duration::minutes(5), true, NY).is_err());
    }

    #[test]
    fn test_submit_same_day_rejected_with_countdown() {
        let mut state = CompletionState {
            streak: 1,
            last_completed: utc("2024-01-15T12:00:00Z"),
        };

        let err = state
            .submit(utc("2024-01-15T17:00:00Z"), true, NY)
            .unwrap_err();

        // 12:00 local, midnight is 12 hours away
        assert_eq!(
            err,
            GateError::AlreadyCompleted {
                resets_in: "12:00:00".to_string()
            }
        );
        assert_eq!(state.streak, 1);
    }

    #[test]
    fn test_submit_reaching_milestone_is_full_celebration() {
        for milestone in MILESTONES {
            let mut state = CompletionState {
                streak: milestone - 1,
                last_completed: utc("2024-03-01T14:00:00Z"),
            };

            let outcome = state.submit(utc("2024-03-02T14:00:00Z"), true, NY).unwrap();

            assert_eq!(outcome.milestone, Some(milestone));
            assert_eq!(outcome.celebration, Celebration::Full);
        }
    }

    #[test]
    fn test_rank_and_next_milestone() {
        assert_eq!(rank(0), None);
        assert_eq!(rank(4), None);
        assert_eq!(rank(5), Some(Rank::Rookie));
        assert_eq!(rank(19), Some(Rank::Star));
        assert_eq!(rank(20), Some(Rank::Champion));
        assert_eq!(rank(45), Some(Rank::Legend));

        assert_eq!(next_milestone(0), Some(5));
        assert_eq!(next_milestone(5), Some(10));
        assert_eq!(next_milestone(29), Some(30));
        assert_eq!(next_milestone(30), None);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = CompletionState {
            streak: 4,
            last_completed: utc("2024-03-01T14:00:00Z"),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["streak"], 4);
        assert_eq!(json["lastCompleted"], "2024-03-01T14:00:00Z");

        let back: CompletionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
