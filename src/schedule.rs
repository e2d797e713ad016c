//! Daily scheduling of the generator.
//!
//! The job runs at local midnight (`0 0 * * *`) in the schedule time zone. A
//! failed run is retried a few times as a whole; this sits outside the
//! generator's own fetch budget.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::Rng;
use tracing::{error, info, warn};

use crate::gate::next_local_midnight;
use crate::generator::{generate_and_publish, GenerateError, Generator};
use crate::names::NameSource;
use crate::openalex::WorkSource;
use crate::record::DailyCitation;
use crate::store::Store;

/// Whole-run attempts before a day's generation is given up.
pub const DEFAULT_RUN_ATTEMPTS: usize = 3;

/// Runs `op` until it succeeds or `max_attempts` runs have failed.
///
/// `op` receives the 1-based attempt number. Failures are logged; the last
/// error is returned. A budget of 0 still runs once.
pub fn retry<T, E: Display>(
    max_attempts: usize,
    backoff: Duration,
    mut op: impl FnMut(usize) -> Result<T, E>,
) -> Result<T, E> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "run failed, retrying");
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
                attempt += 1;
            }
            Err(e) => {
                error!(attempt, max_attempts, error = %e, "run failed, giving up");
                return Err(e);
            }
        }
    }
}

/// When the next scheduled run after `now` is due.
pub fn next_run_after(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    next_local_midnight(now, tz)
}

/// One scheduled invocation: generate and publish, retried as a whole.
pub fn run_once<W: WorkSource, N: NameSource, R: Rng>(
    generator: &mut Generator<W, N, R>,
    store: &dyn Store,
    max_attempts: usize,
    backoff: Duration,
) -> Result<DailyCitation, GenerateError> {
    retry(max_attempts, backoff, |attempt| {
        info!(attempt, "generating daily citation");
        generate_and_publish(generator, store)
    })
}

/// Runs the generator every day at local midnight in `tz`. Never returns.
pub fn run_daily<W: WorkSource, N: NameSource, R: Rng>(
    generator: &mut Generator<W, N, R>,
    store: &dyn Store,
    tz: Tz,
    max_attempts: usize,
    backoff: Duration,
) -> ! {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, tz);
        info!(next_run = %next, "waiting for next scheduled run");
        thread::sleep((next - now).to_std().unwrap_or(Duration::ZERO));

        // Failures are already logged; tomorrow's run starts fresh
        if let Ok(citation) = run_once(generator, store, max_attempts, backoff) {
            info!(apa = %citation.apa, "daily citation published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_retry_returns_first_success() {
        let mut calls = 0;

        let result: Result<&str, String> = retry(3, Duration::ZERO, |attempt| {
            calls += 1;
            if attempt < 2 {
                Err(format!("attempt {} failed", attempt))
            } else {
                Ok("done")
            }
        });

        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let mut calls = 0;

        let result: Result<(), String> = retry(3, Duration::ZERO, |attempt| {
            calls += 1;
            Err(format!("attempt {} failed", attempt))
        });

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_zero_budget_runs_once() {
        let mut calls = 0;
        let result: Result<(), &str> = retry(0, Duration::ZERO, |_| {
            calls += 1;
            Err("nope")
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_next_run_after_utc_midnight() {
        assert_eq!(
            next_run_after(utc("2024-05-01T13:45:00Z"), chrono_tz::UTC),
            utc("2024-05-02T00:00:00Z")
        );
    }

    #[test]
    fn test_next_run_after_exactly_midnight_is_next_day() {
        assert_eq!(
            next_run_after(utc("2024-05-02T00:00:00Z"), chrono_tz::UTC),
            utc("2024-05-03T00:00:00Z")
        );
    }
}
