//! Fictitious author names.
//!
//! The generator asks a [`NameSource`] for names and keeps drawing until each
//! one fits the length limit, so sources are free to return long names.

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Ann", "Maya", "Tom", "Lucas", "Nora", "Omar", "Priya", "Ivan", "Elena", "Hugo", "Lena",
    "Kofi", "Sara", "Diego", "Mei", "Jonah", "Aisha", "Felix", "Rosa", "Theo", "Ingrid",
    "Kenji", "Leila", "Mateo", "Zoe", "Ruth", "Samuel", "Chloe", "Emil", "Yara", "Benjamin",
    "Charlotte", "Alexander", "Josephine", "Maximilian", "Gabriella", "Sebastian", "Isabella",
];

const MIDDLE_NAMES: &[&str] = &[
    "Alex", "Blake", "Casey", "Drew", "Ellis", "Finley", "Grey", "Harper", "Jamie", "Kai",
    "Lane", "Morgan", "Noel", "Parker", "Quinn", "Reese", "Sage", "Taylor", "Wren",
];

const LAST_NAMES: &[&str] = &[
    "Lee", "Ross", "Diaz", "Kim", "Patel", "Nguyen", "Okafor", "Silva", "Berg", "Novak", "Cohen",
    "Haas", "Moreau", "Tanaka", "Price", "Lopez", "Walsh", "Singh", "Ward", "Park", "Fox",
    "Murphy", "Bauer", "Costa", "Ali", "Reyes", "Hughes", "Schmidt", "Fernandez", "Kowalski",
    "Thompson", "Rodriguez", "Richardson", "Montgomery", "Alexander", "Henderson",
];

/// Supplies raw name candidates.
pub trait NameSource {
    fn first_name(&mut self) -> String;
    fn middle_name(&mut self) -> String;
    fn last_name(&mut self) -> String;
}

/// Draws names uniformly from built-in lists.
#[derive(Debug, Clone)]
pub struct RandomNames<R> {
    rng: R,
}

impl<R: Rng> RandomNames<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn pick(&mut self, names: &[&str]) -> String {
        names.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }
}

impl<R: Rng> NameSource for RandomNames<R> {
    fn first_name(&mut self) -> String {
        self.pick(FIRST_NAMES)
    }

    fn middle_name(&mut self) -> String {
        self.pick(MIDDLE_NAMES)
    }

    fn last_name(&mut self) -> String {
        self.pick(LAST_NAMES)
    }
}

/// Rejection sampling: calls `draw` until it returns a name of at most
/// `max_len` characters. Gives up after `max_draws` candidates.
pub fn draw_bounded_name(
    mut draw: impl FnMut() -> String,
    max_len: usize,
    max_draws: usize,
) -> Option<String> {
    (0..max_draws)
        .map(|_| draw())
        .find(|name| name.chars().count() <= max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lists_contain_short_and_long_names() {
        // The length filter only means something if both kinds exist
        for list in [FIRST_NAMES, LAST_NAMES] {
            assert!(list.iter().any(|n| n.chars().count() <= 6));
            assert!(list.iter().any(|n| n.chars().count() > 6));
        }
    }

    #[test]
    fn test_random_names_draw_from_lists() {
        let mut names = RandomNames::new(StdRng::seed_from_u64(7));
        for _ in 0..20 {
            assert!(FIRST_NAMES.contains(&names.first_name().as_str()));
            assert!(MIDDLE_NAMES.contains(&names.middle_name().as_str()));
            assert!(LAST_NAMES.contains(&names.last_name().as_str()));
        }
    }

    #[test]
    fn test_draw_bounded_name_skips_long_names() {
        // Given: A draw sequence starting with names that are too long
        let mut candidates = vec!["Alexander", "Charlotte", "Ann"].into_iter();

        // When: We draw with a limit of 6 characters
        let name = draw_bounded_name(|| candidates.next().unwrap().to_string(), 6, 10);

        // Then: The first short enough name is returned
        assert_eq!(name.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_draw_bounded_name_accepts_exact_limit() {
        let name = draw_bounded_name(|| "Samuel".to_string(), 6, 1);
        assert_eq!(name.as_deref(), Some("Samuel"));
    }

    #[test]
    fn test_draw_bounded_name_gives_up() {
        let mut calls = 0;
        let name = draw_bounded_name(
            || {
                calls += 1;
                "Maximilian".to_string()
            },
            6,
            25,
        );

        assert_eq!(name, None);
        assert_eq!(calls, 25);
    }

    #[test]
    fn test_random_names_produce_bounded_names() {
        let mut names = RandomNames::new(StdRng::seed_from_u64(42));
        for _ in 0..50 {
            let first = draw_bounded_name(|| names.first_name(), 6, 1000).unwrap();
            assert!(first.chars().count() <= 6);
        }
    }
}
