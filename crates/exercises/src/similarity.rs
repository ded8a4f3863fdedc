//! Name normalization and similarity scoring.
//!
//! Scores are Sørensen–Dice coefficients over character bigrams of the
//! normalized names, so they live in `[0.0, 1.0]` and are symmetric.

use std::collections::HashMap;

/// Gym shorthand expanded before comparison.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("db", "dumbbell"),
    ("bb", "barbell"),
    ("kb", "kettlebell"),
    ("ohp", "overhead press"),
    ("rdl", "romanian deadlift"),
];

/// Lowercase, drop punctuation, expand shorthand, collapse whitespace.
pub fn normalize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == token)
                .map_or(token, |(_, long)| *long)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Dice coefficient of two already-normalized strings.
pub fn dice(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let left = bigrams(a);
    let right = bigrams(b);
    let total: usize = left.values().sum::<usize>() + right.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let shared: usize = left
        .iter()
        .map(|(pair, n)| (*n).min(right.get(pair).copied().unwrap_or(0)))
        .sum();
    (2 * shared) as f64 / total as f64
}

/// Best score of `query` against a name and its aliases.
pub fn best_score<'a>(query: &str, names: impl IntoIterator<Item = &'a str>) -> f64 {
    let query = normalize(query);
    names
        .into_iter()
        .map(|name| dice(&query, &normalize(name)))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_expands_and_cleans() {
        assert_eq!(normalize("  DB  Bench-Press "), "dumbbell bench press");
        assert_eq!(normalize("OHP"), "overhead press");
        assert_eq!(normalize("Pull-Up"), "pull up");
    }

    #[test]
    fn identical_after_normalization_scores_one() {
        assert_eq!(best_score("db bench press", ["Dumbbell Bench Press"]), 1.0);
    }

    #[test]
    fn dice_is_symmetric_and_bounded() {
        let a = normalize("goblet squat");
        let b = normalize("back squat");
        let ab = dice(&a, &b);
        assert_eq!(ab, dice(&b, &a));
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn unrelated_names_score_zero() {
        assert_eq!(best_score("zercher carry", ["Push-Up", "Plank"]), 0.0);
    }

    #[test]
    fn aliases_take_the_best_score() {
        let score = best_score("military press", ["Overhead Press", "Military Press"]);
        assert_eq!(score, 1.0);
    }
}
