use std::collections::BTreeMap;

use game_types::LetterStatus;

use crate::ScoringEngine;

/// Best-known state of every letter a player has tried, for keyboard coloring.
///
/// States only move up `Absent < Present < Correct`; a later, weaker verdict
/// for the same letter never overrides an earlier, stronger one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardHints {
    states: BTreeMap<char, LetterStatus>,
}

impl KeyboardHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild hints from a stored board, in submission order.
    pub fn from_guesses(guesses: &[String], target: &str) -> Self {
        let mut hints = Self::new();
        for guess in guesses {
            if let Ok(verdicts) = ScoringEngine::evaluate_guess(guess, target) {
                hints.record(guess, &verdicts);
            }
        }
        hints
    }

    /// Fold one evaluated guess in, per occurrence, left to right.
    pub fn record(&mut self, guess: &str, verdicts: &[LetterStatus]) {
        for (letter, &verdict) in guess.chars().zip(verdicts) {
            self.upgrade(letter.to_ascii_uppercase(), verdict);
        }
    }

    fn upgrade(&mut self, letter: char, verdict: LetterStatus) {
        self.states
            .entry(letter)
            .and_modify(|current| *current = (*current).max(verdict))
            .or_insert(verdict);
    }

    pub fn get(&self, letter: char) -> Option<LetterStatus> {
        self.states.get(&letter.to_ascii_uppercase()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, LetterStatus)> + '_ {
        self.states.iter().map(|(letter, status)| (*letter, *status))
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LetterStatus::{Absent, Correct, Present};

    fn record(hints: &mut KeyboardHints, guess: &str, target: &str) {
        let verdicts = ScoringEngine::evaluate_guess(guess, target).unwrap();
        hints.record(guess, &verdicts);
    }

    #[test]
    fn test_unseen_letters_are_unset() {
        let hints = KeyboardHints::new();
        assert!(hints.is_empty());
        assert_eq!(hints.get('a'), None);
    }

    #[test]
    fn test_states_only_upgrade() {
        let mut hints = KeyboardHints::new();

        hints.record("ABCDE", &[Correct, Present, Absent, Absent, Absent]);
        assert_eq!(hints.get('A'), Some(Correct));
        assert_eq!(hints.get('B'), Some(Present));
        assert_eq!(hints.get('C'), Some(Absent));

        // Weaker verdicts for the same letters are ignored
        hints.record("BACXY", &[Absent, Absent, Absent, Absent, Absent]);
        assert_eq!(hints.get('A'), Some(Correct));
        assert_eq!(hints.get('B'), Some(Present));

        // Stronger verdicts win
        hints.record("CBXYZ", &[Present, Correct, Absent, Absent, Absent]);
        assert_eq!(hints.get('C'), Some(Present));
        assert_eq!(hints.get('B'), Some(Correct));
    }

    #[test]
    fn test_duplicate_letter_in_one_guess_keeps_maximum() {
        // Target SPEND, guess EERIE: first E present, the others absent
        let mut hints = KeyboardHints::new();
        record(&mut hints, "EERIE", "SPEND");
        assert_eq!(hints.get('E'), Some(Present));

        // Correct occurrence after an absent one, within a single guess
        let mut hints = KeyboardHints::new();
        record(&mut hints, "LLLLL", "HELLO");
        assert_eq!(hints.get('L'), Some(Correct));
    }

    #[test]
    fn test_never_downgrades_across_sequence() {
        let target = "CRANE";
        let guesses = ["SLATE", "TRACE", "EERIE", "CRANE", "ZZZZZ"];
        let mut hints = KeyboardHints::new();
        let mut previous = KeyboardHints::new();

        for guess in guesses {
            record(&mut hints, guess, target);
            for (letter, status) in previous.iter() {
                assert!(hints.get(letter).unwrap() >= status, "{letter} downgraded");
            }
            previous = hints.clone();
        }

        assert_eq!(hints.get('C'), Some(Correct));
        assert_eq!(hints.get('S'), Some(Absent));
    }

    #[test]
    fn test_from_guesses_matches_incremental_recording() {
        let guesses = vec!["SLATE".to_string(), "TRACE".to_string()];
        let rebuilt = KeyboardHints::from_guesses(&guesses, "CRANE");

        let mut incremental = KeyboardHints::new();
        record(&mut incremental, "SLATE", "CRANE");
        record(&mut incremental, "TRACE", "CRANE");

        assert_eq!(rebuilt, incremental);
        assert_eq!(rebuilt.get('e'), Some(Correct));
    }
}
