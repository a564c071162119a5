use game_types::{GameError, GuessRow, LetterResult, LetterStatus, WORD_LENGTH};

pub type Verdicts = [LetterStatus; WORD_LENGTH];

pub struct ScoringEngine;

impl ScoringEngine {
    /// Normalize a word to uppercase letters, rejecting anything that is not
    /// exactly five characters long.
    pub fn normalize(word: &str) -> Result<[char; WORD_LENGTH], GameError> {
        let chars: Vec<char> = word.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
        chars
            .as_slice()
            .try_into()
            .map_err(|_| GameError::InvalidGuessLength {
                length: chars.len(),
            })
    }

    /// Score a guess against the target word.
    ///
    /// Two passes so duplicate letters are credited correctly: exact matches
    /// consume their target position first, then the remaining guess letters
    /// consume the left-most unused occurrence, scanning guess positions left
    /// to right.
    pub fn evaluate_guess(guess: &str, target: &str) -> Result<Verdicts, GameError> {
        let guess = Self::normalize(guess)?;
        let mut remaining: [Option<char>; WORD_LENGTH] = Self::normalize(target)?.map(Some);
        let mut verdicts: [Option<LetterStatus>; WORD_LENGTH] = [None; WORD_LENGTH];

        // First pass: exact positions
        for (i, &ch) in guess.iter().enumerate() {
            if remaining[i] == Some(ch) {
                verdicts[i] = Some(LetterStatus::Correct);
                remaining[i] = None;
            }
        }

        // Second pass: letters elsewhere in the target
        for (i, &ch) in guess.iter().enumerate() {
            if verdicts[i].is_some() {
                continue;
            }

            verdicts[i] = match remaining.iter().position(|slot| *slot == Some(ch)) {
                Some(index) => {
                    remaining[index] = None;
                    Some(LetterStatus::Present)
                }
                None => Some(LetterStatus::Absent),
            };
        }

        Ok(verdicts.map(|v| v.unwrap_or(LetterStatus::Absent)))
    }

    pub fn is_winning_guess(guess: &str, target: &str) -> bool {
        match (Self::normalize(guess), Self::normalize(target)) {
            (Ok(guess), Ok(target)) => guess == target,
            _ => false,
        }
    }

    /// Scored row for display. With `hide_letters` only the colors survive,
    /// which is what a player is shown of the opponent's board.
    pub fn score_row(guess: &str, target: &str, hide_letters: bool) -> Result<GuessRow, GameError> {
        let verdicts = Self::evaluate_guess(guess, target)?;
        let letters = Self::normalize(guess)?
            .iter()
            .zip(verdicts)
            .enumerate()
            .map(|(i, (ch, status))| LetterResult {
                letter: if hide_letters {
                    String::new()
                } else {
                    ch.to_string()
                },
                status,
                position: i as i32,
            })
            .collect();

        Ok(GuessRow { letters })
    }

    /// Score every submitted guess of a board, skipping malformed entries.
    pub fn score_board(guesses: &[String], target: &str, hide_letters: bool) -> Vec<GuessRow> {
        guesses
            .iter()
            .filter_map(|guess| Self::score_row(guess, target, hide_letters).ok())
            .collect()
    }
}
