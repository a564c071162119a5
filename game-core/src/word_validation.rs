use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use game_types::WORD_LENGTH;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

/// Curated target words. Every entry is a real dictionary word, so a room
/// never starts with a target the dictionary would reject as a guess.
pub const TARGET_WORDS: &[&str] = &[
    "SCOWL", "ARDOR", "SOUGH", "AMBLE", "SNEER", "SNARL", "ADEPT", "ALOOF",
    "SCORN", "SHARP", "SNORT", "AMPLE", "PIOUS", "POWER", "SHIFT", "SCOFF",
    "SURGE", "ACUTE", "ASSAY", "SHADE", "POISE", "ABIDE", "ANGST", "PITCH",
    "AGONY", "SMIRK", "SWOON", "SHRUG", "PLUCK", "SWEAR", "SPURN", "PRIDE",
    "PANIC", "SHAME", "SPITE", "SCRAP", "PRIOR", "AVOID", "ABODE", "PLAZA",
    "PESKY", "SHOCK", "ACTOR", "ADMIT", "ALLOW", "ANNUL", "SINEW", "APACE",
    "ANGEL", "PROXY", "PRESS", "ARBOR", "AROMA", "PIQUE", "SNUFF", "SCAMP",
    "PROWL", "AGORA", "PLUSH", "SAPPY", "ANTSY", "PRONE", "SCENE", "AISLE",
    "PROSE", "SIREN", "PROVE", "ASTER", "PARRY", "AGILE", "ADORN", "PINCH",
    "PADDY", "SCOOT", "PHONY", "AUGHT", "SASSY", "APPLE", "SCENT", "SIEVE",
    "SNARE", "PYLON", "SCOUT", "POLAR", "ADAPT", "SHOUT", "SALLY", "SHOVE",
    "AMOUR", "POUND", "PEARL", "SIGHT", "SHEAR", "SHAKE", "SERVE", "SHOOT",
    "AGAPE", "AUGER", "ADOPT", "POACH", "ANGRY", "SHRUB", "ALLOT", "ADORE",
    "PITHY", "PROOF", "ALIAS", "ALLOY", "PUPIL", "AGATE", "PLUMB", "ABOUT",
    "SIEGE", "ADDER", "SHINE", "SHAKY", "SHAWL", "SOUSE", "SIDLE", "SHOWY",
    "AMPLY", "PUSHY", "PHASE", "PULSE", "SHUNT", "SATYR", "ALARM", "SCALE",
    "PARSE", "ASPEN", "ATONE", "SHADY", "ALIKE", "PIXIE", "PRUDE", "AMISS",
    "PRISE", "PLUNK", "PRATE", "AURIC", "SCRAG", "PATCH", "SCREW", "PILOT",
    "PURSE", "PANSY", "ALIGN", "SHEEN", "SHIRK", "AMASS", "SULLY", "ASKEW",
    "SCARY", "AUDIT", "SCRUB", "SUITE", "PRIZE", "PLUCK", "SCRIM", "ARGOT",
    "ADIEU", "APRON", "AWARD", "AFTER", "SCARF", "ALIVE", "SCALD", "SUPRA",
    "AURAL", "SHALL", "SALVO", "POSSE", "APART", "SATIN", "SHREW", "PINKY",
    "POSER", "AMAZE", "AWAIT", "AWASH", "ABUSE", "ABASH", "SCALE", "PUNCH",
    "PLANE", "PEACE", "SCRIP", "ALIBI", "PRUNE", "AHEAD", "ARENA", "PORCH",
    "PAGAN", "PUPPY", "SHACK", "SHARD", "SILKY", "SHRED", "SHUCK", "SUNNY",
];

/// Where new target words come from.
#[async_trait]
pub trait WordSource: Send + Sync {
    async fn pick_target_word(&self) -> Result<String>;
}

/// Decides whether a guess is a real word.
#[async_trait]
pub trait GuessValidator: Send + Sync {
    async fn is_valid_guess(&self, word: &str) -> bool;
}

/// Accepts every well-formed guess. Used when dictionary checks are off.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl GuessValidator for AcceptAll {
    async fn is_valid_guess(&self, word: &str) -> bool {
        is_playable_word(word)
    }
}

/// Five ASCII letters after trimming, any case.
pub fn is_playable_word(word: &str) -> bool {
    let word = word.trim();
    word.len() == WORD_LENGTH && word.chars().all(|c| c.is_ascii_alphabetic())
}

/// A random curated target. Never fails.
pub fn fallback_target_word() -> String {
    let index = rand::thread_rng().gen_range(0..TARGET_WORDS.len());
    TARGET_WORDS[index].to_string()
}

/// In-memory word list, used both as a target source and as an offline
/// guess dictionary.
#[derive(Debug, Clone)]
pub struct WordValidator {
    words: Vec<String>,
    valid_words: HashSet<String>,
}

impl WordValidator {
    /// Build from newline-separated text. Blank lines, `#` comments and
    /// anything that is not five letters are skipped.
    pub fn from_word_list(word_list: &str) -> Self {
        let mut words = Vec::new();
        let mut valid_words = HashSet::new();

        for line in word_list.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || !is_playable_word(line) {
                continue;
            }

            let word = line.to_ascii_uppercase();
            if valid_words.insert(word.clone()) {
                words.push(word);
            }
        }

        Self { words, valid_words }
    }

    /// Load every `.txt` file in `dir`.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut combined = String::new();

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read word list directory {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read word list {}", path.display()))?;
                combined.push_str(&contents);
                combined.push('\n');
            }
        }

        let validator = Self::from_word_list(&combined);
        if validator.word_count() == 0 {
            return Err(anyhow!("No five-letter words found in {}", dir.display()));
        }

        info!("Loaded {} words from {}", validator.word_count(), dir.display());
        Ok(validator)
    }

    pub fn curated() -> Self {
        Self::from_word_list(&TARGET_WORDS.join("\n"))
    }

    pub fn is_valid_word(&self, word: &str) -> bool {
        self.valid_words.contains(&word.trim().to_ascii_uppercase())
    }

    pub fn get_random_word(&self) -> Result<String> {
        self.words
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| anyhow!("No words available"))
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_alphabetic(&self, word: &str) -> bool {
        word.chars().all(|c| c.is_ascii_alphabetic())
    }
}

#[async_trait]
impl WordSource for WordValidator {
    async fn pick_target_word(&self) -> Result<String> {
        self.get_random_word()
    }
}

#[async_trait]
impl GuessValidator for WordValidator {
    async fn is_valid_guess(&self, word: &str) -> bool {
        self.is_valid_word(word)
    }
}
