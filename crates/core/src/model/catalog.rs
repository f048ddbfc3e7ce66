use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Category, Difficulty, Question, QuestionError, RenderHint};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown age band: {0}")]
pub struct UnknownAgeBand(pub String);

/// Age band a catalog is tailored to. Its tag is stored as the assessment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBand {
    Youth,
    Adolescent,
    Adult,
    Elderly,
}

impl AgeBand {
    pub const ALL: [AgeBand; 4] = [
        AgeBand::Youth,
        AgeBand::Adolescent,
        AgeBand::Adult,
        AgeBand::Elderly,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AgeBand::Youth => "youth",
            AgeBand::Adolescent => "adolescent",
            AgeBand::Adult => "adult",
            AgeBand::Elderly => "elderly",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Youth => "Youth (5-12 years)",
            AgeBand::Adolescent => "Adolescent (12-18 years)",
            AgeBand::Adult => "Adult (18-60 years)",
            AgeBand::Elderly => "Elderly (60+ years)",
        }
    }

    /// Build the fixed question catalog for this band.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if a catalog entry is malformed.
    pub fn catalog(self) -> Result<Vec<Question>, QuestionError> {
        let (entries, time_limit) = match self {
            AgeBand::Youth => (YOUTH, Some(30)),
            AgeBand::Adolescent => (ADOLESCENT, Some(25)),
            AgeBand::Adult => (ADULT, None),
            AgeBand::Elderly => (ELDERLY, Some(45)),
        };
        entries
            .iter()
            .zip(1_u32..)
            .map(|(entry, id)| entry.build(QuestionId::new(id), time_limit))
            .collect()
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeBand {
    type Err = UnknownAgeBand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youth" => Ok(AgeBand::Youth),
            "adolescent" => Ok(AgeBand::Adolescent),
            "adult" => Ok(AgeBand::Adult),
            "elderly" => Ok(AgeBand::Elderly),
            _ => Err(UnknownAgeBand(s.to_owned())),
        }
    }
}

//
// ─── STATIC TABLES ────────────────────────────────────────────────────────────
//

enum Hint {
    Swatch(&'static str),
    Emoji(&'static str),
}

struct Entry {
    category: &'static str,
    difficulty: Option<Difficulty>,
    prompt: &'static str,
    hint: Option<Hint>,
    options: &'static [&'static str],
    correct: usize,
}

impl Entry {
    fn build(&self, id: QuestionId, time_limit: Option<u32>) -> Result<Question, QuestionError> {
        let options = self.options.iter().map(|o| (*o).to_owned()).collect();
        let mut question = Question::new(
            id,
            Category::new(self.category)?,
            self.prompt,
            options,
            self.correct,
            time_limit,
        )?;
        if let Some(difficulty) = self.difficulty {
            question = question.with_difficulty(difficulty);
        }
        let question = match self.hint {
            Some(Hint::Swatch(color)) => question.with_hint(RenderHint::ColorSwatch(color.into())),
            Some(Hint::Emoji(emoji)) => question.with_hint(RenderHint::Emoji(emoji.into())),
            None => question,
        };
        Ok(question)
    }
}

const YOUTH: &[Entry] = &[
    Entry {
        category: "colors",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which color is the sky?",
        hint: Some(Hint::Emoji("🌤️")),
        options: &["Red", "Blue", "Green", "Yellow"],
        correct: 1,
    },
    Entry {
        category: "colors",
        difficulty: Some(Difficulty::Easy),
        prompt: "What color is this square?",
        hint: Some(Hint::Swatch("#EF4444")),
        options: &["Red", "Blue", "Green", "Purple"],
        correct: 0,
    },
    Entry {
        category: "counting",
        difficulty: Some(Difficulty::Easy),
        prompt: "Count the stars! ⭐⭐⭐",
        hint: Some(Hint::Emoji("⭐")),
        options: &["2", "3", "4", "5"],
        correct: 1,
    },
    Entry {
        category: "counting",
        difficulty: Some(Difficulty::Medium),
        prompt: "How many legs does a dog have?",
        hint: None,
        options: &["2", "3", "4", "6"],
        correct: 2,
    },
    Entry {
        category: "animals",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which animal says 'Moo'?",
        hint: Some(Hint::Emoji("🐮")),
        options: &["Dog", "Cow", "Cat", "Bird"],
        correct: 1,
    },
    Entry {
        category: "animals",
        difficulty: Some(Difficulty::Medium),
        prompt: "Which animal can fly?",
        hint: None,
        options: &["Fish", "Bird", "Dog", "Cow"],
        correct: 1,
    },
    Entry {
        category: "attention",
        difficulty: Some(Difficulty::Medium),
        prompt: "Which one is different? 🍎 🍎 🍌 🍎",
        hint: None,
        options: &["The first", "The second", "The third", "The last"],
        correct: 2,
    },
];

const ADOLESCENT: &[Entry] = &[
    Entry {
        category: "pattern",
        difficulty: Some(Difficulty::Medium),
        prompt: "Complete the pattern: 2, 4, 8, 16, __",
        hint: None,
        options: &["24", "32", "28", "30"],
        correct: 1,
    },
    Entry {
        category: "pattern",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which letter comes next? A, C, E, G, __",
        hint: None,
        options: &["H", "I", "J", "K"],
        correct: 1,
    },
    Entry {
        category: "logic",
        difficulty: Some(Difficulty::Hard),
        prompt: "If all Bloops are Razzies and all Razzies are Lazzies, are all Bloops definitely Lazzies?",
        hint: None,
        options: &["Yes", "No", "Sometimes", "Cannot determine"],
        correct: 0,
    },
    Entry {
        category: "logic",
        difficulty: Some(Difficulty::Medium),
        prompt: "Tom is taller than Sam, and Sam is taller than Ana. Who is the shortest?",
        hint: None,
        options: &["Tom", "Sam", "Ana", "Cannot tell"],
        correct: 2,
    },
    Entry {
        category: "memory",
        difficulty: Some(Difficulty::Medium),
        prompt: "Study this sequence for 5 seconds: Red, Blue, Green, Yellow, Purple. What was the 4th color?",
        hint: None,
        options: &["Green", "Yellow", "Purple", "Blue"],
        correct: 1,
    },
    Entry {
        category: "memory",
        difficulty: Some(Difficulty::Hard),
        prompt: "Remember the digits 7 3 9 1. What was the second digit?",
        hint: None,
        options: &["7", "3", "9", "1"],
        correct: 1,
    },
];

const ADULT: &[Entry] = &[
    Entry {
        category: "math",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which of the following is a prime number?",
        hint: None,
        options: &["21", "29", "30", "35"],
        correct: 1,
    },
    Entry {
        category: "math",
        difficulty: Some(Difficulty::Medium),
        prompt: "If a train travels 60 miles in 1 hour and 30 minutes, what is its average speed?",
        hint: None,
        options: &["40 mph", "45 mph", "50 mph", "55 mph"],
        correct: 0,
    },
    Entry {
        category: "pattern",
        difficulty: Some(Difficulty::Easy),
        prompt: "What is the next number in this sequence? 3, 6, 12, 24, ...",
        hint: None,
        options: &["36", "48", "54", "60"],
        correct: 1,
    },
    Entry {
        category: "pattern",
        difficulty: Some(Difficulty::Medium),
        prompt: "What comes next? 1, 1, 2, 3, 5, 8, ...",
        hint: None,
        options: &["11", "12", "13", "15"],
        correct: 2,
    },
    Entry {
        category: "practical",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which item would you use to cut paper?",
        hint: None,
        options: &["Scissors", "Spoon", "Fork", "Hammer"],
        correct: 0,
    },
    Entry {
        category: "safety",
        difficulty: Some(Difficulty::Easy),
        prompt: "If you hear a fire alarm, what should you do?",
        hint: None,
        options: &["Ignore it", "Evacuate calmly", "Continue working", "Call a friend"],
        correct: 1,
    },
    Entry {
        category: "knowledge",
        difficulty: Some(Difficulty::Easy),
        prompt: "What is the main purpose of a doctor?",
        hint: None,
        options: &["Sell medicine", "Help people stay healthy", "Drive ambulances", "Cook food"],
        correct: 1,
    },
];

const ELDERLY: &[Entry] = &[
    Entry {
        category: "orientation",
        difficulty: Some(Difficulty::Easy),
        prompt: "What season comes after spring?",
        hint: None,
        options: &["Summer", "Winter", "Autumn", "Spring again"],
        correct: 0,
    },
    Entry {
        category: "orientation",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which of these is a day of the week?",
        hint: None,
        options: &["January", "Tuesday", "Winter", "Morning"],
        correct: 1,
    },
    Entry {
        category: "memory",
        difficulty: Some(Difficulty::Medium),
        prompt: "Please remember these three words: Apple, Table, Car. Which list repeats them exactly?",
        hint: None,
        options: &[
            "Apple, Table, Car",
            "Apple, Chair, Car",
            "Orange, Table, Car",
            "Apple, Table, Cart",
        ],
        correct: 0,
    },
    Entry {
        category: "memory",
        difficulty: Some(Difficulty::Medium),
        prompt: "How many months are in a year?",
        hint: None,
        options: &["10", "12", "7", "24"],
        correct: 1,
    },
    Entry {
        category: "attention",
        difficulty: Some(Difficulty::Medium),
        prompt: "Which number is the largest?",
        hint: None,
        options: &["19", "91", "9", "90"],
        correct: 1,
    },
    Entry {
        category: "daily living",
        difficulty: Some(Difficulty::Easy),
        prompt: "Which item do you use to tell the time?",
        hint: None,
        options: &["Spoon", "Clock", "Pillow", "Shoe"],
        correct: 1,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_catalog_builds_with_unique_ids() {
        for band in AgeBand::ALL {
            let catalog = band.catalog().unwrap();
            assert!(catalog.len() >= 6, "{band} catalog too small");
            let ids: HashSet<_> = catalog.iter().map(Question::id).collect();
            assert_eq!(ids.len(), catalog.len());
            let categories: HashSet<_> = catalog.iter().map(Question::category).collect();
            assert!(categories.len() >= 3, "{band} needs at least 3 categories");
        }
    }

    #[test]
    fn band_time_limits() {
        let youth = AgeBand::Youth.catalog().unwrap();
        assert!(youth.iter().all(|q| q.time_limit_secs() == 30));
        let adult = AgeBand::Adult.catalog().unwrap();
        assert!(
            adult
                .iter()
                .all(|q| q.time_limit_secs() == crate::model::DEFAULT_TIME_LIMIT_SECS)
        );
    }

    #[test]
    fn youth_catalog_carries_swatch_hint() {
        let youth = AgeBand::Youth.catalog().unwrap();
        assert!(
            youth
                .iter()
                .any(|q| matches!(q.hint(), Some(RenderHint::ColorSwatch(c)) if c == "#EF4444"))
        );
    }

    #[test]
    fn elderly_catalog_covers_orientation_and_recall() {
        let elderly = AgeBand::Elderly.catalog().unwrap();
        let season = elderly
            .iter()
            .find(|q| q.prompt() == "What season comes after spring?")
            .unwrap();
        assert_eq!(season.options()[season.correct_index()], "Summer");
        let recall = elderly
            .iter()
            .find(|q| q.category().as_str() == "memory" && q.prompt().contains("Apple, Table, Car"))
            .unwrap();
        assert_eq!(recall.options()[recall.correct_index()], "Apple, Table, Car");
        assert!(elderly.iter().all(|q| q.time_limit_secs() == 45));
    }

    #[test]
    fn band_tags_round_trip() {
        for band in AgeBand::ALL {
            assert_eq!(band.as_str().parse::<AgeBand>().unwrap(), band);
        }
        assert_eq!("ELDERLY".parse::<AgeBand>().unwrap(), AgeBand::Elderly);
        assert!("toddler".parse::<AgeBand>().is_err());
    }
}
