//! Aggregated answer results and session history
//!
//! These are the result shapes the session engine hands outward: per choice
//! selection counts, grade bucket counts for organizer graded questions, and
//! the session summary recorded when a game ends. Choice counts and grade
//! counts stay separate variants of [`TotalResult`] so consumers always know
//! which kind of question a history entry belongs to.

use std::collections::BTreeMap;

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use web_time::SystemTime;

/// Grade assigned by the organizer to one open ended answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Grade {
    /// Wrong answer, no points
    Zero,
    /// Partially correct answer, half the points
    Half,
    /// Correct answer, full points
    Full,
}

impl Grade {
    /// Fraction of the question's points this grade awards
    pub fn value(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Half => 0.5,
            Self::Full => 1.0,
        }
    }

    /// Maps a raw fraction back to a grade
    ///
    /// Grading interfaces submit 0, 0.5 or 1; anything else yields `None`.
    pub fn from_value(value: f64) -> Option<Self> {
        [Self::Zero, Self::Half, Self::Full]
            .into_iter()
            .find(|grade| (grade.value() - value).abs() < f64::EPSILON)
    }
}

/// Selection counts per choice index
///
/// Every index of the question is present as a key, zero when nobody
/// picked it.
pub type ChoiceTotals = BTreeMap<usize, usize>;

/// Answer counts per grade bucket
pub type GradeTotals = EnumMap<Grade, usize>;

/// Aggregated results of one finished question
///
/// Recorded into the game's history when the session moves on, one entry
/// per question in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TotalResult {
    /// Selection counts of a multiple choice question
    Choices(ChoiceTotals),
    /// Grade buckets of an open ended question
    Grades(GradeTotals),
}

/// How many players are currently typing an answer versus idle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditingTotals {
    /// Players whose last edit is within the activity window
    pub editing: usize,
    /// Everyone else
    pub idle: usize,
}

/// Summary of a finished session for the organizer's history page
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct HistoryInfo {
    /// Title of the quiz that was played
    pub title: String,
    /// When the organizer launched the session
    pub start_date_time: SystemTime,
    /// Best score reached, zero when nobody played
    pub high_score: f64,
    /// Name of the top scoring player, absent when nobody played
    pub winner: Option<String>,
    /// Number of players present at launch
    pub n_players_start: usize,
}
