//! Quiz data model and answer validation
//!
//! Quizzes are authored and stored by the catalog layer; the session engine
//! receives a snapshot and only reads it. Validation bounds live in
//! [`crate::constants`] and are enforced with `garde` at the catalog
//! boundary, so a running game can assume its quiz is well formed.

use std::{collections::BTreeSet, time::Duration};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use web_time::SystemTime;

use crate::constants;

/// Validation result type for custom validators
type ValidationResult = garde::Result;

/// Validates that a duration falls within inclusive second bounds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates the answering time of a quiz
fn validate_quiz_duration(val: &Duration) -> ValidationResult {
    validate_duration::<
        { crate::constants::quiz::MIN_DURATION },
        { crate::constants::quiz::MAX_DURATION },
    >(val)
}

/// Validates that awarded points are within bounds and on the step grid
fn validate_points(val: &u64) -> ValidationResult {
    if !(constants::question::MIN_POINTS..=constants::question::MAX_POINTS).contains(val) {
        Err(garde::Error::new(format!(
            "outside of bounds [{},{}]",
            constants::question::MIN_POINTS,
            constants::question::MAX_POINTS,
        )))
    } else if val % constants::question::POINTS_STEP != 0 {
        Err(garde::Error::new(format!(
            "not a multiple of {}",
            constants::question::POINTS_STEP,
        )))
    } else {
        Ok(())
    }
}

/// A quiz as stored by the catalog
///
/// The session engine owns a cloned snapshot for the whole game, so edits
/// to the stored quiz never affect a session already underway.
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// Unique identifier assigned by the catalog
    #[garde(skip)]
    pub id: Uuid,
    /// The quiz title, shown in lobbies and history
    #[garde(length(chars, min = 1, max = crate::constants::quiz::MAX_TITLE_LENGTH))]
    pub title: String,
    /// Free form description shown when browsing quizzes
    #[garde(length(chars, max = crate::constants::quiz::MAX_DESCRIPTION_LENGTH))]
    pub description: String,
    /// Answering time for every multiple choice question in this quiz
    #[garde(custom(|v, _| validate_quiz_duration(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// The questions in presentation order
    #[garde(length(min = crate::constants::quiz::MIN_QUESTION_COUNT, max = crate::constants::quiz::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
    /// Whether the quiz shows up for other organizers when browsing
    #[garde(skip)]
    pub is_visible: bool,
    /// When the quiz was last edited in the catalog
    #[garde(skip)]
    pub last_modification: SystemTime,
}

impl Quiz {
    /// Returns the number of questions in the quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns whether the quiz contains no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A single question of a quiz
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub enum Question {
    /// Pick the correct subset out of fixed choices
    MultipleChoice(#[garde(dive)] ChoiceQuestion),
    /// Type a free text answer, graded by the organizer afterwards
    OpenEnded(#[garde(dive)] OpenQuestion),
}

/// A question answered by selecting choices
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChoiceQuestion {
    /// The question text shown to players
    #[garde(length(chars, min = 1, max = crate::constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// Points awarded for an exact answer
    #[garde(custom(|v, _| validate_points(v)))]
    pub points: u64,
    /// The available choices, each flagged correct or not
    #[garde(length(min = crate::constants::question::MIN_CHOICE_COUNT, max = crate::constants::question::MAX_CHOICE_COUNT), dive)]
    pub choices: Vec<Choice>,
}

/// A question answered with free text
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenQuestion {
    /// The question text shown to players
    #[garde(length(chars, min = 1, max = crate::constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// Points awarded for a fully correct answer, scaled by the grade
    #[garde(custom(|v, _| validate_points(v)))]
    pub points: u64,
}

/// A single selectable choice of a multiple choice question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Choice {
    /// The choice text shown to players
    #[garde(length(chars, min = 1, max = crate::constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// Whether this choice belongs to the correct answer
    #[garde(skip)]
    pub is_correct: bool,
}

impl Question {
    /// The question text shown to players
    pub fn text(&self) -> &str {
        match self {
            Self::MultipleChoice(question) => &question.text,
            Self::OpenEnded(question) => &question.text,
        }
    }

    /// Points this question awards when fully correct
    pub fn points(&self) -> u64 {
        match self {
            Self::MultipleChoice(question) => question.points,
            Self::OpenEnded(question) => question.points,
        }
    }

    /// Number of choices, zero for open ended questions
    pub fn choice_count(&self) -> usize {
        match self {
            Self::MultipleChoice(question) => question.choices.len(),
            Self::OpenEnded(_) => 0,
        }
    }

    /// Whether the question is graded by the organizer
    pub fn is_open_ended(&self) -> bool {
        matches!(self, Self::OpenEnded(_))
    }

    /// Indexes of the correct choices, empty for open ended questions
    pub fn correct_indexes(&self) -> Vec<usize> {
        match self {
            Self::MultipleChoice(question) => question
                .choices
                .iter()
                .positions(|choice| choice.is_correct)
                .collect_vec(),
            Self::OpenEnded(_) => Vec::new(),
        }
    }

    /// A copy of the question safe to show while answering is open
    ///
    /// Multiple choice questions come back with every choice flagged
    /// incorrect; open ended questions carry no answer to hide.
    pub fn without_answers(&self) -> Self {
        match self {
            Self::MultipleChoice(question) => Self::MultipleChoice(ChoiceQuestion {
                text: question.text.clone(),
                points: question.points,
                choices: question
                    .choices
                    .iter()
                    .map(|choice| Choice {
                        text: choice.text.clone(),
                        is_correct: false,
                    })
                    .collect(),
            }),
            Self::OpenEnded(question) => Self::OpenEnded(question.clone()),
        }
    }
}

/// Checks a submitted choice selection against the correct one
///
/// The submission matches when the set of selected indexes equals the set
/// of correct indexes exactly. Duplicates and ordering in the submission
/// are irrelevant, indexes outside the choice list never match, and a
/// partial selection is simply wrong.
///
/// # Arguments
///
/// * `choices` - The question's choices
/// * `selected_indexes` - Indexes the player selected
///
/// # Returns
///
/// `true` if the selection is exactly the correct answer
pub fn selection_matches(choices: &[Choice], selected_indexes: &[usize]) -> bool {
    let correct: BTreeSet<usize> = choices
        .iter()
        .positions(|choice| choice.is_correct)
        .collect();
    let selected: BTreeSet<usize> = selected_indexes.iter().copied().collect();
    selected == correct
}
