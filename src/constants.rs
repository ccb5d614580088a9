//! Configuration constants for the quiz session engine
//!
//! This module contains all the configuration limits and constraints
//! used throughout the session engine to ensure data integrity and
//! provide consistent boundaries for different components.

/// Quiz configuration constants
pub mod quiz {
    /// Minimum answering time in seconds for a multiple choice question
    pub const MIN_DURATION: u64 = 10;
    /// Maximum answering time in seconds for a multiple choice question
    pub const MAX_DURATION: u64 = 60;
    /// Minimum number of questions in a quiz
    pub const MIN_QUESTION_COUNT: usize = 1;
    /// Maximum number of questions in a quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of a quiz description in characters
    pub const MAX_DESCRIPTION_LENGTH: usize = 500;
}

/// Question configuration constants
pub mod question {
    /// Minimum points awarded by a question
    pub const MIN_POINTS: u64 = 10;
    /// Maximum points awarded by a question
    pub const MAX_POINTS: u64 = 100;
    /// Points must be a multiple of this step
    pub const POINTS_STEP: u64 = 10;
    /// Minimum number of choices for a multiple choice question
    pub const MIN_CHOICE_COUNT: usize = 2;
    /// Maximum number of choices for a multiple choice question
    pub const MAX_CHOICE_COUNT: usize = 4;
    /// Maximum length of question or choice text in characters
    pub const MAX_TEXT_LENGTH: usize = 400;
}

/// Game session tuning constants
pub mod game {
    use std::time::Duration;

    /// Fraction of the question's points granted on top of the base credit
    /// to the fastest correct answerer
    pub const BONUS_MULTIPLIER: f64 = 0.2;
    /// Countdown shown to everyone before the first question starts
    pub const START_COUNTDOWN: Duration = Duration::from_secs(5);
    /// Pause between a question's results and the next question
    pub const COOLDOWN: Duration = Duration::from_secs(3);
    /// Answering time for open ended questions, independent of the quiz duration
    pub const OPEN_ANSWER_DURATION: Duration = Duration::from_secs(60);
    /// Panic mode becomes available once a multiple choice countdown drops to this
    pub const PANIC_THRESHOLD_CHOICE: Duration = Duration::from_secs(10);
    /// Panic mode becomes available once an open ended countdown drops to this
    pub const PANIC_THRESHOLD_OPEN: Duration = Duration::from_secs(20);
    /// Name reserved for the organizer, banned for participants in any casing
    pub const RESERVED_ORGANIZER_NAME: &str = "organisateur";
    /// Maximum length of a participant name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Countdown timer tuning constants
pub mod timer {
    use std::time::Duration;

    /// Interval between countdown ticks under normal pacing
    pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);
    /// Interval between countdown ticks while panic mode is active
    pub const PANIC_TICK: Duration = Duration::from_millis(250);
}

/// Participant tuning constants
pub mod player {
    use std::time::Duration;

    /// How long a participant counts as "typing" after their last
    /// long answer edit
    pub const EDIT_ACTIVITY_WINDOW: Duration = Duration::from_secs(5);
}
