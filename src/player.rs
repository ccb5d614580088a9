//! Participant identity and per question answering state
//!
//! Each participant gets a unique [`Id`] when they join and a [`Player`]
//! entry owned by the game. The player tracks what they answered for the
//! current question, when they locked it in, their running score, and
//! whether they are currently typing an open ended answer. Typing activity
//! decays through a private [`Timer`] whose single chunk spans the whole
//! activity window.

use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay, skip_serializing_none};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{
    constants,
    timer::{self, Timer, TimerEvent},
};

/// A unique identifier for participants in a game session
///
/// Assigned when the participant joins and stable for the whole session,
/// across reconnects of the same participant.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random participant ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// One participant's state within a game session
///
/// Answering state resets every question; the score and the bonus counter
/// accumulate over the whole session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// The participant this state belongs to
    id: Id,
    /// Display name, admitted through the game's name checks
    name: String,
    /// Choice indexes selected for the current question
    selected_choice_indexes: Vec<usize>,
    /// Free text answer for the current open ended question
    long_answer: String,
    /// Whether the answer is locked in for the current question
    has_locked_answers: bool,
    /// When the answer was locked, stamped once per question
    answer_time: Option<SystemTime>,
    /// Whether the player typed within the activity window
    has_interacted: bool,
    /// Running score over the whole session
    points: f64,
    /// How many speed bonuses the player earned over the session
    bonus_times: u32,
    /// Points gained on the last scored question, bonus included
    last_question_result: f64,
    /// Whether the last scored question earned the speed bonus
    last_question_is_bonus: bool,
    /// Decays the typing indicator; its single chunk spans the whole window
    edit_timer: Timer,
}

impl Player {
    /// Creates a player with a clean answering state and no points
    pub fn new(id: Id, name: String) -> Self {
        Self {
            id,
            name,
            selected_choice_indexes: Vec::new(),
            long_answer: String::new(),
            has_locked_answers: false,
            answer_time: None,
            has_interacted: false,
            points: 0.0,
            bonus_times: 0,
            last_question_result: 0.0,
            last_question_is_bonus: false,
            edit_timer: Timer::with_tick(constants::player::EDIT_ACTIVITY_WINDOW),
        }
    }

    /// Clears everything tied to the current question
    ///
    /// The running score and the bonus counter are untouched. Any pending
    /// typing window is cancelled.
    pub fn reset_for_new_question(&mut self) {
        self.selected_choice_indexes.clear();
        self.long_answer.clear();
        self.has_locked_answers = false;
        self.answer_time = None;
        self.has_interacted = false;
        self.last_question_result = 0.0;
        self.last_question_is_bonus = false;
        self.edit_timer.reset();
    }

    /// Locks the player's answer for the current question
    ///
    /// The first call stamps `at` as the answer time; repeated calls change
    /// nothing, so the stamp never drifts. The caller provides the stamp so
    /// a batch lock can hand every straggler the same one.
    pub fn lock_answers(&mut self, at: SystemTime) {
        if !self.has_locked_answers {
            self.has_locked_answers = true;
            self.answer_time = Some(at);
        }
    }

    /// Overwrites the selected choices, a no-op once locked
    pub fn update_selected_choices(&mut self, indexes: Vec<usize>) {
        if !self.has_locked_answers {
            self.selected_choice_indexes = indexes;
        }
    }

    /// Stores a new long answer draft and restarts the typing window
    ///
    /// A no-op once the answer is locked. The window runs as one chunk, so
    /// its completion marks the player idle again.
    ///
    /// # Arguments
    ///
    /// * `text` - The current draft
    /// * `schedule_message` - Function to schedule delayed messages
    pub fn update_long_answer<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        text: String,
        mut schedule_message: S,
    ) {
        if self.has_locked_answers {
            return;
        }
        self.long_answer = text;
        self.has_interacted = true;
        let id = self.id;
        self.edit_timer
            .start(constants::player::EDIT_ACTIVITY_WINDOW, |pulse, duration| {
                schedule_message(
                    crate::AlarmMessage::EditingWindow { player: id, pulse },
                    duration,
                );
            });
    }

    /// Handles a typing window chunk delivered by the host
    ///
    /// Stale chunks are ignored. When the window lapses the player counts
    /// as idle again.
    ///
    /// # Returns
    ///
    /// `true` if the window lapsed on this delivery
    pub fn receive_editing_alarm<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        message: &timer::AlarmMessage,
        mut schedule_message: S,
    ) -> bool {
        let id = self.id;
        let event = self.edit_timer.receive_alarm(message, |pulse, duration| {
            schedule_message(
                crate::AlarmMessage::EditingWindow { player: id, pulse },
                duration,
            );
        });
        if matches!(event, Some(TimerEvent::Completed)) {
            self.has_interacted = false;
            true
        } else {
            false
        }
    }

    /// Credits points and records them as the last question's result
    pub fn update_score(&mut self, points: f64) {
        self.points += points;
        self.last_question_result = points;
        self.last_question_is_bonus = false;
    }

    /// Credits the speed bonus on top of the base points
    ///
    /// The bonus is a fraction of the question's points and stacks with the
    /// base credit already granted for the same question.
    pub fn update_score_for_bonus(&mut self, points: f64) {
        let bonus = points * constants::game::BONUS_MULTIPLIER;
        self.points += bonus;
        self.last_question_result += bonus;
        self.last_question_is_bonus = true;
        self.bonus_times += 1;
    }

    /// Cancels the pending typing window without touching the draft
    pub fn reset_timer(&mut self) {
        self.edit_timer.reset();
    }

    /// The participant this state belongs to
    pub fn id(&self) -> Id {
        self.id
    }

    /// The player's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Choice indexes selected for the current question
    pub fn selected_choice_indexes(&self) -> &[usize] {
        &self.selected_choice_indexes
    }

    /// Free text answer for the current open ended question
    pub fn long_answer(&self) -> &str {
        &self.long_answer
    }

    /// Whether the answer is locked in for the current question
    pub fn has_locked_answers(&self) -> bool {
        self.has_locked_answers
    }

    /// When the answer was locked, `None` while still open
    pub fn answer_time(&self) -> Option<SystemTime> {
        self.answer_time
    }

    /// Whether the player typed within the activity window
    pub fn is_editing_long_answer(&self) -> bool {
        self.has_interacted
    }

    /// Running score over the whole session
    pub fn points(&self) -> f64 {
        self.points
    }

    /// How many speed bonuses the player earned over the session
    pub fn bonus_times(&self) -> u32 {
        self.bonus_times
    }

    /// Points gained on the last scored question, bonus included
    pub fn last_question_result(&self) -> f64 {
        self.last_question_result
    }

    /// Whether the last scored question earned the speed bonus
    pub fn last_question_is_bonus(&self) -> bool {
        self.last_question_is_bonus
    }
}
