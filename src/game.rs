//! Core game logic and state management
//!
//! This module contains the main game struct and logic for managing a live
//! quiz session: the roster of players, answer intake and locking, scoring
//! with the speed bonus, organizer grading of open ended answers, aggregated
//! statistics, per question history, and the pause and panic controls. The
//! game performs no I/O; an outer dispatcher drives the [`State`] field,
//! relays participant messages into these methods and echoes scheduled
//! alarms back into [`Game::receive_alarm`].

use std::{collections::HashSet, fmt::Debug, time::Duration};

use itertools::Itertools;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    AlarmMessage, constants,
    player::{Id, Player},
    quiz::{self, Question, Quiz},
    tally::{ChoiceTotals, EditingTotals, Grade, GradeTotals, HistoryInfo, TotalResult},
    timer::{Timer, TimerEvent},
};

/// Represents the current phase of the game session
///
/// The session progresses through these phases under the dispatcher's
/// control, from the waiting room through each question's answering,
/// results and grading, to the final standings. The game itself only
/// stores the phase; transition timing belongs to the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Players are joining, nothing started yet
    #[default]
    WaitingRoom,
    /// Countdown before the first question
    InitialTimer,
    /// The current question is open for answers
    Answering,
    /// Short pause before the next question
    Cooldown,
    /// Showing the current question's aggregated results
    QuestionResults,
    /// The organizer grades open ended answers one player at a time
    Grading,
    /// The quiz is over, final standings are shown
    QuizResults,
}

/// Configuration options for the game session
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Options {
    /// Skip organizer grading and credit everyone in full, used for test runs
    pub is_test: bool,
    /// Play the questions in a shuffled order
    pub is_random: bool,
}

/// Errors that can occur when admitting a participant name
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name was banned by the organizer
    #[error("name is banned")]
    Banned,
    /// The name is already in use by another player
    #[error("name already in-use")]
    Used,
}

/// Outcome of an alarm delivered into the game
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmOutcome {
    /// The question clock ticked down
    ClockTick {
        /// Time left on the countdown
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The question clock ran out
    ClockElapsed,
    /// A player's typing window lapsed, they count as idle again
    EditingStopped(Id),
}

/// The main game session struct
///
/// One instance runs one room. All mutation goes through `&mut self`, so a
/// host serializes access per room and the whole struct snapshots through
/// serde. The coarse state, the shared timer and the two organizer toggles
/// are public fields driven by the dispatcher; everything else changes only
/// through methods.
#[skip_serializing_none]
#[derive(Serialize, Deserialize)]
pub struct Game {
    /// Snapshot of the quiz being played, taken at room creation
    quiz: Quiz,
    /// Current phase of the session
    pub state: State,
    /// Index of the question currently being played
    current_question_index: usize,
    /// Players in join order
    players: Vec<Player>,
    /// Shared countdown reused for every timed phase
    pub timer: Timer,
    /// Grades for the current open ended question, in player order
    grades: Vec<Grade>,
    /// Aggregated results of finished questions, in presentation order
    total_result_history: Vec<TotalResult>,
    /// Whether new participants are refused
    pub is_room_locked: bool,
    /// Whether the organizer paused the session
    pub is_game_paused: bool,
    /// Whether panic pacing is active for the current question
    is_panic_on: bool,
    /// The organizer's participant ID
    organizer_id: Id,
    /// Whether the organizer left the room
    organizer_has_left: bool,
    /// Names refused at admission, stored normalized
    banned_names: HashSet<String>,
    /// Session options chosen at room creation
    options: Options,
    /// Number of players present at launch
    n_start_players: usize,
    /// When the organizer launched the session
    start_date_time: Option<SystemTime>,
}

impl Debug for Game {
    /// Custom debug implementation that avoids printing large amounts of data
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("quiz", &self.quiz.title)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a new game session for a quiz
    ///
    /// The game keeps its own copy of the quiz, so later catalog edits do
    /// not affect a session already underway. With `is_random` set the
    /// question order is shuffled once here. The reserved organizer name
    /// starts out banned.
    ///
    /// # Arguments
    ///
    /// * `quiz` - The quiz to play, validated by the catalog
    /// * `options` - Session options
    /// * `organizer_id` - Participant ID of the organizer
    ///
    /// # Returns
    ///
    /// A new game in the waiting room, ready to accept players
    pub fn new(mut quiz: Quiz, options: Options, organizer_id: Id) -> Self {
        if options.is_random {
            fastrand::shuffle(&mut quiz.questions);
        }
        Self {
            quiz,
            state: State::WaitingRoom,
            current_question_index: 0,
            players: Vec::new(),
            timer: Timer::new(),
            grades: Vec::new(),
            total_result_history: Vec::new(),
            is_room_locked: false,
            is_game_paused: false,
            is_panic_on: false,
            organizer_id,
            organizer_has_left: false,
            banned_names: HashSet::from([constants::game::RESERVED_ORGANIZER_NAME.to_owned()]),
            options,
            n_start_players: 0,
            start_date_time: None,
        }
    }

    /// Normalized form used for name bans and uniqueness checks
    fn normalize_name(name: &str) -> String {
        rustrict::trim_whitespace(name).to_lowercase()
    }

    /// Adds a player to the roster
    ///
    /// Join order is preserved. Adding an ID already present changes
    /// nothing, so a duplicate join message is harmless.
    pub fn add_player(&mut self, player: Player) {
        if self
            .players
            .iter()
            .all(|existing| existing.id() != player.id())
        {
            self.players.push(player);
        }
    }

    /// Removes a participant from the session
    ///
    /// Removing the organizer only marks them as gone; the session keeps
    /// running so players can finish. Unknown IDs change nothing.
    pub fn remove_player(&mut self, player_id: Id) {
        if player_id == self.organizer_id {
            self.organizer_has_left = true;
        }
        self.players.retain(|player| player.id() != player_id);
    }

    /// Bans a name from being used by future participants
    pub fn ban_name(&mut self, name: &str) {
        self.banned_names.insert(Self::normalize_name(name));
    }

    /// Whether the name is banned, ignoring case and surrounding whitespace
    pub fn is_name_banned(&self, name: &str) -> bool {
        self.banned_names.contains(&Self::normalize_name(name))
    }

    /// Whether a player already uses the name, ignoring case
    pub fn is_name_already_taken(&self, name: &str) -> bool {
        let normalized = Self::normalize_name(name);
        self.players
            .iter()
            .any(|player| Self::normalize_name(player.name()) == normalized)
    }

    /// Validates a requested participant name against the admission rules
    ///
    /// The dispatcher runs this before creating the player. Checks run in
    /// order: length, emptiness after trimming, inappropriate content, the
    /// ban list, then uniqueness.
    ///
    /// # Errors
    ///
    /// * `NameError::TooLong` - Name exceeds the maximum length
    /// * `NameError::Empty` - Name is empty after trimming whitespace
    /// * `NameError::Sinful` - Name contains inappropriate content
    /// * `NameError::Banned` - Name was banned by the organizer
    /// * `NameError::Used` - Name is already taken by another player
    pub fn check_name(&self, name: &str) -> Result<(), NameError> {
        if name.len() > constants::game::MAX_NAME_LENGTH {
            return Err(NameError::TooLong);
        }
        let name = rustrict::trim_whitespace(name);
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.is_inappropriate() {
            return Err(NameError::Sinful);
        }
        if self.is_name_banned(name) {
            return Err(NameError::Banned);
        }
        if self.is_name_already_taken(name) {
            return Err(NameError::Used);
        }
        Ok(())
    }

    /// Sorts the roster itself alphabetically by name
    ///
    /// Comparison is on the lowercased name, so the order ignores case.
    pub fn order_players_alphabetically(&mut self) {
        self.players
            .sort_by_cached_key(|player| player.name().to_lowercase());
    }

    /// The players ordered alphabetically by name, roster untouched
    pub fn players_ordered_alphabetically(&self) -> Vec<&Player> {
        self.players
            .iter()
            .sorted_by_cached_key(|player| player.name().to_lowercase())
            .collect_vec()
    }

    /// The players ordered by descending score
    ///
    /// Sorted alphabetically first, then by score with a stable sort, so
    /// players on equal scores always appear in alphabetical order.
    pub fn players_ordered_by_score(&self) -> Vec<&Player> {
        self.players
            .iter()
            .sorted_by_cached_key(|player| player.name().to_lowercase())
            .sorted_by(|a, b| b.points().total_cmp(&a.points()))
            .collect_vec()
    }

    /// All players in join order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks up a player by ID
    pub fn player(&self, player_id: Id) -> Option<&Player> {
        self.players.iter().find(|player| player.id() == player_id)
    }

    /// Looks up a player by ID for mutation
    fn player_mut(&mut self, player_id: Id) -> Option<&mut Player> {
        self.players
            .iter_mut()
            .find(|player| player.id() == player_id)
    }

    /// Overwrites a player's selected choices, a no-op once they locked
    pub fn update_selected_choices(&mut self, player_id: Id, indexes: Vec<usize>) {
        if let Some(player) = self.player_mut(player_id) {
            player.update_selected_choices(indexes);
        }
    }

    /// Stores a player's long answer draft and restarts their typing window
    ///
    /// # Arguments
    ///
    /// * `player_id` - The player editing their answer
    /// * `text` - The current draft
    /// * `schedule_message` - Function to schedule delayed messages
    pub fn update_long_answer<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        player_id: Id,
        text: String,
        schedule_message: S,
    ) {
        if let Some(player) = self.player_mut(player_id) {
            player.update_long_answer(text, schedule_message);
        }
    }

    /// Locks a player's answer, stamping the current time on first lock
    pub fn lock_answers(&mut self, player_id: Id) {
        self.lock_answers_at(player_id, SystemTime::now());
    }

    /// Locks a player's answer with an explicit stamp
    fn lock_answers_at(&mut self, player_id: Id, at: SystemTime) {
        if let Some(player) = self.player_mut(player_id) {
            player.lock_answers(at);
        }
    }

    /// Locks every player who has not locked yet
    ///
    /// The whole batch shares a single stamp, so stragglers collected when
    /// the clock runs out tie with each other rather than being ordered by
    /// iteration.
    pub fn lock_all_remaining_players_answers(&mut self) {
        let now = SystemTime::now();
        for player in &mut self.players {
            player.lock_answers(now);
        }
    }

    /// Whether every player has locked their answer
    pub fn all_answers_locked(&self) -> bool {
        self.players.iter().all(Player::has_locked_answers)
    }

    /// Scores the current question for every player
    ///
    /// Called once when the question's answering phase ends. For multiple
    /// choice questions every exact match earns the full points, and with
    /// at least two players in the room the unique earliest correct answer
    /// earns the speed bonus on top; an exact tie for earliest earns nobody
    /// the bonus. For open ended questions each player is credited their
    /// grade's share of the points, except in test runs where grading is
    /// skipped and everyone is credited in full.
    pub fn update_players_score(&mut self) {
        let Some(question) = self.quiz.questions.get(self.current_question_index) else {
            return;
        };
        let points = question.points() as f64;

        match question {
            Question::MultipleChoice(choice_question) => {
                let eligible_for_bonus = self.players.len() >= 2;
                let mut matchers = self
                    .players
                    .iter_mut()
                    .filter(|player| {
                        quiz::selection_matches(
                            &choice_question.choices,
                            player.selected_choice_indexes(),
                        )
                    })
                    .collect_vec();
                for player in &mut matchers {
                    player.update_score(points);
                }
                if eligible_for_bonus {
                    if let Ok(first) = matchers
                        .iter_mut()
                        .filter(|player| player.answer_time().is_some())
                        .min_set_by_key(|player| player.answer_time())
                        .into_iter()
                        .exactly_one()
                    {
                        first.update_score_for_bonus(points);
                    }
                }
            }
            Question::OpenEnded(_) => {
                if self.options.is_test {
                    self.grades = vec![Grade::Full];
                    for player in &mut self.players {
                        player.update_score(points);
                    }
                } else {
                    for (player, grade) in self.players.iter_mut().zip(self.grades.iter()) {
                        player.update_score(grade.value() * points);
                    }
                }
            }
        }
    }

    /// Records the organizer's grade for the player currently being graded
    ///
    /// Grades pair with players by position. Once every player is graded,
    /// further grades change nothing.
    pub fn add_grade(&mut self, grade: Grade) {
        if self.grades.len() < self.players.len() {
            self.grades.push(grade);
        }
    }

    /// The player whose answer is up for grading, `None` when done
    pub fn next_player_to_grade(&self) -> Option<&Player> {
        self.players.get(self.grades.len())
    }

    /// One based position of the answer being graded, for display
    pub fn grade_index(&self) -> usize {
        self.grades.len() + 1
    }

    /// Whether every player's answer received a grade
    pub fn are_gradings_finished(&self) -> bool {
        self.grades.len() >= self.players.len()
    }

    /// Grades recorded so far for the current question
    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    /// Zeroed selection counts for the current question
    ///
    /// Carries one key per choice index so displays can render every bar,
    /// and at least two keys even when the question has no choices.
    pub fn empty_selected_choices_total(&self) -> ChoiceTotals {
        let choice_count = self
            .current_question()
            .map_or(0, Question::choice_count)
            .max(constants::question::MIN_CHOICE_COUNT);
        (0..choice_count).map(|index| (index, 0)).collect()
    }

    /// How many players selected each choice of the current question
    ///
    /// Selections outside the question's choice range are dropped.
    pub fn selected_choices_total(&self) -> ChoiceTotals {
        let mut totals = self.empty_selected_choices_total();
        let counts = self
            .players
            .iter()
            .flat_map(|player| player.selected_choice_indexes().iter().copied())
            .counts();
        for (index, count) in counts {
            if let Some(slot) = totals.get_mut(&index) {
                *slot = count;
            }
        }
        totals
    }

    /// How many answers landed in each grade bucket so far
    pub fn long_answer_total(&self) -> GradeTotals {
        let mut totals = GradeTotals::default();
        for grade in &self.grades {
            totals[*grade] += 1;
        }
        totals
    }

    /// How many players are typing an answer right now versus idle
    pub fn editing_long_answer_total(&self) -> EditingTotals {
        let editing = self
            .players
            .iter()
            .filter(|player| player.is_editing_long_answer())
            .count();
        EditingTotals {
            editing,
            idle: self.players.len() - editing,
        }
    }

    /// Appends the current selection counts to the history
    pub fn add_total_selected_choices_to_history(&mut self) {
        let totals = self.selected_choices_total();
        self.total_result_history.push(TotalResult::Choices(totals));
    }

    /// Appends the current grade buckets to the history
    pub fn add_total_long_answers_to_history(&mut self) {
        let totals = self.long_answer_total();
        self.total_result_history.push(TotalResult::Grades(totals));
    }

    /// Aggregated results of finished questions, in presentation order
    pub fn total_result_history(&self) -> &[TotalResult] {
        &self.total_result_history
    }

    /// Moves the session to the next question
    ///
    /// Panic pacing ends and the question's aggregated results are recorded
    /// into the history first. On the last question the index stays where
    /// it is; the dispatcher moves to the final standings instead.
    /// Otherwise every player's answering state and typing window reset,
    /// the grade buffer clears, the shared timer returns to dormant and the
    /// index advances by one.
    pub fn next_question(&mut self) {
        self.is_panic_on = false;
        self.timer.set_tick(constants::timer::DEFAULT_TICK);

        if let Some(question) = self.quiz.questions.get(self.current_question_index) {
            if question.is_open_ended() {
                self.add_total_long_answers_to_history();
            } else {
                self.add_total_selected_choices_to_history();
            }
        }

        if self.is_last_question() {
            return;
        }

        for player in &mut self.players {
            player.reset_for_new_question();
        }
        self.grades.clear();
        self.timer.reset();
        self.current_question_index += 1;
    }

    /// Whether the current question is the quiz's last
    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.quiz.len()
    }

    /// The question currently being played
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current_question_index)
    }

    /// A copy of the current question safe to show while answering is open
    pub fn current_question_without_answers(&self) -> Option<Question> {
        self.current_question().map(Question::without_answers)
    }

    /// Correct choice indexes of the current question
    ///
    /// Empty for open ended questions, which have no fixed answer.
    pub fn answers(&self) -> Vec<usize> {
        self.current_question()
            .map(Question::correct_indexes)
            .unwrap_or_default()
    }

    /// Answering time of the current question
    ///
    /// Multiple choice questions use the quiz's configured duration; open
    /// ended questions always get the fixed writing time.
    pub fn current_question_duration(&self) -> Duration {
        match self.current_question() {
            Some(Question::OpenEnded(_)) => constants::game::OPEN_ANSWER_DURATION,
            _ => self.quiz.duration,
        }
    }

    /// Applies the organizer's pause toggle to the question clock
    ///
    /// Only meaningful while a question is open for answers; in any other
    /// phase this changes nothing. The dispatcher flips `is_game_paused`
    /// first and then calls this to suspend or continue the clock.
    ///
    /// # Arguments
    ///
    /// * `schedule_message` - Function to schedule delayed messages
    pub fn pause_game<S: FnMut(AlarmMessage, Duration)>(&mut self, schedule_message: S) {
        if !matches!(self.state, State::Answering) {
            return;
        }
        if self.is_game_paused {
            self.timer.pause();
        } else {
            self.resume_clock(schedule_message);
        }
    }

    /// Whether panic pacing may start at the given remaining time
    ///
    /// The threshold depends on the kind of question currently played:
    /// open ended questions allow it earlier since their writing time is
    /// longer.
    pub fn can_start_panic_mode(&self, remaining: Duration) -> bool {
        let threshold = match self.current_question() {
            Some(Question::OpenEnded(_)) => constants::game::PANIC_THRESHOLD_OPEN,
            _ => constants::game::PANIC_THRESHOLD_CHOICE,
        };
        remaining <= threshold
    }

    /// Switches the question clock to panic pacing
    ///
    /// Ticks speed up; the real remaining time is unchanged, the countdown
    /// only reports more often. Starting panic pacing twice changes
    /// nothing. A game paused by the organizer picks the faster pacing up
    /// when it resumes.
    ///
    /// # Arguments
    ///
    /// * `schedule_message` - Function to schedule delayed messages
    pub fn start_panic_mode<S: FnMut(AlarmMessage, Duration)>(&mut self, schedule_message: S) {
        if self.is_panic_on {
            return;
        }
        self.is_panic_on = true;
        self.timer.pause();
        self.timer.set_tick(constants::timer::PANIC_TICK);
        if !self.is_game_paused {
            self.resume_clock(schedule_message);
        }
    }

    /// Whether panic pacing is active for the current question
    pub fn is_panic_on(&self) -> bool {
        self.is_panic_on
    }

    /// Resumes the question clock, wrapping its chunks for routing
    fn resume_clock<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule_message: S) {
        self.timer.resume(|pulse, duration| {
            schedule_message(AlarmMessage::QuestionClock(pulse), duration);
        });
    }

    /// Stamps the session launch
    ///
    /// Records the launch time and how many players were present, both of
    /// which end up in the session summary.
    pub fn record_start(&mut self) {
        self.start_date_time = Some(SystemTime::now());
        self.n_start_players = self.players.len();
    }

    /// Summary of the session for the organizer's history page
    ///
    /// The winner is the head of the score ordering; with an empty roster
    /// the high score is zero and there is no winner.
    pub fn history_info(&self) -> HistoryInfo {
        let ordered = self.players_ordered_by_score();
        let top = ordered.first();
        HistoryInfo {
            title: self.quiz.title.clone(),
            start_date_time: self.start_date_time.unwrap_or_else(SystemTime::now),
            high_score: top.map_or(0.0, |player| player.points()),
            winner: top.map(|player| player.name().to_owned()),
            n_players_start: self.n_start_players,
        }
    }

    /// Handles a scheduled alarm delivered by the host
    ///
    /// Question clock chunks drive the shared timer; when the clock runs
    /// out during the answering phase, every remaining player's answer is
    /// locked in the same instant. Typing window chunks are routed to the
    /// player they belong to. Stale chunks and chunks for players no
    /// longer in the room yield `None`.
    ///
    /// # Arguments
    ///
    /// * `message` - The alarm message to process
    /// * `schedule_message` - Function to schedule delayed messages
    ///
    /// # Returns
    ///
    /// What the alarm amounted to, or `None` if it was stale
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        mut schedule_message: S,
    ) -> Option<AlarmOutcome> {
        match message {
            AlarmMessage::QuestionClock(pulse) => {
                let event = self.timer.receive_alarm(&pulse, |pulse, duration| {
                    schedule_message(AlarmMessage::QuestionClock(pulse), duration);
                })?;
                match event {
                    TimerEvent::Tick { remaining } => Some(AlarmOutcome::ClockTick { remaining }),
                    TimerEvent::Completed => {
                        if matches!(self.state, State::Answering) {
                            self.lock_all_remaining_players_answers();
                        }
                        Some(AlarmOutcome::ClockElapsed)
                    }
                }
            }
            AlarmMessage::EditingWindow { player, pulse } => {
                let target = self
                    .players
                    .iter_mut()
                    .find(|existing| existing.id() == player)?;
                let stopped = target.receive_editing_alarm(&pulse, schedule_message);
                stopped.then_some(AlarmOutcome::EditingStopped(player))
            }
        }
    }

    /// The quiz snapshot this session plays
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Index of the question currently being played
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    /// The organizer's participant ID
    pub fn organizer_id(&self) -> Id {
        self.organizer_id
    }

    /// Whether the organizer left the room
    pub fn organizer_has_left(&self) -> bool {
        self.organizer_has_left
    }

    /// The session options chosen at room creation
    pub fn options(&self) -> Options {
        self.options
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::{Choice, ChoiceQuestion, OpenQuestion};
    use uuid::Uuid;

    fn sample_choices() -> Vec<Choice> {
        vec![
            Choice {
                text: "Paris".to_string(),
                is_correct: true,
            },
            Choice {
                text: "Lyon".to_string(),
                is_correct: false,
            },
            Choice {
                text: "Marseille".to_string(),
                is_correct: false,
            },
        ]
    }

    fn sample_quiz() -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Capitals".to_string(),
            description: "A quiz about capitals".to_string(),
            duration: Duration::from_secs(30),
            questions: vec![
                Question::MultipleChoice(ChoiceQuestion {
                    text: "Capital of France?".to_string(),
                    points: 50,
                    choices: sample_choices(),
                }),
                Question::OpenEnded(OpenQuestion {
                    text: "Describe the French Revolution".to_string(),
                    points: 100,
                }),
                Question::MultipleChoice(ChoiceQuestion {
                    text: "Is Bern a capital?".to_string(),
                    points: 20,
                    choices: vec![
                        Choice {
                            text: "Yes".to_string(),
                            is_correct: true,
                        },
                        Choice {
                            text: "No".to_string(),
                            is_correct: false,
                        },
                    ],
                }),
            ],
            is_visible: true,
            last_modification: SystemTime::now(),
        }
    }

    fn sample_game() -> Game {
        Game::new(sample_quiz(), Options::default(), Id::new())
    }

    fn join(game: &mut Game, name: &str) -> Id {
        let id = Id::new();
        game.add_player(Player::new(id, name.to_string()));
        id
    }

    #[test]
    fn test_new_game_starts_in_waiting_room() {
        let game = sample_game();
        assert_eq!(game.state, State::WaitingRoom);
        assert_eq!(game.current_question_index(), 0);
        assert!(game.players().is_empty());
        assert!(!game.is_room_locked);
        assert!(!game.is_game_paused);
        assert!(!game.is_panic_on());
        assert!(!game.organizer_has_left());
        assert!(game.total_result_history().is_empty());
    }

    #[test]
    fn test_add_player_ignores_duplicate_id() {
        let mut game = sample_game();
        let id = Id::new();
        game.add_player(Player::new(id, "Alice".to_string()));
        game.add_player(Player::new(id, "Impostor".to_string()));

        assert_eq!(game.players().len(), 1);
        assert_eq!(game.player(id).unwrap().name(), "Alice");
    }

    #[test]
    fn test_remove_organizer_marks_them_gone() {
        let mut game = sample_game();
        let player_id = join(&mut game, "Alice");

        game.remove_player(game.organizer_id());
        assert!(game.organizer_has_left());
        assert_eq!(game.players().len(), 1);

        game.remove_player(player_id);
        assert!(game.players().is_empty());
    }

    #[test]
    fn test_check_name_policy() {
        let mut game = sample_game();
        join(&mut game, "Alice");

        assert_eq!(game.check_name(&"a".repeat(31)), Err(NameError::TooLong));
        assert_eq!(game.check_name("   "), Err(NameError::Empty));
        assert_eq!(game.check_name("fuck"), Err(NameError::Sinful));
        assert_eq!(game.check_name("Organisateur"), Err(NameError::Banned));
        assert_eq!(game.check_name("ALICE"), Err(NameError::Used));
        assert_eq!(game.check_name("Bob"), Ok(()));
    }

    #[test]
    fn test_ban_name_ignores_case_and_whitespace() {
        let mut game = sample_game();
        game.ban_name("  Troll  ");

        assert!(game.is_name_banned("troll"));
        assert!(game.is_name_banned("TROLL "));
        assert_eq!(game.check_name("Troll"), Err(NameError::Banned));
        assert!(!game.is_name_banned("Trolls"));
    }

    #[test]
    fn test_score_order_breaks_ties_alphabetically() {
        let mut game = sample_game();
        let bob = join(&mut game, "bob");
        let alice = join(&mut game, "Alice");
        let carol = join(&mut game, "carol");

        for id in [alice, bob] {
            game.player_mut(id).unwrap().update_score(50.0);
        }
        game.player_mut(carol).unwrap().update_score(80.0);

        let names = game
            .players_ordered_by_score()
            .iter()
            .map(|player| player.name().to_owned())
            .collect_vec();
        assert_eq!(names, vec!["carol", "Alice", "bob"]);
    }

    #[test]
    fn test_players_ordered_alphabetically_ignores_case() {
        let mut game = sample_game();
        join(&mut game, "bob");
        join(&mut game, "Alice");

        let names = game
            .players_ordered_alphabetically()
            .iter()
            .map(|player| player.name().to_owned())
            .collect_vec();
        assert_eq!(names, vec!["Alice", "bob"]);
        // The roster itself is untouched
        assert_eq!(game.players()[0].name(), "bob");

        game.order_players_alphabetically();
        assert_eq!(game.players()[0].name(), "Alice");
    }

    #[test]
    fn test_selected_choices_frozen_after_lock() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");

        game.update_selected_choices(alice, vec![0, 2]);
        game.lock_answers(alice);
        game.update_selected_choices(alice, vec![1]);

        assert_eq!(game.player(alice).unwrap().selected_choice_indexes(), &[0, 2]);
    }

    #[test]
    fn test_scoring_awards_bonus_to_unique_earliest() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        let base = SystemTime::now();

        game.update_selected_choices(alice, vec![0]);
        game.update_selected_choices(bob, vec![0]);
        game.lock_answers_at(alice, base);
        game.lock_answers_at(bob, base + Duration::from_secs(1));
        game.update_players_score();

        let alice = game.player(alice).unwrap();
        let bob = game.player(bob).unwrap();
        assert_eq!(alice.points(), 60.0);
        assert_eq!(alice.bonus_times(), 1);
        assert!(alice.last_question_is_bonus());
        assert_eq!(bob.points(), 50.0);
        assert_eq!(bob.bonus_times(), 0);
        assert!(!bob.last_question_is_bonus());
    }

    #[test]
    fn test_scoring_tie_awards_no_bonus() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        let stamp = SystemTime::now();

        game.update_selected_choices(alice, vec![0]);
        game.update_selected_choices(bob, vec![0]);
        game.lock_answers_at(alice, stamp);
        game.lock_answers_at(bob, stamp);
        game.update_players_score();

        assert_eq!(game.player(alice).unwrap().points(), 50.0);
        assert_eq!(game.player(bob).unwrap().points(), 50.0);
        assert_eq!(game.player(alice).unwrap().bonus_times(), 0);
        assert_eq!(game.player(bob).unwrap().bonus_times(), 0);
    }

    #[test]
    fn test_scoring_no_bonus_for_lone_player() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");

        game.update_selected_choices(alice, vec![0]);
        game.lock_answers(alice);
        game.update_players_score();

        assert_eq!(game.player(alice).unwrap().points(), 50.0);
        assert_eq!(game.player(alice).unwrap().bonus_times(), 0);
    }

    #[test]
    fn test_scoring_requires_exact_selection() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");

        // Alice picked the correct choice plus a wrong one, Bob nothing
        game.update_selected_choices(alice, vec![0, 1]);
        game.lock_all_remaining_players_answers();
        game.update_players_score();

        assert_eq!(game.player(alice).unwrap().points(), 0.0);
        assert_eq!(game.player(bob).unwrap().points(), 0.0);
    }

    #[test]
    fn test_batch_lock_shares_one_stamp() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");

        game.update_selected_choices(alice, vec![0]);
        game.update_selected_choices(bob, vec![0]);
        game.lock_all_remaining_players_answers();

        assert_eq!(
            game.player(alice).unwrap().answer_time(),
            game.player(bob).unwrap().answer_time()
        );
        assert!(game.all_answers_locked());

        // Shared stamp means an exact tie, so no bonus either way
        game.update_players_score();
        assert_eq!(game.player(alice).unwrap().bonus_times(), 0);
        assert_eq!(game.player(bob).unwrap().bonus_times(), 0);
    }

    #[test]
    fn test_open_ended_scoring_follows_grades() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        let carol = join(&mut game, "Carol");
        game.next_question();

        game.add_grade(Grade::Full);
        game.add_grade(Grade::Half);
        game.add_grade(Grade::Zero);
        assert!(game.are_gradings_finished());
        game.update_players_score();

        assert_eq!(game.player(alice).unwrap().points(), 100.0);
        assert_eq!(game.player(bob).unwrap().points(), 50.0);
        assert_eq!(game.player(carol).unwrap().points(), 0.0);
    }

    #[test]
    fn test_open_ended_test_mode_skips_grading() {
        let mut game = Game::new(
            sample_quiz(),
            Options {
                is_test: true,
                is_random: false,
            },
            Id::new(),
        );
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        game.next_question();

        // Grades recorded beforehand are discarded by the test run
        game.add_grade(Grade::Zero);
        game.update_players_score();

        assert_eq!(game.grades(), &[Grade::Full]);
        assert_eq!(game.player(alice).unwrap().points(), 100.0);
        assert_eq!(game.player(bob).unwrap().points(), 100.0);
    }

    #[test]
    fn test_grading_progression() {
        let mut game = sample_game();
        join(&mut game, "Alice");
        join(&mut game, "Bob");
        game.next_question();

        assert_eq!(game.grade_index(), 1);
        assert_eq!(game.next_player_to_grade().unwrap().name(), "Alice");
        assert!(!game.are_gradings_finished());

        game.add_grade(Grade::Half);
        assert_eq!(game.grade_index(), 2);
        assert_eq!(game.next_player_to_grade().unwrap().name(), "Bob");

        game.add_grade(Grade::Full);
        assert!(game.are_gradings_finished());
        assert!(game.next_player_to_grade().is_none());

        // Extra grades past the roster are dropped
        game.add_grade(Grade::Zero);
        assert_eq!(game.grades().len(), 2);
    }

    #[test]
    fn test_empty_selected_choices_total_keeps_minimum_keys() {
        let mut game = sample_game();
        let totals = game.empty_selected_choices_total();
        assert_eq!(totals.len(), 3);
        assert!(totals.values().all(|count| *count == 0));

        // Open ended questions still get the two key minimum
        game.next_question();
        assert_eq!(game.empty_selected_choices_total().len(), 2);
    }

    #[test]
    fn test_selected_choices_total_counts_selections() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        let carol = join(&mut game, "Carol");

        game.update_selected_choices(alice, vec![0]);
        game.update_selected_choices(bob, vec![0, 2]);
        game.update_selected_choices(carol, vec![17]);

        let totals = game.selected_choices_total();
        assert_eq!(totals.get(&0), Some(&2));
        assert_eq!(totals.get(&1), Some(&0));
        assert_eq!(totals.get(&2), Some(&1));
        assert_eq!(totals.get(&17), None);
    }

    #[test]
    fn test_long_answer_total_buckets_sum_to_grade_count() {
        let mut game = sample_game();
        join(&mut game, "Alice");
        join(&mut game, "Bob");
        join(&mut game, "Carol");
        game.next_question();

        game.add_grade(Grade::Full);
        game.add_grade(Grade::Full);
        game.add_grade(Grade::Zero);

        let totals = game.long_answer_total();
        assert_eq!(totals[Grade::Full], 2);
        assert_eq!(totals[Grade::Half], 0);
        assert_eq!(totals[Grade::Zero], 1);
        assert_eq!(totals.values().sum::<usize>(), game.grades().len());
    }

    #[test]
    fn test_editing_totals_track_typing_players() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        join(&mut game, "Bob");
        game.next_question();

        let mut scheduled = Vec::new();
        game.update_long_answer(alice, "The storming of".to_string(), |m, d| {
            scheduled.push((m, d));
        });

        let totals = game.editing_long_answer_total();
        assert_eq!(totals.editing, 1);
        assert_eq!(totals.idle, 1);
    }

    #[test]
    fn test_next_question_advances_and_resets() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        game.update_selected_choices(alice, vec![0]);
        game.lock_answers(alice);
        game.update_players_score();

        game.next_question();

        assert_eq!(game.current_question_index(), 1);
        assert_eq!(game.total_result_history().len(), 1);
        assert!(matches!(
            game.total_result_history()[0],
            TotalResult::Choices(_)
        ));
        let alice = game.player(alice).unwrap();
        assert!(!alice.has_locked_answers());
        assert!(alice.selected_choice_indexes().is_empty());
        assert_eq!(alice.points(), 50.0);
        assert!(!game.timer.is_running());
    }

    #[test]
    fn test_next_question_on_last_keeps_index() {
        let mut game = sample_game();
        game.next_question();
        game.next_question();
        assert_eq!(game.current_question_index(), 2);
        assert!(game.is_last_question());

        game.next_question();
        assert_eq!(game.current_question_index(), 2);
        // The last question's results still land in the history
        assert_eq!(game.total_result_history().len(), 3);
    }

    #[test]
    fn test_history_entries_match_question_kinds() {
        let mut game = sample_game();
        game.next_question();
        game.add_grade(Grade::Half);
        game.next_question();

        let history = game.total_result_history();
        assert!(matches!(history[0], TotalResult::Choices(_)));
        assert!(matches!(history[1], TotalResult::Grades(_)));
    }

    #[test]
    fn test_pause_game_applies_only_while_answering() {
        let mut game = sample_game();
        let mut scheduled = Vec::new();
        game.timer.start(Duration::from_secs(30), |pulse, d| {
            scheduled.push((AlarmMessage::QuestionClock(pulse), d));
        });

        game.is_game_paused = true;
        game.pause_game(|m, d| scheduled.push((m, d)));
        assert!(!game.timer.is_paused());

        game.state = State::Answering;
        game.pause_game(|m, d| scheduled.push((m, d)));
        assert!(game.timer.is_paused());

        game.is_game_paused = false;
        game.pause_game(|m, d| scheduled.push((m, d)));
        assert!(!game.timer.is_paused());
        assert!(game.timer.is_running());
    }

    #[test]
    fn test_panic_mode_speeds_ticks_only() {
        let mut game = sample_game();
        game.state = State::Answering;
        let mut scheduled = Vec::new();
        game.timer.start(Duration::from_secs(8), |pulse, d| {
            scheduled.push((AlarmMessage::QuestionClock(pulse), d));
        });

        assert!(!game.can_start_panic_mode(Duration::from_secs(11)));
        assert!(game.can_start_panic_mode(Duration::from_secs(8)));

        game.start_panic_mode(|m, d| scheduled.push((m, d)));
        assert!(game.is_panic_on());
        assert_eq!(game.timer.tick_interval(), constants::timer::PANIC_TICK);
        assert_eq!(game.timer.remaining(), Duration::from_secs(8));
        assert!(!game.timer.is_paused());
    }

    #[test]
    fn test_panic_mode_twice_is_noop() {
        let mut game = sample_game();
        game.state = State::Answering;
        let mut scheduled = Vec::new();
        game.timer.start(Duration::from_secs(8), |pulse, d| {
            scheduled.push((AlarmMessage::QuestionClock(pulse), d));
        });

        game.start_panic_mode(|m, d| scheduled.push((m, d)));
        let scheduled_after_first = scheduled.len();
        game.start_panic_mode(|m, d| scheduled.push((m, d)));

        assert_eq!(scheduled.len(), scheduled_after_first);
        assert!(game.is_panic_on());
    }

    #[test]
    fn test_panic_threshold_is_longer_for_open_ended() {
        let mut game = sample_game();
        game.next_question();

        assert!(!game.can_start_panic_mode(Duration::from_secs(21)));
        assert!(game.can_start_panic_mode(Duration::from_secs(20)));
    }

    #[test]
    fn test_next_question_restores_normal_pacing() {
        let mut game = sample_game();
        game.state = State::Answering;
        let mut scheduled = Vec::new();
        game.timer.start(Duration::from_secs(8), |pulse, d| {
            scheduled.push((AlarmMessage::QuestionClock(pulse), d));
        });
        game.start_panic_mode(|m, d| scheduled.push((m, d)));

        game.next_question();
        assert!(!game.is_panic_on());
        assert_eq!(game.timer.tick_interval(), constants::timer::DEFAULT_TICK);
    }

    #[test]
    fn test_clock_running_out_locks_everyone() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        game.state = State::Answering;
        game.update_selected_choices(alice, vec![0]);
        game.lock_answers(alice);

        let mut pending = Vec::new();
        game.timer.start(Duration::from_secs(2), |pulse, d| {
            pending.push((AlarmMessage::QuestionClock(pulse), d));
        });

        let mut outcomes = Vec::new();
        while !pending.is_empty() {
            let (message, _) = pending.remove(0);
            let mut next = Vec::new();
            if let Some(outcome) = game.receive_alarm(message, |m, d| next.push((m, d))) {
                outcomes.push(outcome);
            }
            pending.append(&mut next);
        }

        let expected = vec![
            AlarmOutcome::ClockTick {
                remaining: Duration::from_secs(1),
            },
            AlarmOutcome::ClockElapsed,
        ];
        assert_eq!(outcomes, expected);
        assert!(game.all_answers_locked());
        assert!(game.player(bob).unwrap().answer_time().is_some());
    }

    #[test]
    fn test_editing_window_alarm_reports_idle_player() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        game.next_question();

        let mut scheduled = Vec::new();
        game.update_long_answer(alice, "Draft".to_string(), |m, d| scheduled.push((m, d)));
        let (message, delay) = scheduled.remove(0);
        assert_eq!(delay, constants::player::EDIT_ACTIVITY_WINDOW);

        let outcome = game.receive_alarm(message, |m, d| scheduled.push((m, d)));
        assert_eq!(outcome, Some(AlarmOutcome::EditingStopped(alice)));
        assert!(!game.player(alice).unwrap().is_editing_long_answer());
    }

    #[test]
    fn test_editing_alarm_for_removed_player_is_dropped() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        game.next_question();

        let mut scheduled = Vec::new();
        game.update_long_answer(alice, "Draft".to_string(), |m, d| scheduled.push((m, d)));
        game.remove_player(alice);

        let (message, _) = scheduled.remove(0);
        let outcome = game.receive_alarm(message, |m, d| scheduled.push((m, d)));
        assert_eq!(outcome, None);
    }

    #[test]
    fn test_history_info_with_empty_roster() {
        let game = sample_game();
        let info = game.history_info();
        assert_eq!(info.title, "Capitals");
        assert_eq!(info.high_score, 0.0);
        assert_eq!(info.winner, None);
        assert_eq!(info.n_players_start, 0);
    }

    #[test]
    fn test_history_info_names_the_winner() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        let bob = join(&mut game, "Bob");
        game.record_start();

        game.player_mut(alice).unwrap().update_score(50.0);
        game.player_mut(bob).unwrap().update_score(80.0);

        let info = game.history_info();
        assert_eq!(info.winner.as_deref(), Some("Bob"));
        assert_eq!(info.high_score, 80.0);
        assert_eq!(info.n_players_start, 2);
    }

    #[test]
    fn test_current_question_views() {
        let mut game = sample_game();
        assert_eq!(game.answers(), vec![0]);
        assert_eq!(game.current_question_duration(), Duration::from_secs(30));
        let censored = game.current_question_without_answers().unwrap();
        assert!(censored.correct_indexes().is_empty());

        game.next_question();
        assert!(game.answers().is_empty());
        assert_eq!(game.current_question_duration(), constants::game::OPEN_ANSWER_DURATION);
    }

    #[test]
    fn test_random_order_keeps_the_same_questions() {
        let quiz = sample_quiz();
        let mut texts = quiz
            .questions
            .iter()
            .map(|question| question.text().to_owned())
            .collect_vec();
        texts.sort();

        let game = Game::new(
            quiz,
            Options {
                is_test: false,
                is_random: true,
            },
            Id::new(),
        );
        let mut shuffled = game
            .quiz()
            .questions
            .iter()
            .map(|question| question.text().to_owned())
            .collect_vec();
        shuffled.sort();

        assert_eq!(texts, shuffled);
    }

    #[test]
    fn test_game_serialization_round_trip() {
        let mut game = sample_game();
        let alice = join(&mut game, "Alice");
        game.update_selected_choices(alice, vec![0]);
        game.lock_answers(alice);
        game.update_players_score();
        game.state = State::QuestionResults;
        game.record_start();

        let serialized = serde_json::to_string(&game).unwrap();
        let restored: Game = serde_json::from_str(&serialized).unwrap();

        assert_eq!(restored.state, State::QuestionResults);
        assert_eq!(restored.players().len(), 1);
        assert_eq!(restored.player(alice).unwrap().points(), 50.0);
        assert_eq!(restored.organizer_id(), game.organizer_id());
        assert_eq!(restored.history_info().n_players_start, 1);
    }
}
