//! # Kwiz Game Library
//!
//! This library provides the core session logic for the Kwiz live quiz
//! system. It handles room state, player management, answer collection and
//! scoring, organizer grading of open ended answers, and the countdown
//! timers pacing every question.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod game;
pub mod player;
pub mod quiz;
pub mod room_id;
pub mod tally;
pub mod timer;

/// Alarm messages for timed events across a session
///
/// The game never sleeps on its own: whenever it needs waking later it
/// hands one of these to the host's scheduling closure together with a
/// delay, and the host delivers it back into [`game::Game::receive_alarm`]
/// once the delay passes.
#[derive(Debug, Clone, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// A chunk of the shared question clock
    QuestionClock(timer::AlarmMessage),
    /// A chunk of one player's typing activity window
    #[from(ignore)]
    EditingWindow {
        /// The player whose window this chunk belongs to
        player: player::Id,
        /// The underlying countdown chunk
        pulse: timer::AlarmMessage,
    },
}

impl AlarmMessage {
    /// Converts the alarm message to a JSON string for queueing
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
