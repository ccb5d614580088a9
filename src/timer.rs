//! Countdown timer driving question progression
//!
//! The timer owns no clock and no thread. A countdown is sliced into
//! tick-sized chunks: starting the timer schedules the first chunk through
//! the host-provided closure, and every chunk the host delivers back into
//! [`Timer::receive_alarm`] consumes its share of the remaining time, emits
//! a [`TimerEvent`] and schedules the next chunk. Cancellation is a
//! generation counter: pausing or resetting bumps it, so chunks scheduled
//! before the bump are ignored on delivery.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// A pending chunk of a countdown, scheduled with the host and delivered
/// back into [`Timer::receive_alarm`] after its delay
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmMessage {
    /// Countdown run this chunk belongs to
    generation: u64,
    /// Share of the remaining time this chunk consumes on delivery
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    chunk: Duration,
}

/// Outcome of delivering a scheduled chunk into the timer
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerEvent {
    /// The countdown is still going
    Tick {
        /// Time left on the countdown
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// The countdown is consumed, the timer is dormant again
    Completed,
}

/// Resettable countdown with a configurable tick interval
///
/// One timer instance is reused across a whole session: the host starts it
/// for the initial countdown, each question and each cooldown in turn.
/// Every state it carries serializes, so a snapshotted session resumes with
/// its countdown intact (pending chunks from before the snapshot are
/// invalidated by the generation counter).
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    /// Time left on the current countdown
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    remaining: Duration,
    /// Delay between tick deliveries, also the granularity of pausing
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    tick_interval: Duration,
    /// Whether a countdown is underway (paused still counts as running)
    running: bool,
    /// Whether delivery is suspended
    paused: bool,
    /// Bumped on start, pause and reset; chunks carrying an older value
    /// are stale
    generation: u64,
}

impl Timer {
    /// Creates a dormant timer with the default tick interval
    pub fn new() -> Self {
        Self::with_tick(constants::timer::DEFAULT_TICK)
    }

    /// Creates a dormant timer with the given tick interval
    ///
    /// A tick interval as long as the countdown itself turns the timer into
    /// a plain delay: one chunk, no intermediate ticks.
    pub fn with_tick(tick_interval: Duration) -> Self {
        Self {
            remaining: Duration::ZERO,
            tick_interval,
            running: false,
            paused: false,
            generation: 0,
        }
    }

    /// Starts a countdown, discarding any countdown already underway
    ///
    /// The first chunk is scheduled immediately. A zero duration is allowed
    /// and completes on the first delivery.
    ///
    /// # Arguments
    ///
    /// * `duration` - Total countdown time
    /// * `schedule_message` - Function to schedule delayed chunk deliveries
    pub fn start<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        duration: Duration,
        mut schedule_message: S,
    ) {
        self.generation += 1;
        self.remaining = duration;
        self.running = true;
        self.paused = false;
        self.schedule_next_chunk(&mut schedule_message);
    }

    /// Suspends chunk delivery without resetting the remaining countdown
    ///
    /// The in-flight chunk is invalidated rather than partially credited,
    /// so pause granularity is the tick interval. No-op while dormant or
    /// already paused.
    pub fn pause(&mut self) {
        if self.running && !self.paused {
            self.paused = true;
            self.generation += 1;
        }
    }

    /// Continues a paused countdown by scheduling a fresh chunk
    ///
    /// No-op while dormant or not paused.
    pub fn resume<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule_message: S) {
        if self.running && self.paused {
            self.paused = false;
            self.schedule_next_chunk(&mut schedule_message);
        }
    }

    /// Changes the delivery interval for chunks scheduled from now on
    ///
    /// The total remaining time is untouched: a faster tick only makes the
    /// countdown report more often. The chunk already in flight keeps the
    /// size it was scheduled with. A zero interval is ignored.
    pub fn set_tick(&mut self, tick_interval: Duration) {
        if !tick_interval.is_zero() {
            self.tick_interval = tick_interval;
        }
    }

    /// Cancels the countdown and returns the timer to dormant
    ///
    /// Pending chunks become stale. The tick interval is kept.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.remaining = Duration::ZERO;
        self.running = false;
        self.paused = false;
    }

    /// Handles a chunk delivered by the host
    ///
    /// Consumes the chunk's share of the countdown and schedules the next
    /// chunk, or completes. Chunks from a previous generation, or delivered
    /// while the timer is dormant or paused, yield `None`.
    ///
    /// # Arguments
    ///
    /// * `message` - The delivered chunk
    /// * `schedule_message` - Function to schedule delayed chunk deliveries
    ///
    /// # Returns
    ///
    /// The resulting [`TimerEvent`], or `None` if the chunk was stale
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: &AlarmMessage,
        mut schedule_message: S,
    ) -> Option<TimerEvent> {
        if message.generation != self.generation || !self.running || self.paused {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(message.chunk);

        if self.remaining.is_zero() {
            self.running = false;
            Some(TimerEvent::Completed)
        } else {
            self.schedule_next_chunk(&mut schedule_message);
            Some(TimerEvent::Tick {
                remaining: self.remaining,
            })
        }
    }

    /// Schedules the next chunk, no longer than the remaining countdown
    fn schedule_next_chunk<S: FnMut(AlarmMessage, Duration)>(&self, schedule_message: &mut S) {
        let chunk = self.tick_interval.min(self.remaining);
        schedule_message(
            AlarmMessage {
                generation: self.generation,
                chunk,
            },
            chunk,
        );
    }

    /// Time left on the current countdown
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether a countdown is underway, paused or not
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether delivery is suspended
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current delay between tick deliveries
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

impl Default for Timer {
    /// Creates a dormant timer with the default tick interval
    fn default() -> Self {
        Self::new()
    }
}
