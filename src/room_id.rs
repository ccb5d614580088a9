//! Room code generation and management
//!
//! This module provides functionality for generating and managing the join
//! codes that identify live rooms. Room codes are four digit decimal numbers
//! so organizers can read them out loud to the class.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use enum_map::{Enum, EnumArray};
use serde::{Deserialize, Deserializer, Serialize};

/// Minimum value for generated room codes
const MIN_VALUE: u16 = 1_000;
/// Maximum value for generated room codes (exclusive)
const MAX_VALUE: u16 = 10_000;

/// A join code identifying a live room
///
/// Room codes are generated randomly within a specific range so they always
/// display as four decimal digits. Participants type the code to join, so it
/// has to be short and unambiguous when spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(u16);

impl RoomId {
    /// Creates a new random room code
    ///
    /// The code is generated within the valid range to ensure it displays
    /// as a four digit decimal number.
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for RoomId {
    /// Creates a new random room code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomId {
    /// Formats the room code as a four digit decimal number
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl Serialize for RoomId {
    /// Serializes the room code as its four digit string
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoomId {
    /// Deserializes a room code from its four digit string
    fn deserialize<D>(deserializer: D) -> Result<RoomId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomId::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl FromStr for RoomId {
    type Err = ParseIntError;

    /// Parses a room code from its decimal string representation
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string cannot be parsed as a valid
    /// decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str(s)?))
    }
}

impl Enum for RoomId {
    /// Total number of possible room codes
    const LENGTH: usize = (MAX_VALUE - MIN_VALUE) as usize;

    /// Creates a room code from a usize index
    ///
    /// # Panics
    ///
    /// Panics if the value is out of range for the enum.
    fn from_usize(value: usize) -> Self {
        Self(u16::try_from(value).expect("index out of range for Enum::from_usize") + MIN_VALUE)
    }

    /// Converts the room code to a usize index
    ///
    /// The returned value is clamped to the valid range to prevent
    /// array access violations.
    fn into_usize(self) -> usize {
        usize::from(self.0.saturating_sub(MIN_VALUE)).min(RoomId::LENGTH - 1)
    }
}

impl<V> EnumArray<V> for RoomId {
    /// Array type for storing values indexed by `RoomId`
    type Array = [V; Self::LENGTH];
}
