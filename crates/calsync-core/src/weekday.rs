//! A compact set of weekdays.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

const ALL_BITS: u8 = 0b0111_1111;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A set of weekdays stored as seven bits (bit 0 is Monday).
///
/// Serializes as the raw bits; deserializing masks off the eighth bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct WeekdaySet(u8);

impl From<u8> for WeekdaySet {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<WeekdaySet> for u8 {
    fn from(set: WeekdaySet) -> Self {
        set.0
    }
}

impl WeekdaySet {
    /// Creates an empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates a set holding a single weekday.
    pub fn single(day: Weekday) -> Self {
        Self(bit(day))
    }

    /// Creates a set from raw bits; bits above the seventh are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & ALL_BITS)
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Adds a weekday. Returns `true` if it was not already present.
    pub fn insert(&mut self, day: Weekday) -> bool {
        let was_present = self.contains(day);
        self.0 |= bit(day);
        !was_present
    }

    /// Returns `true` if the weekday is in the set.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    /// Number of weekdays in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if no weekday is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates members from Monday to Sunday.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(|day| self.contains(*day))
    }

    /// Returns the only member when the set holds exactly one weekday.
    pub fn only(&self) -> Option<Weekday> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}
