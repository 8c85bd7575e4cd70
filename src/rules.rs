//! Birth/survival rule tables compiled from strings like `"1,3"` or `"0-6"`.
//!
//! Grammar: comma separated tokens, each a decimal count or an inclusive
//! `low-high` range. Whitespace is ignored anywhere in the string. Counts
//! above the table's maximum index are clamped to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AutomatonError, Result};

/// Largest neighbor count any predefined neighborhood can produce.
pub const MAX_NEIGHBORS: u32 = 26;

/// Number of entries in a count table (counts `0..=26`).
pub const COUNT_SLOTS: usize = MAX_NEIGHBORS as usize + 1;

/// What to do with a range whose low bound exceeds its high bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvertedRange {
    /// `"6-2"` contributes nothing.
    #[default]
    Empty,
    /// `"6-2"` is a parse error.
    Reject,
}

/// Membership table over neighbor counts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CountSet([bool; COUNT_SLOTS]);

impl CountSet {
    pub const EMPTY: CountSet = CountSet([false; COUNT_SLOTS]);

    /// Every count from 0 to 26.
    pub const ALL: CountSet = CountSet([true; COUNT_SLOTS]);

    /// Membership test. Counts above 26 are clamped to 26.
    #[inline]
    pub fn contains(&self, count: u32) -> bool {
        self.0[count.min(MAX_NEIGHBORS) as usize]
    }

    pub fn insert(&mut self, count: u32) {
        self.0[count.min(MAX_NEIGHBORS) as usize] = true;
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&member| member)
    }

    pub fn as_array(&self) -> &[bool; COUNT_SLOTS] {
        &self.0
    }

    /// Member counts in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..COUNT_SLOTS as u32).filter(move |&count| self.0[count as usize])
    }
}

impl Default for CountSet {
    fn default() -> Self {
        CountSet::EMPTY
    }
}

/// Canonical rule string: runs of consecutive counts collapse into ranges.
impl fmt::Display for CountSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut counts = self.iter().peekable();
        while let Some(low) = counts.next() {
            let mut high = low;
            while counts.peek() == Some(&(high + 1)) {
                high += 1;
                counts.next();
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if high == low {
                write!(f, "{}", low)?;
            } else {
                write!(f, "{}-{}", low, high)?;
            }
        }
        Ok(())
    }
}

/// Compile a rule string with the default inverted-range policy.
pub fn compile(rule: &str, max_index: u32) -> Result<CountSet> {
    compile_with(rule, max_index, InvertedRange::default())
}

/// Compile a rule string into a count table.
///
/// An entirely empty string (after whitespace removal) yields the empty set.
/// `max_index` is itself clamped to 26, the size of the table.
pub fn compile_with(rule: &str, max_index: u32, inverted: InvertedRange) -> Result<CountSet> {
    let max_index = max_index.min(MAX_NEIGHBORS);
    let stripped: String = rule.chars().filter(|c| !c.is_whitespace()).collect();

    let mut set = CountSet::EMPTY;
    if stripped.is_empty() {
        return Ok(set);
    }

    for token in stripped.split(',') {
        let error = |reason: &str| AutomatonError::RuleParse {
            rule: rule.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        };

        if token.is_empty() {
            return Err(error("empty token"));
        }

        match token.split_once('-') {
            Some((low, high)) => {
                let low = parse_count(low).ok_or_else(|| error("range bound is not a number"))?;
                let high = parse_count(high).ok_or_else(|| error("range bound is not a number"))?;

                if low > high {
                    match inverted {
                        InvertedRange::Empty => continue,
                        InvertedRange::Reject => {
                            return Err(error("range low bound exceeds its high bound"))
                        }
                    }
                }

                for count in low.min(max_index)..=high.min(max_index) {
                    set.insert(count);
                }
            }
            None => {
                let count = parse_count(token).ok_or_else(|| error("not a number"))?;
                set.insert(count.min(max_index));
            }
        }
    }

    Ok(set)
}

/// Parse an unsigned decimal. Values past `u32::MAX` saturate; they get clamped anyway.
fn parse_count(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(text.parse::<u32>().unwrap_or(u32::MAX))
}

/// A `(born, survive)` pair for one neighborhood category.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RuleTable {
    pub born: CountSet,
    pub survive: CountSet,
}

impl RuleTable {
    pub fn new(born: CountSet, survive: CountSet) -> Self {
        RuleTable { born, survive }
    }

    /// Compile both halves. Nothing is returned unless both strings parse.
    pub fn parse(born: &str, survive: &str, inverted: InvertedRange) -> Result<Self> {
        Ok(RuleTable {
            born: compile_with(born, MAX_NEIGHBORS, inverted)?,
            survive: compile_with(survive, MAX_NEIGHBORS, inverted)?,
        })
    }

    /// A table that allows every transition; a no-op filter in mixed mode.
    pub const fn permissive() -> Self {
        RuleTable {
            born: CountSet::ALL,
            survive: CountSet::ALL,
        }
    }

    /// Next state of a cell given its current state and neighbor count.
    #[inline]
    pub fn permits(&self, alive: bool, count: u32) -> bool {
        if alive {
            self.survive.contains(count)
        } else {
            self.born.contains(count)
        }
    }
}
