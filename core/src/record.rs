// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Log record and levels.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use jiff::Zoned;

use crate::Error;
use crate::ErrorKind;

/// The payload of a log message.
#[derive(Clone, Debug)]
pub struct Record<'a> {
    // the observed time
    now: Zoned,

    level: Level,
    payload: Cow<'a, str>,
}

impl<'a> Record<'a> {
    /// The observed time.
    pub fn time(&self) -> &Zoned {
        &self.now
    }

    /// The verbosity level of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message body.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder<'a> {
        RecordBuilder::default()
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    record: Record<'a>,
}

impl Default for RecordBuilder<'_> {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                now: Zoned::now(),
                level: Level::Info,
                payload: Cow::Borrowed(""),
            },
        }
    }
}

impl<'a> RecordBuilder<'a> {
    /// Set [`time`](Record::time).
    pub fn time(mut self, now: Zoned) -> Self {
        self.record.now = now;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`payload`](Record::payload).
    pub fn payload(mut self, payload: impl Into<Cow<'a, str>>) -> Self {
        self.record.payload = payload.into();
        self
    }

    /// Invoke the builder and return a `Record`
    pub fn build(self) -> Record<'a> {
        self.record
    }
}

/// An enum representing the available severity levels, from the least to the most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates information useful when debugging.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates errors the process can survive.
    Error,
    /// Designates errors the process is unlikely to survive.
    Fatal,
}

impl Level {
    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Parse a level name case-insensitively, falling back to [`Level::Info`] for unrecognized
    /// names.
    ///
    /// # Examples
    ///
    /// ```
    /// use zaplog_core::record::Level;
    ///
    /// assert_eq!(Level::parse_or_default("warn"), Level::Warn);
    /// assert_eq!(Level::parse_or_default("verbose"), Level::Info);
    /// ```
    pub fn parse_or_default(s: &str) -> Level {
        s.parse().unwrap_or(Level::Info)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in [
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
            Level::Fatal,
        ] {
            if s.trim().eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }

        Err(Error::new(
            ErrorKind::ConfigInvalid,
            format!("malformed level: {s:?}"),
        ))
    }
}

/// An enum representing the available level filters of a sink.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LevelFilter {
    /// Disables all levels.
    Off,
    /// Enables if the target level is at least as severe as the threshold.
    MoreSevereEqual(Level),
    /// Enables all levels.
    All,
}

impl Default for LevelFilter {
    fn default() -> Self {
        LevelFilter::MoreSevereEqual(Level::Info)
    }
}

impl From<Level> for LevelFilter {
    fn from(threshold: Level) -> Self {
        LevelFilter::MoreSevereEqual(threshold)
    }
}

impl LevelFilter {
    /// Checks the given level if satisfies the filter condition.
    ///
    /// # Examples
    ///
    /// ```
    /// use zaplog_core::record::Level;
    /// use zaplog_core::record::LevelFilter;
    ///
    /// let level_filter = LevelFilter::MoreSevereEqual(Level::Warn);
    ///
    /// assert_eq!(level_filter.test(Level::Debug), false);
    /// assert_eq!(level_filter.test(Level::Info), false);
    /// assert_eq!(level_filter.test(Level::Warn), true);
    /// assert_eq!(level_filter.test(Level::Fatal), true);
    /// ```
    pub fn test(&self, level: Level) -> bool {
        match self {
            LevelFilter::Off => false,
            LevelFilter::MoreSevereEqual(threshold) => level >= *threshold,
            LevelFilter::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("DEBUG".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("Error".parse::<Level>().unwrap(), Level::Error);
        assert_eq!(" fatal ".parse::<Level>().unwrap(), Level::Fatal);
        assert!("trace".parse::<Level>().is_err());

        assert_eq!(Level::parse_or_default("trace"), Level::Info);
        assert_eq!(Level::parse_or_default(""), Level::Info);
        assert_eq!(Level::parse_or_default("wArN"), Level::Warn);
    }

    #[test]
    fn test_level_filter() {
        assert!(!LevelFilter::Off.test(Level::Fatal));
        assert!(LevelFilter::All.test(Level::Debug));

        let filter = LevelFilter::default();
        assert!(!filter.test(Level::Debug));
        assert!(filter.test(Level::Info));
        assert!(filter.test(Level::Error));
    }

    #[test]
    fn test_level_display_pads() {
        assert_eq!(format!("{:>5}", Level::Info), " INFO");
        assert_eq!(format!("{}", Level::Fatal), "FATAL");
    }
}
