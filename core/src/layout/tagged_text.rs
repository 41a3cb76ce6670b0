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

use std::fmt::Write;

use crate::Error;
use crate::Layout;
use crate::record::Record;

/// A layout that formats log records as bracketed plain text carrying a service tag.
///
/// Output format:
///
/// ```text
/// [2024-08-10 09:30:00] [INFO] [billing] invoice batch started
/// [2024-08-10 09:30:02] [WARN] [billing] retrying payment provider
/// [2024-08-10 09:30:05] [ERROR] [billing] payment provider unreachable
/// ```
///
/// The timestamp is rendered in the time zone carried by the record.
///
/// # Examples
///
/// ```
/// use zaplog_core::layout::TaggedTextLayout;
///
/// let layout = TaggedTextLayout::new("billing");
/// assert_eq!(layout.tag(), "billing");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaggedTextLayout {
    tag: String,
}

impl TaggedTextLayout {
    /// Create a layout that embeds `tag` in every line.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// The tag embedded in every line.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Layout for TaggedTextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();

        let time = record.time().strftime("%Y-%m-%d %H:%M:%S");
        let level = record.level();
        let tag = &self.tag;
        let message = record.payload();
        // SAFETY: write to a string always succeeds
        write!(&mut text, "[{time}] [{level}] [{tag}] {message}").unwrap();

        Ok(text.into_bytes())
    }
}
