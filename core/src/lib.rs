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

//! Core structs and functions shared by zaplog appenders and bridges.
//!
//! # Example
//!
//! ```
//! use zaplog_core::Layout;
//! use zaplog_core::layout::TaggedTextLayout;
//! use zaplog_core::record::Level;
//! use zaplog_core::record::Record;
//!
//! let layout = TaggedTextLayout::new("billing");
//! let record = Record::builder()
//!     .level(Level::Warn)
//!     .payload("disk usage at 91%")
//!     .build();
//!
//! let line = String::from_utf8(layout.format(&record).unwrap()).unwrap();
//! assert!(line.ends_with("[WARN] [billing] disk usage at 91%"));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod layout;
pub mod record;
pub mod trap;

pub use self::append::Append;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::layout::Layout;
pub use self::trap::Trap;

mod error;
