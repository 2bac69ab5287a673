//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mapx.
//! The Mapx project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Mapx Error Module
//!
//! This module defines the error types and utilities used throughout the Mapx
//! engine for consistent error handling and reporting.
//!
//! ## Error Categories
//!
//! - **Syntax**: The ruleset text (or a template inside it) cannot be read:
//!   unknown function, wrong number of arguments, unknown keyed argument,
//!   unbalanced delimiters, undeclared prefix, unterminated placeholder
//! - **Semantic**: The text is well formed but a function rejects one of its
//!   literal values (invalid regular expression, non-integer index)
//! - **Runtime**: A bound function failed while mappings were processed
//! - **Field**: A mapping field was read or written with an unknown name or
//!   an incompatible value
//! - **Io**: Ruleset files could not be read
//! - **Serde**: Configuration or mapping (de)serialization failed
//! - **Internal**: Unexpected internal failures
//!
//! Errors raised while compiling carry an [`MxLocation`] so that callers can
//! point at the offending statement.
//!
//! ## Usage
//!
//! ```rust
//! use mapx::errors::{MxError, Result};
//!
//! fn check_arity(args: &[String]) -> Result<()> {
//!     if args.len() > 1 {
//!         return Err(MxError::syntax("too many arguments"));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Mapx.
pub type Result<T> = std::result::Result<T, MxError>;

/// Line and column (both 1-based) inside a ruleset source.
///
/// A zero line means the position is not known yet; the compiler replaces
/// it with the position of the statement being compiled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxLocation {
    pub line: usize,
    pub column: usize,
}

impl MxLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for MxLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "line {}, column {}", self.line, self.column)
        } else {
            write!(f, "unknown position")
        }
    }
}

/// Canonical error enumeration for Mapx.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum MxError {
    /// Ruleset text that cannot be parsed or bound.
    #[error("syntax error at {location}: {message}")]
    Syntax { location: MxLocation, message: String },

    /// Well-formed text carrying a value a function refuses.
    #[error("semantic error at {location}: {message}")]
    Semantic { location: MxLocation, message: String },

    /// Failure of a bound function while processing mappings.
    #[error("function '{function}' failed: {message}")]
    Runtime { function: String, message: String },

    /// Unknown field name or incompatible field value.
    #[error("field '{field}': {message}")]
    Field { field: String, message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for MxError {
    fn from(err: io::Error) -> Self {
        MxError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MxError {
    fn from(err: serde_json::Error) -> Self {
        MxError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for MxError {
    fn from(err: serde_yaml::Error) -> Self {
        MxError::Serde(err.to_string())
    }
}

impl MxError {
    /// Helper to construct syntax errors with an unknown position.
    pub fn syntax<T: Into<String>>(message: T) -> Self {
        MxError::Syntax {
            location: MxLocation::default(),
            message: message.into(),
        }
    }

    /// Helper to construct syntax errors at a known position.
    pub fn syntax_at<T: Into<String>>(location: MxLocation, message: T) -> Self {
        MxError::Syntax {
            location,
            message: message.into(),
        }
    }

    /// Helper to construct semantic errors.
    pub fn semantic<T: Into<String>>(message: T) -> Self {
        MxError::Semantic {
            location: MxLocation::default(),
            message: message.into(),
        }
    }

    /// Helper to construct runtime errors.
    pub fn runtime(function: impl Into<String>, message: impl Into<String>) -> Self {
        MxError::Runtime {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Helper to construct field errors.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        MxError::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        MxError::Internal(message.into())
    }

    /// Fills in the position of a compile error that does not have one yet.
    pub fn with_location(self, at: MxLocation) -> Self {
        match self {
            MxError::Syntax { location, message } if !location.is_known() => {
                MxError::Syntax { location: at, message }
            }
            MxError::Semantic { location, message } if !location.is_known() => {
                MxError::Semantic { location: at, message }
            }
            other => other,
        }
    }

    /// Position of a compile error, if any.
    pub fn location(&self) -> Option<MxLocation> {
        match self {
            MxError::Syntax { location, .. } | MxError::Semantic { location, .. } => {
                Some(*location)
            }
            _ => None,
        }
    }

    /// Message without the category and position prefix.
    pub fn detail(&self) -> String {
        match self {
            MxError::Syntax { message, .. } | MxError::Semantic { message, .. } => message.clone(),
            MxError::Runtime { message, .. } => message.clone(),
            MxError::Field { field, message } => format!("'{}': {}", field, message),
            MxError::Io(message) | MxError::Serde(message) | MxError::Internal(message) => message.clone(),
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, MxError::Syntax { .. })
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, MxError::Semantic { .. })
    }
}
