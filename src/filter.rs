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

//! # Compiled Filters
//!
//! A [`MxFilter`] is the compiled form of a filter expression. Field names
//! have been checked against the schema, short identifiers expanded and
//! filter functions bound, so evaluation can only fail inside a bound
//! function.
//!
//! ## Field Tests
//!
//! - `F==*`: the field is present
//! - `F==~`: the field is absent (or empty)
//! - `F==value`: exact match
//! - `F==prefix*`: the value starts with `prefix`
//! - `F==""`: same as `F==~`; a quoted `"prefix*"` still matches by prefix
//! - `cardinality==*:n` and similar: any of the covered cardinalities
//! - `F>0.5` and friends: numeric comparison; absent values never match
//!
//! On list fields a test holds when any element satisfies it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::MxRuleContext;
use crate::dsl::ir::MxCompareOp;
use crate::errors::Result;
use crate::mapping::{MxFieldAccess, MxMapping};

/// Bound filter function.
pub type MxFilterFn = Arc<dyn Fn(&MxMapping, &MxRuleContext) -> Result<bool> + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub enum MxFieldTest {
    Present,
    Empty,
    Equals(String),
    StartsWith(String),
    /// Equal to any of the values.
    OneOf(Vec<String>),
    Compare(MxCompareOp, f64),
}

#[derive(Clone)]
pub enum MxFilter {
    Or(Vec<MxFilter>),
    And(Vec<MxFilter>),
    Not(Box<MxFilter>),
    Field {
        field: String,
        test: MxFieldTest,
    },
    Function {
        name: String,
        /// Call as written, for display.
        text: String,
        call: MxFilterFn,
    },
}

impl MxFilter {
    /// Evaluates the filter, short-circuiting `&&` and `||`.
    pub fn evaluate(&self, mapping: &MxMapping, context: &MxRuleContext) -> Result<bool> {
        match self {
            MxFilter::Or(items) => {
                for item in items {
                    if item.evaluate(mapping, context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            MxFilter::And(items) => {
                for item in items {
                    if !item.evaluate(mapping, context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            MxFilter::Not(inner) => Ok(!inner.evaluate(mapping, context)?),
            MxFilter::Field { field, test } => Ok(test.holds(mapping.get(field))),
            MxFilter::Function { call, .. } => call(mapping, context),
        }
    }
}

impl MxFieldTest {
    pub fn holds(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (MxFieldTest::Present, v) => v.is_some(),
            (MxFieldTest::Empty, v) => v.is_none(),
            (_, None) => false,
            (test, Some(Value::Array(items))) => items.iter().any(|item| test.holds_single(item)),
            (test, Some(v)) => test.holds_single(v),
        }
    }

    fn holds_single(&self, value: &Value) -> bool {
        match self {
            MxFieldTest::Present => true,
            MxFieldTest::Empty => false,
            MxFieldTest::Equals(expected) => match value {
                Value::String(s) => s == expected,
                Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
                    (Some(left), Ok(right)) => left == right,
                    _ => false,
                },
                _ => false,
            },
            MxFieldTest::StartsWith(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
            MxFieldTest::OneOf(values) => value.as_str().is_some_and(|s| values.iter().any(|v| v == s)),
            MxFieldTest::Compare(op, right) => value.as_f64().is_some_and(|left| op.holds(left, *right)),
        }
    }
}

impl fmt::Display for MxFieldTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxFieldTest::Present => write!(f, "==*"),
            MxFieldTest::Empty => write!(f, "==~"),
            MxFieldTest::Equals(v) => write!(f, "=={}", v),
            MxFieldTest::StartsWith(v) => write!(f, "=={}*", v),
            MxFieldTest::OneOf(values) => write!(f, "==({})", values.join("|")),
            MxFieldTest::Compare(op, v) => write!(f, "{}{}", op, v),
        }
    }
}

impl MxFilter {
    fn write_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxFilter::Or(_) | MxFilter::And(_) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for MxFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxFilter::Or(items) | MxFilter::And(items) => {
                let sep = if matches!(self, MxFilter::Or(_)) { " || " } else { " && " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    item.write_operand(f)?;
                }
                Ok(())
            }
            MxFilter::Not(inner) => match inner.as_ref() {
                MxFilter::Function { .. } | MxFilter::Not(_) => write!(f, "!{}", inner),
                _ => write!(f, "!({})", inner),
            },
            MxFilter::Field { field, test } => write!(f, "{}{}", field, test),
            MxFilter::Function { text, .. } => f.write_str(text),
        }
    }
}

impl fmt::Debug for MxFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MxFilter({})", self)
    }
}
