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

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::MxLocation;

/// How an argument or comparison value was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MxLiteralKind {
    /// Bare word; short identifiers are expanded.
    Word,
    /// `<...>`, taken verbatim.
    Iri,
    /// Quoted string, taken verbatim.
    Quoted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxLiteral {
    pub value: String,
    pub kind: MxLiteralKind,
}

impl MxLiteral {
    pub fn word(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: MxLiteralKind::Word }
    }

    pub fn iri(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: MxLiteralKind::Iri }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: MxLiteralKind::Quoted }
    }
}

impl fmt::Display for MxLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MxLiteralKind::Word => write!(f, "{}", self.value),
            MxLiteralKind::Iri => write!(f, "<{}>", self.value),
            MxLiteralKind::Quoted => {
                write!(f, "\"{}\"", self.value.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MxCompareOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl MxCompareOp {
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            MxCompareOp::Eq => left == right,
            MxCompareOp::Gt => left > right,
            MxCompareOp::Ge => left >= right,
            MxCompareOp::Lt => left < right,
            MxCompareOp::Le => left <= right,
        }
    }
}

impl fmt::Display for MxCompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MxCompareOp::Eq => "==",
            MxCompareOp::Gt => ">",
            MxCompareOp::Ge => ">=",
            MxCompareOp::Lt => "<",
            MxCompareOp::Le => "<=",
        };
        f.write_str(text)
    }
}

/// Argument list of a call: positional values then `/key=value` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxArgumentList {
    pub positional: Vec<MxLiteral>,
    pub keyed: Vec<(String, MxLiteral)>,
}

impl fmt::Display for MxArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}", arg)?;
        }
        for (key, arg) in &self.keyed {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "/{}={}", key, arg)?;
        }
        Ok(())
    }
}

/// Filter expression as written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MxFilterExpr {
    Or(Vec<MxFilterExpr>),
    And(Vec<MxFilterExpr>),
    Not(Box<MxFilterExpr>),
    Compare {
        field: String,
        op: MxCompareOp,
        value: MxLiteral,
        location: MxLocation,
    },
    Call {
        name: String,
        arguments: MxArgumentList,
        location: MxLocation,
    },
}

impl MxFilterExpr {
    /// Conjunction of two filters, flattening nested ANDs.
    pub fn and(self, other: MxFilterExpr) -> MxFilterExpr {
        let mut items = Vec::new();
        for expr in [self, other] {
            match expr {
                MxFilterExpr::And(inner) => items.extend(inner),
                e => items.push(e),
            }
        }
        MxFilterExpr::And(items)
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxFilterExpr::Or(_) | MxFilterExpr::And(_) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for MxFilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxFilterExpr::Or(items) | MxFilterExpr::And(items) => {
                let sep = if matches!(self, MxFilterExpr::Or(_)) { " || " } else { " && " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    item.write_operand(f)?;
                }
                Ok(())
            }
            MxFilterExpr::Not(inner) => {
                f.write_str("!")?;
                match inner.as_ref() {
                    MxFilterExpr::Compare { .. } | MxFilterExpr::Or(_) | MxFilterExpr::And(_) => {
                        write!(f, "({})", inner)
                    }
                    _ => write!(f, "{}", inner),
                }
            }
            MxFilterExpr::Compare { field, op, value, .. } => write!(f, "{}{}{}", field, op, value),
            MxFilterExpr::Call { name, arguments, .. } => write!(f, "{}({})", name, arguments),
        }
    }
}

/// Named action with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MxAction {
    pub name: String,
    pub arguments: MxArgumentList,
    pub location: MxLocation,
}

impl fmt::Display for MxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One rule after block desugaring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MxRuleSource {
    pub filter: Option<MxFilterExpr>,
    pub action: MxAction,
    pub tags: BTreeSet<String>,
    pub location: MxLocation,
}

impl fmt::Display for MxRuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            write!(f, "[{}] ", tags.join(", "))?;
        }
        if let Some(filter) = &self.filter {
            write!(f, "{} -> ", filter)?;
        }
        write!(f, "{};", self.action)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MxStatement {
    Prefix {
        name: String,
        iri: String,
        location: MxLocation,
    },
    Rule(MxRuleSource),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MxCDSLProgram {
    pub statements: Vec<MxStatement>,
}

impl MxCDSLProgram {
    #[allow(non_snake_case)]
    pub fn MxFNew() -> Self {
        Self::default()
    }

    #[allow(non_snake_case)]
    pub fn MxFRules(&self) -> impl Iterator<Item = &MxRuleSource> {
        self.statements.iter().filter_map(|s| match s {
            MxStatement::Rule(rule) => Some(rule),
            MxStatement::Prefix { .. } => None,
        })
    }

    #[allow(non_snake_case)]
    pub fn MxFToJson(&self) -> crate::errors::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::errors::MxError::internal(format!("Failed to serialize program: {}", e)))
    }
}
