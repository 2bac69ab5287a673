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

//! # Mapping Schema Module
//!
//! Static, version-tagged list of the fields a mapping record may carry.
//! Every field lookup in the engine goes through [`MxSchema`]; there is no
//! reflection over the mapping type.
//!
//! ## Field Kinds
//!
//! - **Identifier** / **IdentifierList**: IRIs, written as short identifiers
//!   in rules and expanded through the prefix map
//! - **Text** / **TextList**: free strings, never expanded
//! - **Double**: numeric fields usable with `>`, `>=`, `<`, `<=`
//! - **Date**: `YYYY-MM-DD` strings
//! - **Enum**: strings restricted to a fixed set of values

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{MxError, Result};

/// Schema revision a field list belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MxVersion {
    #[serde(rename = "1.0")]
    V1_0,
    #[default]
    #[serde(rename = "1.1")]
    V1_1,
}

impl MxVersion {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "1.0" => Some(MxVersion::V1_0),
            "1.1" => Some(MxVersion::V1_1),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MxSlotKind {
    Identifier,
    IdentifierList,
    Text,
    TextList,
    Double,
    Date,
    Enum,
}

impl MxSlotKind {
    pub fn is_list(self) -> bool {
        matches!(self, MxSlotKind::IdentifierList | MxSlotKind::TextList)
    }

    pub fn is_identifier(self) -> bool {
        matches!(self, MxSlotKind::Identifier | MxSlotKind::IdentifierList)
    }
}

/// One field of the mapping record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MxSlot {
    pub name: &'static str,
    pub kind: MxSlotKind,
    pub since: MxVersion,
    /// Allowed values for [`MxSlotKind::Enum`] fields.
    pub values: &'static [&'static str],
}

const ENTITY_TYPES: &[&str] = &[
    "owl class",
    "owl object property",
    "owl data property",
    "owl annotation property",
    "owl named individual",
    "skos concept",
    "rdfs resource",
    "rdfs class",
    "rdfs literal",
    "rdfs datatype",
    "rdf property",
    "composed entity expression",
];

const CARDINALITIES: &[&str] = &["1:1", "1:n", "n:1", "1:0", "0:1", "n:n", "0:0"];

const PREDICATE_MODIFIERS: &[&str] = &["Not"];

const fn slot(name: &'static str, kind: MxSlotKind) -> MxSlot {
    MxSlot { name, kind, since: MxVersion::V1_0, values: &[] }
}

const fn slot_since(name: &'static str, kind: MxSlotKind, since: MxVersion) -> MxSlot {
    MxSlot { name, kind, since, values: &[] }
}

const fn enum_slot(name: &'static str, values: &'static [&'static str], since: MxVersion) -> MxSlot {
    MxSlot { name, kind: MxSlotKind::Enum, since, values }
}

use MxSlotKind::*;

/// Every known field, in canonical order.
pub const MX_SLOTS: &[MxSlot] = &[
    slot_since("record_id", Identifier, MxVersion::V1_1),
    slot("subject_id", Identifier),
    slot("subject_label", Text),
    slot("subject_category", Text),
    slot("predicate_id", Identifier),
    slot("predicate_label", Text),
    enum_slot("predicate_modifier", PREDICATE_MODIFIERS, MxVersion::V1_0),
    slot("object_id", Identifier),
    slot("object_label", Text),
    slot("object_category", Text),
    slot("mapping_justification", Identifier),
    slot("author_id", IdentifierList),
    slot("author_label", TextList),
    slot("reviewer_id", IdentifierList),
    slot("reviewer_label", TextList),
    slot("creator_id", IdentifierList),
    slot("creator_label", TextList),
    slot("license", Text),
    enum_slot("subject_type", ENTITY_TYPES, MxVersion::V1_0),
    slot("subject_source", Identifier),
    slot("subject_source_version", Text),
    enum_slot("object_type", ENTITY_TYPES, MxVersion::V1_0),
    slot("object_source", Identifier),
    slot("object_source_version", Text),
    enum_slot("predicate_type", ENTITY_TYPES, MxVersion::V1_1),
    slot("mapping_provider", Text),
    slot("mapping_source", Identifier),
    enum_slot("mapping_cardinality", CARDINALITIES, MxVersion::V1_0),
    slot_since("cardinality_scope", TextList, MxVersion::V1_1),
    slot("mapping_tool", Text),
    slot_since("mapping_tool_id", Identifier, MxVersion::V1_1),
    slot("mapping_tool_version", Text),
    slot("mapping_date", Date),
    slot("publication_date", Date),
    slot("confidence", Double),
    slot_since("curation_rule", IdentifierList, MxVersion::V1_1),
    slot_since("curation_rule_text", TextList, MxVersion::V1_1),
    slot("subject_match_field", IdentifierList),
    slot("object_match_field", IdentifierList),
    slot("match_string", TextList),
    slot("subject_preprocessing", IdentifierList),
    slot("object_preprocessing", IdentifierList),
    slot_since("similarity_score", Double, MxVersion::V1_1),
    slot_since("similarity_measure", Text, MxVersion::V1_1),
    slot("see_also", TextList),
    slot_since("issue_tracker_item", Identifier, MxVersion::V1_1),
    slot("other", Text),
    slot("comment", Text),
];

/// Short names accepted on the left of a filter comparison.
pub const MX_FILTER_ALIASES: &[(&str, &str)] = &[
    ("subject", "subject_id"),
    ("predicate", "predicate_id"),
    ("object", "object_id"),
    ("justification", "mapping_justification"),
    ("author", "author_id"),
    ("creator", "creator_id"),
    ("reviewer", "reviewer_id"),
    ("cardinality", "mapping_cardinality"),
    ("semantic_similarity_score", "similarity_score"),
];

/// Field list of one schema revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MxSchema {
    version: MxVersion,
}

impl Default for MxSchema {
    fn default() -> Self {
        Self::for_version(MxVersion::default())
    }
}

impl MxSchema {
    pub fn for_version(version: MxVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> MxVersion {
        self.version
    }

    /// Fields of this revision, in canonical order.
    pub fn slots(&self) -> impl Iterator<Item = &'static MxSlot> + '_ {
        MX_SLOTS.iter().filter(move |s| s.since <= self.version)
    }

    pub fn slot(&self, name: &str) -> Option<&'static MxSlot> {
        MX_SLOTS
            .iter()
            .find(|s| s.name == name && s.since <= self.version)
    }

    /// Looks a field up, turning an unknown name into a syntax error.
    pub fn require(&self, name: &str) -> Result<&'static MxSlot> {
        self.slot(name)
            .ok_or_else(|| MxError::syntax(format!("unknown mapping field '{}'", name)))
    }

    /// Like [`MxSchema::require`], also accepting the short filter names
    /// (`subject`, `justification`, ...).
    pub fn require_filter_field(&self, name: &str) -> Result<&'static MxSlot> {
        let canonical = MX_FILTER_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |(_, slot)| *slot);
        self.require(canonical)
            .map_err(|_| MxError::syntax(format!("unknown mapping field '{}'", name)))
    }

    /// Name of the field on the other side of the mapping
    /// (`subject_label` for `object_label` and vice versa).
    pub fn counterpart(name: &str) -> Option<String> {
        if let Some(rest) = name.strip_prefix("subject_") {
            Some(format!("object_{}", rest))
        } else {
            name.strip_prefix("object_").map(|rest| format!("subject_{}", rest))
        }
    }
}

impl MxSlot {
    /// Checks and normalizes a value before it is stored in this field.
    ///
    /// Single strings given to list fields become one-element lists; numbers
    /// written as strings are parsed for double fields.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match self.kind {
            IdentifierList | TextList => match value {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(s) => out.push(Value::String(s)),
                            other => {
                                return Err(MxError::field(
                                    self.name,
                                    format!("list items must be strings, got {}", other),
                                ))
                            }
                        }
                    }
                    Ok(Value::Array(out))
                }
                Value::String(s) => Ok(Value::Array(vec![Value::String(s)])),
                other => Err(MxError::field(self.name, format!("expected a list of strings, got {}", other))),
            },
            Double => match value {
                Value::Number(n) => Ok(Value::Number(n)),
                Value::String(s) => {
                    let parsed: f64 = s.trim().parse().map_err(|_| {
                        MxError::field(self.name, format!("'{}' is not a number", s))
                    })?;
                    serde_json::Number::from_f64(parsed)
                        .map(Value::Number)
                        .ok_or_else(|| MxError::field(self.name, format!("'{}' is not a finite number", s)))
                }
                other => Err(MxError::field(self.name, format!("expected a number, got {}", other))),
            },
            Date => match value {
                Value::String(s) if is_date(&s) => Ok(Value::String(s)),
                other => Err(MxError::field(self.name, format!("expected a YYYY-MM-DD date, got {}", other))),
            },
            Enum => match value {
                Value::String(s) if self.values.is_empty() || self.values.contains(&s.as_str()) => {
                    Ok(Value::String(s))
                }
                other => Err(MxError::field(self.name, format!("invalid value {}", other))),
            },
            Identifier | Text => match value {
                Value::String(s) => Ok(Value::String(s)),
                other => Err(MxError::field(self.name, format!("expected a string, got {}", other))),
            },
        }
    }
}

fn is_date(text: &str) -> bool {
    let parts: Vec<&str> = text.split('-').collect();
    parts.len() == 3
        && parts[0].len() == 4
        && parts[1].len() == 2
        && parts[2].len() == 2
        && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
}
