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

//! # Mapping Record Module
//!
//! This module defines [`MxMapping`], the record every rule operates on: a
//! subject/predicate/object correspondence plus its metadata.
//!
//! ## Field Model
//!
//! Fields are stored by name as JSON values (strings, string lists and
//! numbers). Names and value shapes are checked against the
//! [`MxSchema`](crate::schema::MxSchema) of the record's version. Empty
//! strings and empty lists are never stored, so "present" always means
//! "present and non-empty".
//!
//! ## Inversion
//!
//! [`MxMapping::invert`] swaps the subject and object sides of a mapping. The
//! new predicate comes from an [`MxPredicateTable`]; mappings whose predicate
//! has no known inverse cannot be inverted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{MxError, Result};
use crate::schema::{MxSchema, MxVersion};

/// Name-based read/write access to the fields of a record.
pub trait MxFieldAccess {
    /// Value of a field, `None` when absent.
    fn get(&self, name: &str) -> Option<&Value>;

    /// Sets or (with `None`) clears a field.
    fn set(&mut self, name: &str, value: Option<Value>) -> Result<()>;
}

/// Semantic mapping record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MxMapping {
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(skip)]
    version: MxVersion,
}

impl MxMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_version(version: MxVersion) -> Self {
        Self {
            fields: Map::new(),
            version,
        }
    }

    /// Builds a mapping from a JSON object, validating every field.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(MxError::Serde("a mapping must be a JSON object".to_string()));
        };
        let mut mapping = Self::new();
        for (name, value) in object {
            mapping.set(&name, Some(value))?;
        }
        Ok(mapping)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Builder-style setter.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, Some(value.into()))?;
        Ok(self)
    }

    /// Modified copy, leaving `self` untouched.
    pub fn with_field(&self, name: &str, value: Option<Value>) -> Result<Self> {
        let mut copy = self.clone();
        copy.set(name, value)?;
        Ok(copy)
    }

    pub fn version(&self) -> MxVersion {
        self.version
    }

    pub fn schema(&self) -> MxSchema {
        MxSchema::for_version(self.version)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Values of a field as a list; single values become one-element lists.
    pub fn list(&self, name: &str) -> Vec<&str> {
        match self.fields.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.text("subject_id")
    }

    pub fn predicate_id(&self) -> Option<&str> {
        self.text("predicate_id")
    }

    pub fn object_id(&self) -> Option<&str> {
        self.text("object_id")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stable digest of the mapping content.
    ///
    /// Fields are hashed in canonical schema order so two records with the
    /// same content always share a digest.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for slot in self.schema().slots() {
            if let Some(value) = self.fields.get(slot.name) {
                hasher.update(slot.name.as_bytes());
                hasher.update(b"\0");
                hasher.update(value.to_string().as_bytes());
                hasher.update(b"\n");
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Inverted copy using the inverse predicate from `table`, or `None`
    /// when the predicate is not invertible.
    pub fn invert(&self, table: &dyn MxPredicateTable) -> Option<MxMapping> {
        let predicate = self.predicate_id()?;
        let inverse = table.inverse(predicate)?;
        Some(self.invert_with(&inverse))
    }

    /// Inverted copy carrying an explicit predicate.
    pub fn invert_with(&self, predicate: &str) -> MxMapping {
        let mut inverted = MxMapping::for_version(self.version);
        for (name, value) in &self.fields {
            let target = MxSchema::counterpart(name).unwrap_or_else(|| name.clone());
            inverted.fields.insert(target, value.clone());
        }
        if predicate != self.predicate_id().unwrap_or_default() {
            inverted.fields.remove("predicate_label");
        }
        inverted
            .fields
            .insert("predicate_id".to_string(), Value::String(predicate.to_string()));
        if let Some(cardinality) = self.text("mapping_cardinality") {
            let inverse = match cardinality {
                "1:n" => "n:1",
                "n:1" => "1:n",
                "1:0" => "0:1",
                "0:1" => "1:0",
                other => other,
            };
            inverted
                .fields
                .insert("mapping_cardinality".to_string(), Value::String(inverse.to_string()));
        }
        inverted
    }
}

impl MxFieldAccess for MxMapping {
    fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn set(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        let slot = self.schema().slot(name).ok_or_else(|| {
            MxError::field(name, format!("not a field of schema version {:?}", self.version))
        })?;
        let value = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(v) => Some(slot.coerce(v)?),
        };
        match value {
            Some(v) => {
                self.fields.insert(name.to_string(), v);
            }
            None => {
                self.fields.remove(name);
            }
        }
        Ok(())
    }
}

/// Lookup of inverse predicates, used by inversion.
pub trait MxPredicateTable: Send + Sync {
    fn inverse(&self, predicate: &str) -> Option<String>;
}

/// Inverse table for the commonly used mapping predicates.
#[derive(Clone, Debug)]
pub struct MxCommonPredicates {
    inverses: BTreeMap<String, String>,
}

impl Default for MxCommonPredicates {
    fn default() -> Self {
        let mut table = Self {
            inverses: BTreeMap::new(),
        };
        let skos = "http://www.w3.org/2004/02/skos/core#";
        let semapv = "https://w3id.org/semapv/vocab/";
        table.add_symmetric(&format!("{}exactMatch", skos));
        table.add_pair(&format!("{}narrowMatch", skos), &format!("{}broadMatch", skos));
        table.add_symmetric("http://www.w3.org/2002/07/owl#equivalentClass");
        table.add_symmetric(&format!("{}crossSpeciesExactMatch", semapv));
        table.add_pair(
            &format!("{}crossSpeciesNarrowMatch", semapv),
            &format!("{}crossSpeciesBroadMatch", semapv),
        );
        table
    }
}

impl MxCommonPredicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table, for callers that supply their own predicates.
    pub fn empty() -> Self {
        Self {
            inverses: BTreeMap::new(),
        }
    }

    pub fn add_symmetric(&mut self, predicate: &str) {
        self.inverses.insert(predicate.to_string(), predicate.to_string());
    }

    pub fn add_pair(&mut self, predicate: &str, inverse: &str) {
        self.inverses.insert(predicate.to_string(), inverse.to_string());
        self.inverses.insert(inverse.to_string(), predicate.to_string());
    }
}

impl MxPredicateTable for MxCommonPredicates {
    fn inverse(&self, predicate: &str) -> Option<String> {
        self.inverses.get(predicate).cloned()
    }
}
