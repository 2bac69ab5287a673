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

//! Prefix table used to expand short identifiers (`PREFIX:local`) into full
//! IRIs and to shorten IRIs back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{MxError, Result};

/// Prefixes every ruleset knows without declaring them.
pub const MX_BUILTIN_PREFIXES: &[(&str, &str)] = &[
    ("sssom", "https://w3id.org/sssom/"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("semapv", "https://w3id.org/semapv/vocab/"),
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxPrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl MxPrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut map = Self::new();
        for (name, iri) in MX_BUILTIN_PREFIXES {
            map.add(name, iri);
        }
        map
    }

    /// Declares (or redeclares) a prefix.
    pub fn add(&mut self, name: &str, iri: &str) {
        self.prefixes.insert(name.to_string(), iri.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.prefixes.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expands a short identifier.
    ///
    /// Values that already look like IRIs (starting with `http`) or carry no
    /// `:` at all are returned unchanged. An undeclared prefix is a syntax
    /// error.
    pub fn expand(&self, identifier: &str) -> Result<String> {
        if identifier.starts_with("http") {
            return Ok(identifier.to_string());
        }
        let Some((prefix, local)) = identifier.split_once(':') else {
            return Ok(identifier.to_string());
        };
        match self.prefixes.get(prefix) {
            Some(base) => Ok(format!("{}{}", base, local)),
            None => Err(MxError::syntax(format!("undeclared prefix '{}' in '{}'", prefix, identifier))),
        }
    }

    /// Shortens an IRI using the longest matching prefix; unknown IRIs are
    /// returned unchanged.
    pub fn shorten(&self, iri: &str) -> String {
        self.best_match(iri)
            .map(|(name, base)| format!("{}:{}", name, &iri[base.len()..]))
            .unwrap_or_else(|| iri.to_string())
    }

    /// Namespace part of an IRI (the longest declared prefix it starts with).
    pub fn namespace(&self, iri: &str) -> Option<&str> {
        self.best_match(iri).map(|(_, base)| base)
    }

    /// Local part of an IRI: what follows the longest declared prefix, or
    /// else what follows the last `#`, `/` or `:`.
    pub fn local_name<'a>(&self, iri: &'a str) -> &'a str {
        if let Some((_, base)) = self.best_match(iri) {
            return &iri[base.len()..];
        }
        match iri.rfind(|c| c == '#' || c == '/' || c == ':') {
            Some(pos) => &iri[pos + 1..],
            None => iri,
        }
    }

    fn best_match(&self, iri: &str) -> Option<(&str, &str)> {
        self.prefixes
            .iter()
            .filter(|(_, base)| !base.is_empty() && iri.starts_with(base.as_str()))
            .max_by_key(|(_, base)| base.len())
            .map(|(name, base)| (name.as_str(), base.as_str()))
    }
}
