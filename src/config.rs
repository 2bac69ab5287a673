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

//! # Compiler Configuration
//!
//! Settings used when a ruleset is compiled. They can be built in code or
//! loaded from YAML or JSON:
//!
//! ```yaml
//! version: "1.1"
//! builtin_prefixes: true
//! strict: false
//! prefixes:
//!   CL: http://purl.obolibrary.org/obo/CL_
//!   UBERON: http://purl.obolibrary.org/obo/UBERON_
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MxError, Result};
use crate::prefix::MxPrefixMap;
use crate::schema::MxVersion;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MxCompilerConfig {
    /// Prefixes known before the first `prefix` declaration.
    pub prefixes: BTreeMap<String, String>,
    /// Seed the well-known prefixes (sssom, owl, rdf, rdfs, skos, semapv).
    pub builtin_prefixes: bool,
    /// Schema version whose field list is used.
    pub version: MxVersion,
    /// Reject prefix redeclarations.
    pub strict: bool,
    /// Accept filter-less `action(...);` statements.
    pub allow_headers: bool,
}

impl Default for MxCompilerConfig {
    fn default() -> Self {
        Self {
            prefixes: BTreeMap::new(),
            builtin_prefixes: true,
            version: MxVersion::default(),
            strict: false,
            allow_headers: true,
        }
    }
}

impl MxCompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, name: &str, iri: &str) -> Self {
        self.prefixes.insert(name.to_string(), iri.to_string());
        self
    }

    pub fn builtin_prefixes(mut self, enabled: bool) -> Self {
        self.builtin_prefixes = enabled;
        self
    }

    pub fn version(mut self, version: MxVersion) -> Self {
        self.version = version;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn allow_headers(mut self, allow: bool) -> Self {
        self.allow_headers = allow;
        self
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a configuration file, picking the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            other => Err(MxError::Serde(format!(
                "unsupported configuration format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Prefix map the compiler starts from.
    pub fn initial_prefixes(&self) -> MxPrefixMap {
        let mut map = if self.builtin_prefixes {
            MxPrefixMap::with_builtins()
        } else {
            MxPrefixMap::new()
        };
        for (name, iri) in &self.prefixes {
            map.add(name, iri);
        }
        map
    }
}
