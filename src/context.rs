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

//! Shared state of one processing call.
//!
//! Directives store variables here; filters, preprocessors, generators and
//! templates read them back. A fresh context is created by every
//! [`MxProcessor::process`](crate::processor::MxProcessor::process) call.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::errors::Result;
use crate::filter::MxFilter;
use crate::mapping::MxMapping;

#[derive(Clone, Debug)]
pub struct MxVariableValue {
    pub value: String,
    /// Mappings this value applies to; `None` applies to all.
    pub filter: Option<Arc<MxFilter>>,
}

#[derive(Clone, Debug, Default)]
pub struct MxRuleContext {
    variables: BTreeMap<String, Vec<MxVariableValue>>,
    /// Keys already seen by each duplicate-detecting filter.
    seen: RefCell<BTreeMap<String, BTreeSet<String>>>,
}

impl MxRuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unconditional value, consulted after every conditional one.
    #[allow(non_snake_case)]
    pub fn set_default(&mut self, name: &str, value: &str) {
        let values = self.variables.entry(name.to_string()).or_default();
        values.retain(|v| v.filter.is_some());
        values.push(MxVariableValue {
            value: value.to_string(),
            filter: None,
        });
    }

    /// Adds a value restricted to the mappings matched by `filter`. Later
    /// conditional values take precedence over earlier ones.
    #[allow(non_snake_case)]
    pub fn set_conditional(&mut self, name: &str, value: &str, filter: Arc<MxFilter>) {
        self.variables
            .entry(name.to_string())
            .or_default()
            .insert(
                0,
                MxVariableValue {
                    value: value.to_string(),
                    filter: Some(filter),
                },
            );
    }

    /// Value of a variable for one mapping: the first value whose filter
    /// matches, or an empty string.
    pub fn resolve(&self, name: &str, mapping: &MxMapping) -> Result<String> {
        let Some(values) = self.variables.get(name) else {
            return Ok(String::new());
        };
        for candidate in values {
            let applies = match &candidate.filter {
                Some(filter) => filter.evaluate(mapping, self)?,
                None => true,
            };
            if applies {
                return Ok(candidate.value.clone());
            }
        }
        Ok(String::new())
    }

    /// Records `key` under `scope`; true when it was already recorded.
    pub fn mark_seen(&self, scope: &str, key: String) -> bool {
        !self.seen.borrow_mut().entry(scope.to_string()).or_default().insert(key)
    }
}
