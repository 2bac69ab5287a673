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

//! # Mapping Dialect
//!
//! Dialect whose products are mappings: the output of a run is a new mapping
//! set made of every mapping some rule included.
//!
//! - `include()`: emits the mapping, as transformed so far
//! - `exists(template)`: filter holding when the rendered entity is known to
//!   the configured [`MxEntityChecker`]

use std::sync::Arc;

use crate::context::MxRuleContext;
use crate::errors::Result;
use crate::filter::MxFilterFn;
use crate::mapping::MxMapping;
use crate::registry::{MxBindEnv, MxCall, MxDialect, MxGeneratorFn, MxRegistry};

/// Tells whether an entity exists, e.g. in a loaded ontology.
pub trait MxEntityChecker: Send + Sync {
    fn exists(&self, iri: &str) -> bool;
}

#[derive(Clone, Default)]
pub struct MxMappingDialect {
    checker: Option<Arc<dyn MxEntityChecker>>,
}

impl MxMappingDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the `exists` filter.
    pub fn with_checker(mut self, checker: Arc<dyn MxEntityChecker>) -> Self {
        self.checker = Some(checker);
        self
    }
}

impl MxDialect for MxMappingDialect {
    type Product = MxMapping;

    fn name(&self) -> &str {
        "mapping"
    }

    fn register(&self, registry: &mut MxRegistry<MxMapping>) -> Result<()> {
        registry.register_generator("include", "", &[], include_factory)?;

        let checker = self.checker.clone();
        registry.register_filter("exists", "S", &[], move |call: &MxCall, env: &mut MxBindEnv| {
            exists_factory(checker.clone(), call, env)
        })?;
        Ok(())
    }
}

#[allow(non_snake_case)]
pub fn include_factory(_call: &MxCall, _env: &mut MxBindEnv) -> Result<MxGeneratorFn<MxMapping>> {
    let f: MxGeneratorFn<MxMapping> =
        Arc::new(|m: &MxMapping, _: &MxRuleContext| -> Result<Option<MxMapping>> { Ok(Some(m.clone())) });
    Ok(f)
}

fn exists_factory(checker: Option<Arc<dyn MxEntityChecker>>, call: &MxCall, env: &mut MxBindEnv) -> Result<MxFilterFn> {
    let Some(checker) = checker else {
        return Err(call.reject("no entity checker is configured"));
    };
    let template = env.template(&call.positional[0])?;
    let f: MxFilterFn = Arc::new(move |m: &MxMapping, ctx: &MxRuleContext| -> Result<bool> {
        let entity = template.render(m, ctx)?;
        Ok(!entity.is_empty() && checker.exists(&entity))
    });
    Ok(f)
}
