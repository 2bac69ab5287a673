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

//! # Text Dialect
//!
//! Products are strings: one line of text per matching mapping.

use std::sync::Arc;

use crate::context::MxRuleContext;
use crate::errors::{MxError, Result};
use crate::mapping::MxMapping;
use crate::registry::{MxBindEnv, MxCall, MxDialect, MxGeneratorFn, MxRegistry};

#[derive(Clone, Copy, Debug, Default)]
pub struct MxTextDialect;

impl MxTextDialect {
    pub fn new() -> Self {
        Self
    }
}

impl MxDialect for MxTextDialect {
    type Product = String;

    fn name(&self) -> &str {
        "text"
    }

    fn register(&self, registry: &mut MxRegistry<String>) -> Result<()> {
        registry.register_generator("format", "S", &[], format_factory)?;
        registry.register_generator("json", "", &["pretty"], json_factory)?;
        Ok(())
    }
}

/// `format(template)`: the rendered template.
#[allow(non_snake_case)]
pub fn format_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxGeneratorFn<String>> {
    let template = env.template(&call.positional[0])?;
    let f: MxGeneratorFn<String> = Arc::new(move |m: &MxMapping, ctx: &MxRuleContext| -> Result<Option<String>> {
        Ok(Some(template.render(m, ctx)?))
    });
    Ok(f)
}

/// `json()`: the mapping as a JSON object; `/pretty=true` indents it.
#[allow(non_snake_case)]
pub fn json_factory(call: &MxCall, _env: &mut MxBindEnv) -> Result<MxGeneratorFn<String>> {
    let pretty = match call.key("pretty") {
        None | Some("false") => false,
        Some("true") => true,
        Some(other) => return Err(call.reject(format!("'/pretty' expects true or false, got '{}'", other))),
    };
    let f: MxGeneratorFn<String> = Arc::new(move |m: &MxMapping, _: &MxRuleContext| -> Result<Option<String>> {
        let value = m.to_json();
        let text = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map(Some).map_err(|e| MxError::runtime("json", e.to_string()))
    });
    Ok(f)
}
