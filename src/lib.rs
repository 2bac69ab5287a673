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

//! # Mapx Core Library
//!
//! Mapx transforms semantic mapping sets (subject, predicate and object
//! correspondences between vocabulary terms, with their justification and
//! provenance metadata) through a small rule language.
//!
//! ## Module Overview
//!
//! - **errors**: `MxError` taxonomy and the crate-wide `Result`
//! - **schema**: versioned list of mapping fields and their kinds
//! - **prefix**: prefix table used to expand and shorten identifiers
//! - **mapping**: `MxMapping` record, field access and inversion
//! - **dsl**: lexer, parser, IR and rule compiler
//! - **filter**: compiled filter expressions
//! - **context**: variables shared by the rules of one run
//! - **formatter**: placeholder templates and modifiers
//! - **registry**: function registry and the `MxDialect` trait
//! - **functions**: base language shared by every dialect
//! - **config**: compiler configuration (YAML or JSON)
//! - **processor**: runs a compiled ruleset over mappings
//! - **dialects**: mapping and text dialects
//!
//! ## Feature Flags
//!
//! - `mapping-dialect`: dialect producing mappings (`include`, `exists`)
//! - `text-dialect`: dialect producing strings (`format`, `json`)
//! - `full`: enables all dialects
//!
//! ## Quick Start
//!
//! ```rust
//! use mapx::{MxCDSLCompiler, MxMapping, MxMappingDialect, MxProcessor};
//!
//! let compiler = MxCDSLCompiler::MxFForDialect(&MxMappingDialect::new())?;
//! let ruleset = compiler.MxFCompile(r#"
//!     prefix CL: <http://purl.obolibrary.org/obo/CL_>
//!     subject_id==CL:* -> include();
//! "#)?;
//!
//! let mapping = MxMapping::new()
//!     .with("subject_id", "http://purl.obolibrary.org/obo/CL_0000001")?
//!     .with("predicate_id", "http://www.w3.org/2004/02/skos/core#exactMatch")?
//!     .with("object_id", "http://purl.obolibrary.org/obo/UBERON_0000001")?;
//!
//! let mut processor = MxProcessor::new(ruleset);
//! let included = processor.process(vec![mapping])?;
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, MxError>`. Ruleset problems are reported
//! at compile time as syntax or semantic errors carrying a line and column;
//! failures while processing are runtime errors naming the function.

#![allow(non_snake_case)]

pub mod errors;
pub mod schema;
pub mod prefix;
pub mod mapping;
pub mod dsl;
pub mod filter;
pub mod context;
pub mod formatter;
pub mod registry;
pub mod functions;
pub mod config;
pub mod processor;
pub mod dialects;

pub use errors::{MxError, MxLocation, Result};
pub use schema::{MxSchema, MxSlot, MxSlotKind, MxVersion};
pub use prefix::MxPrefixMap;
pub use mapping::{MxCommonPredicates, MxFieldAccess, MxMapping, MxPredicateTable};
pub use dsl::{MxCDSLCompiler, MxCDSLParser, MxCDSLParserConfig, MxCParseResult, MxCDSLProgram};
pub use filter::{MxFieldTest, MxFilter, MxFilterFn};
pub use context::MxRuleContext;
pub use formatter::{MxFormatter, MxModifierFn, MxSubstitution, MxTemplate};
pub use registry::{
    MxBindEnv, MxCall, MxCallbackFn, MxDialect, MxDirective, MxFunctionKind, MxGeneratorFn, MxPreprocessorFn,
    MxRegistry, MxSetupFn, MxSignature,
};
pub use config::MxCompilerConfig;
pub use processor::{MxCompiledRule, MxProcessStats, MxProcessor, MxProcessorListener, MxRuleset};

#[cfg(feature = "mapping-dialect")]
pub use dialects::{MxEntityChecker, MxMappingDialect};
#[cfg(feature = "text-dialect")]
pub use dialects::MxTextDialect;
