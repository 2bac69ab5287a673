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

//! # DSL (Domain Specific Language) Module
//!
//! This module provides the rule language used to transform mapping sets.
//! A ruleset is plain text made of prefix declarations and rules; each rule
//! pairs an optional filter with an action.
//!
//! ## Architecture
//!
//! - **Lexer** ([lexer.rs](lexer/index.html)): splits source text into
//!   located tokens
//! - **Parser** ([parser.rs](parser/index.html)): builds the IR by recursive
//!   descent, flattening nested rule blocks
//! - **IR** ([ir.rs](ir/index.html)): prefix declarations and rules as
//!   written, before any name is bound
//! - **Compiler** ([compiler.rs](compiler/index.html)): expands identifiers,
//!   binds every function name through a registry and produces a ruleset
//!
//! ## Syntax
//!
//! ```text
//! # comments run to the end of the line
//! prefix CL: <http://purl.obolibrary.org/obo/CL_>
//!
//! set_var("ORGANISM", "NCBITaxon:9606");
//!
//! subject_id==CL:* -> {
//!     predicate_id==skos:exactMatch -> include();
//!     [extra] !mapping_justification==semapv:ManualMappingCuration -> stop();
//! }
//!
//! confidence<0.7 || object_id==~ -> stop();
//! ```
//!
//! - `F==V` tests a field; `V` may end with `*` (prefix match), or be `*`
//!   (field present) or `~` (field absent)
//! - `F>N`, `F>=N`, `F<N`, `F<=N` compare a numeric field
//! - `!`, `&&` and `||` combine tests, `!` binding tightest
//! - `name(args)` inside a filter calls a filter function
//! - `[tag, ...]` before a rule marks it for tag selection

pub mod lexer;
pub mod parser;
pub mod ir;
pub mod compiler;

pub use lexer::{MxLexer, MxToken, MxTokenKind};
pub use parser::{MxCDSLParser, MxCDSLParserConfig, MxCParseResult};
pub use ir::{MxAction, MxArgumentList, MxCompareOp, MxFilterExpr, MxLiteral, MxLiteralKind, MxCDSLProgram, MxRuleSource, MxStatement};
pub use compiler::MxCDSLCompiler;
