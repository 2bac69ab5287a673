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

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::MxCompilerConfig;
use crate::dsl::ir::{MxArgumentList, MxCompareOp, MxFilterExpr, MxLiteral, MxLiteralKind, MxCDSLProgram, MxRuleSource, MxStatement};
use crate::dsl::parser::{MxCDSLParser, MxCDSLParserConfig};
use crate::errors::{MxError, MxLocation, Result};
use crate::filter::{MxFieldTest, MxFilter};
use crate::formatter::{MxFormatter, MxSubstitution};
use crate::mapping::{MxCommonPredicates, MxPredicateTable};
use crate::prefix::MxPrefixMap;
use crate::processor::{MxCompiledRule, MxRuleset, MxSetup};
use crate::registry::{MxBindEnv, MxCall, MxDialect, MxDirective, MxFunctionKind, MxRegistry, MxSignature};
use crate::schema::{MxSlot, MxSlotKind};

/// Compiles ruleset text into an [`MxRuleset`] for the product type `T`.
pub struct MxCDSLCompiler<T> {
    registry: MxRegistry<T>,
    config: MxCompilerConfig,
    predicates: Arc<dyn MxPredicateTable>,
    substitutions: BTreeMap<String, MxSubstitution>,
}

impl<T: 'static> MxCDSLCompiler<T> {
    #[allow(non_snake_case)]
    pub fn MxFNew(registry: MxRegistry<T>) -> Self {
        Self {
            registry,
            config: MxCompilerConfig::default(),
            predicates: Arc::new(MxCommonPredicates::default()),
            substitutions: BTreeMap::new(),
        }
    }

    /// Compiler over the base language plus the functions of `dialect`.
    #[allow(non_snake_case)]
    pub fn MxFForDialect<D: MxDialect<Product = T>>(dialect: &D) -> Result<Self> {
        Ok(Self::MxFNew(MxRegistry::for_dialect(dialect)?))
    }

    #[allow(non_snake_case)]
    pub fn MxFWithConfig(mut self, config: MxCompilerConfig) -> Self {
        self.config = config;
        self
    }

    #[allow(non_snake_case)]
    pub fn MxFWithPredicates(mut self, predicates: Arc<dyn MxPredicateTable>) -> Self {
        self.predicates = predicates;
        self
    }

    /// Overrides the value source of a placeholder, e.g. to fall back on
    /// another field when one is missing.
    #[allow(non_snake_case)]
    pub fn MxFSetSubstitution(mut self, name: &str, substitution: MxSubstitution) -> Self {
        self.substitutions.insert(name.to_string(), substitution);
        self
    }

    #[allow(non_snake_case)]
    pub fn MxFRegistry(&self) -> &MxRegistry<T> {
        &self.registry
    }

    #[allow(non_snake_case)]
    pub fn MxFCompile(&self, source: &str) -> Result<MxRuleset<T>> {
        let parsed = self.parser().MxFParse(source)?;
        let mut ruleset = self.MxFCompileProgram(&parsed.program)?;
        ruleset.warnings.extend(parsed.warnings);
        Ok(ruleset)
    }

    #[allow(non_snake_case)]
    pub fn MxFCompileFile(&self, path: &Path) -> Result<MxRuleset<T>> {
        let content = std::fs::read_to_string(path)?;
        self.MxFCompile(&content)
    }

    #[allow(non_snake_case)]
    pub fn MxFCompileProgram(&self, program: &MxCDSLProgram) -> Result<MxRuleset<T>> {
        let mut env = self.bind_env();
        let mut ruleset = MxRuleset::default();

        for statement in &program.statements {
            match statement {
                MxStatement::Prefix { name, iri, .. } => env.prefixes.add(name, iri),
                MxStatement::Rule(rule) => self.compile_rule(rule, &mut env, &mut ruleset)?,
            }
        }

        ruleset.prefixes = env.prefixes;
        log::info!(
            "mapx.compiler.done: ruleset compiled - rules={}, setups={}, prefixes={}",
            ruleset.rules.len(),
            ruleset.setups.len(),
            ruleset.prefixes.len()
        );
        Ok(ruleset)
    }

    fn parser(&self) -> MxCDSLParser {
        MxCDSLParser::MxFNew().MxFWithConfig(MxCDSLParserConfig {
            strict: self.config.strict,
            allow_headers: self.config.allow_headers,
        })
    }

    fn bind_env(&self) -> MxBindEnv {
        let mut formatter = MxFormatter::new(self.config.version);
        for entry in self.registry.modifiers() {
            formatter.add_modifier(entry.clone());
        }
        for (name, substitution) in &self.substitutions {
            formatter.set_substitution(name, substitution.clone());
        }
        MxBindEnv {
            prefixes: self.config.initial_prefixes(),
            formatter,
            predicates: self.predicates.clone(),
            version: self.config.version,
        }
    }

    fn compile_rule(&self, rule: &MxRuleSource, env: &mut MxBindEnv, ruleset: &mut MxRuleset<T>) -> Result<()> {
        let filter = match &rule.filter {
            Some(expr) => Some(Arc::new(self.compile_filter(expr, env)?)),
            None => None,
        };
        let action = &rule.action;
        let call = build_call(&action.name, &action.arguments, action.location, filter.clone(), &env.prefixes)?;
        let kind = self.registry.resolve_action(&action.name).ok_or_else(|| {
            MxError::syntax_at(action.location, format!("unknown function '{}'", action.name))
        })?;

        let mut compiled = MxCompiledRule {
            filter,
            preprocessor: None,
            generator: None,
            callback: None,
            tags: rule.tags.clone(),
            text: rule.to_string(),
        };

        match kind {
            MxFunctionKind::Generator => {
                let function = self.registry.generator(&action.name).ok_or_else(|| missing(&action.name))?;
                check_signature(&function.signature, &call)?;
                compiled.generator = Some((function.factory)(&call, env).map_err(|e| e.with_location(call.location))?);
            }
            MxFunctionKind::Preprocessor => {
                let function = self.registry.preprocessor(&action.name).ok_or_else(|| missing(&action.name))?;
                check_signature(&function.signature, &call)?;
                compiled.preprocessor =
                    Some((function.factory)(&call, env).map_err(|e| e.with_location(call.location))?);
            }
            MxFunctionKind::Directive => {
                let function = self.registry.directive(&action.name).ok_or_else(|| missing(&action.name))?;
                check_signature(&function.signature, &call)?;
                match (function.factory)(&call, env).map_err(|e| e.with_location(call.location))? {
                    MxDirective::Setup(action) => {
                        ruleset.setups.push(MxSetup {
                            action,
                            tags: rule.tags.clone(),
                            text: compiled.text,
                        });
                        return Ok(());
                    }
                    MxDirective::Callback(callback) => compiled.callback = Some(callback),
                }
            }
            MxFunctionKind::Filter | MxFunctionKind::Modifier => return Err(missing(&action.name)),
        }

        ruleset.rules.push(compiled);
        Ok(())
    }

    fn compile_filter(&self, expr: &MxFilterExpr, env: &mut MxBindEnv) -> Result<MxFilter> {
        match expr {
            MxFilterExpr::Or(items) => Ok(MxFilter::Or(
                items
                    .iter()
                    .map(|item| self.compile_filter(item, env))
                    .collect::<Result<Vec<_>>>()?,
            )),
            MxFilterExpr::And(items) => Ok(MxFilter::And(
                items
                    .iter()
                    .map(|item| self.compile_filter(item, env))
                    .collect::<Result<Vec<_>>>()?,
            )),
            MxFilterExpr::Not(inner) => Ok(MxFilter::Not(Box::new(self.compile_filter(inner, env)?))),
            MxFilterExpr::Compare { field, op, value, location } => {
                let slot = env.schema().require_filter_field(field).map_err(|e| e.with_location(*location))?;
                let test = if *op == MxCompareOp::Eq {
                    equality_test(slot, value, &env.prefixes).map_err(|e| e.with_location(*location))?
                } else {
                    if slot.kind != MxSlotKind::Double {
                        return Err(MxError::Semantic {
                            location: *location,
                            message: format!("'{}' is not numeric and cannot be compared with '{}'", field, op),
                        });
                    }
                    let number: f64 = value.value.parse().map_err(|_| MxError::Semantic {
                        location: *location,
                        message: format!("'{}' is not a number", value.value),
                    })?;
                    MxFieldTest::Compare(*op, number)
                };
                Ok(MxFilter::Field {
                    field: slot.name.to_string(),
                    test,
                })
            }
            MxFilterExpr::Call { name, arguments, location } => {
                let function = self.registry.filter(name).ok_or_else(|| {
                    MxError::syntax_at(*location, format!("unknown filter function '{}'", name))
                })?;
                let call = build_call(name, arguments, *location, None, &env.prefixes)?;
                check_signature(&function.signature, &call)?;
                let bound = (function.factory)(&call, env).map_err(|e| e.with_location(*location))?;
                Ok(MxFilter::Function {
                    name: name.clone(),
                    text: expr.to_string(),
                    call: bound,
                })
            }
        }
    }
}

fn missing(name: &str) -> MxError {
    MxError::internal(format!("function '{}' vanished from the registry", name))
}

fn check_signature(signature: &MxSignature, call: &MxCall) -> Result<()> {
    signature.check(
        &call.name,
        call.positional.len(),
        call.keyed.keys().map(String::as_str),
        call.location,
    )
}

fn build_call(
    name: &str,
    arguments: &MxArgumentList,
    location: MxLocation,
    filter: Option<Arc<MxFilter>>,
    prefixes: &MxPrefixMap,
) -> Result<MxCall> {
    let mut positional = Vec::with_capacity(arguments.positional.len());
    for literal in &arguments.positional {
        positional.push(expand_literal(literal, prefixes).map_err(|e| e.with_location(location))?);
    }
    let mut keyed = BTreeMap::new();
    for (key, literal) in &arguments.keyed {
        keyed.insert(
            key.clone(),
            expand_literal(literal, prefixes).map_err(|e| e.with_location(location))?,
        );
    }
    Ok(MxCall {
        name: name.to_string(),
        positional,
        keyed,
        location,
        filter,
    })
}

/// Bare short identifiers are expanded; IRIs and quoted strings are kept.
fn expand_literal(literal: &MxLiteral, prefixes: &MxPrefixMap) -> Result<String> {
    match literal.kind {
        MxLiteralKind::Word if is_short_identifier(&literal.value) => prefixes.expand(&literal.value),
        _ => Ok(literal.value.clone()),
    }
}

/// `PREFIX:local`, where the prefix starts with a letter or `_`.
fn is_short_identifier(text: &str) -> bool {
    match text.split_once(':') {
        Some((prefix, _)) => {
            prefix.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        None => false,
    }
}

fn equality_test(slot: &MxSlot, value: &MxLiteral, prefixes: &MxPrefixMap) -> Result<MxFieldTest> {
    match value.kind {
        MxLiteralKind::Iri => return Ok(MxFieldTest::Equals(value.value.clone())),
        // quoted text is never expanded but still globs
        MxLiteralKind::Quoted => {
            return Ok(match value.value.as_str() {
                "" => MxFieldTest::Empty,
                "*" => MxFieldTest::Present,
                text => match text.strip_suffix('*') {
                    Some(stem) => MxFieldTest::StartsWith(stem.to_string()),
                    None => MxFieldTest::Equals(text.to_string()),
                },
            })
        }
        MxLiteralKind::Word => {}
    }
    if slot.name == "mapping_cardinality" {
        return Ok(cardinality_test(&value.value));
    }
    match value.value.as_str() {
        "*" => Ok(MxFieldTest::Present),
        "~" => Ok(MxFieldTest::Empty),
        text => match text.strip_suffix('*') {
            Some(stem) => Ok(MxFieldTest::StartsWith(expand_word(stem, prefixes)?)),
            None => Ok(MxFieldTest::Equals(expand_word(text, prefixes)?)),
        },
    }
}

/// `*:n`, `1:*` and friends stand for the cardinalities they cover.
fn cardinality_test(text: &str) -> MxFieldTest {
    let covered: &[&str] = match text {
        "*" => return MxFieldTest::Present,
        "~" => return MxFieldTest::Empty,
        "*:n" => &["1:n", "n:n"],
        "*:1" => &["1:1", "n:1"],
        "n:*" => &["n:1", "n:n"],
        "1:*" => &["1:1", "1:n"],
        exact => return MxFieldTest::Equals(exact.to_string()),
    };
    MxFieldTest::OneOf(covered.iter().map(|c| c.to_string()).collect())
}

fn expand_word(text: &str, prefixes: &MxPrefixMap) -> Result<String> {
    if is_short_identifier(text) {
        prefixes.expand(text)
    } else {
        Ok(text.to_string())
    }
}
