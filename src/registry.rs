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

//! # Function Registry Module
//!
//! This module provides the registry that binds names used in a ruleset to
//! executable behavior. Every entry is a factory: given the call as written
//! (already checked against the entry's signature) and the bind environment,
//! it returns a callable or fails.
//!
//! ## Function Kinds
//!
//! - **Directive**: runs once before processing (setup) or once per rule
//!   with the live mapping list (callback)
//! - **Filter**: boolean test usable inside filter expressions
//! - **Preprocessor**: transforms or drops a mapping
//! - **Generator**: derives a product from a mapping
//! - **Modifier**: transforms a placeholder value inside a template
//!
//! ## Action Resolution
//!
//! The action on the right of `->` is looked up as a generator first, then
//! as a preprocessor, then as a directive.
//!
//! ## Signatures
//!
//! A signature is a regular expression over one `S` per positional
//! argument: `""` takes none, `"S?"` one optional, `"(SS)+"` pairs. Keyed
//! arguments (`/key=value`) must be declared by name.
//!
//! ## Dialects
//!
//! A dialect picks a product type and adds its own functions on top of the
//! base language returned by [`MxRegistry::base`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::context::MxRuleContext;
use crate::errors::{MxError, MxLocation, Result};
use crate::filter::{MxFilter, MxFilterFn};
use crate::formatter::{MxFormatter, MxModifierEntry, MxModifierFn, MxTemplate};
use crate::mapping::{MxMapping, MxPredicateTable};
use crate::prefix::MxPrefixMap;
use crate::schema::{MxSchema, MxVersion};

/// Bound preprocessor; `None` drops the mapping.
pub type MxPreprocessorFn =
    Arc<dyn Fn(MxMapping, &MxRuleContext) -> Result<Option<MxMapping>> + Send + Sync>;

/// Bound generator; `None` produces nothing for this mapping.
pub type MxGeneratorFn<T> = Arc<dyn Fn(&MxMapping, &MxRuleContext) -> Result<Option<T>> + Send + Sync>;

/// Directive run once before any mapping is processed.
pub type MxSetupFn = Arc<dyn Fn(&mut MxRuleContext) -> Result<()> + Send + Sync>;

/// Directive run once per rule with the rule's filter and the live
/// mappings, which it may edit in place.
pub type MxCallbackFn =
    Arc<dyn Fn(Option<&Arc<MxFilter>>, &mut [MxMapping], &mut MxRuleContext) -> Result<()> + Send + Sync>;

/// What a directive factory binds to.
#[derive(Clone)]
pub enum MxDirective {
    Setup(MxSetupFn),
    Callback(MxCallbackFn),
}

/// Factory turning a call into a bound callable.
pub type MxFactory<F> = Arc<dyn Fn(&MxCall, &mut MxBindEnv) -> Result<F> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MxFunctionKind {
    Directive,
    Filter,
    Preprocessor,
    Generator,
    Modifier,
}

impl fmt::Display for MxFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MxFunctionKind::Directive => "directive",
            MxFunctionKind::Filter => "filter",
            MxFunctionKind::Preprocessor => "preprocessor",
            MxFunctionKind::Generator => "generator",
            MxFunctionKind::Modifier => "modifier",
        };
        f.write_str(text)
    }
}

/// Accepted shape of a call.
#[derive(Clone, Debug)]
pub struct MxSignature {
    pattern: String,
    matcher: Regex,
    keys: BTreeSet<String>,
}

impl MxSignature {
    pub fn new(pattern: &str, keys: &[&str]) -> Result<Self> {
        let matcher = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| MxError::internal(format!("invalid signature '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        self.matcher.is_match(&"S".repeat(count))
    }

    pub fn accepts_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Checks arity and keyed arguments of a call to `name`.
    pub fn check<'k>(
        &self,
        name: &str,
        count: usize,
        mut keys: impl Iterator<Item = &'k str>,
        location: MxLocation,
    ) -> Result<()> {
        if !self.accepts_count(count) {
            return Err(MxError::syntax_at(
                location,
                format!(
                    "wrong number of arguments for '{}': got {}, signature is '{}'",
                    name, count, self.pattern
                ),
            ));
        }
        if let Some(key) = keys.find(|k| !self.accepts_key(k)) {
            return Err(MxError::syntax_at(
                location,
                format!("unknown argument '/{}' for '{}'", key, name),
            ));
        }
        Ok(())
    }
}

/// A call as written in the ruleset, after identifier expansion.
#[derive(Clone, Debug)]
pub struct MxCall {
    pub name: String,
    pub positional: Vec<String>,
    pub keyed: BTreeMap<String, String>,
    pub location: MxLocation,
    /// Filter of the enclosing rule, when the call is a rule action.
    pub filter: Option<Arc<MxFilter>>,
}

impl MxCall {
    pub fn new(name: &str, positional: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            positional,
            keyed: BTreeMap::new(),
            location: MxLocation::default(),
            filter: None,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn key(&self, key: &str) -> Option<&str> {
        self.keyed.get(key).map(String::as_str)
    }

    /// Semantic error located at this call.
    pub fn reject(&self, message: impl Into<String>) -> MxError {
        MxError::Semantic {
            location: self.location,
            message: format!("{}: {}", self.name, message.into()),
        }
    }
}

/// Compile-time environment handed to factories.
pub struct MxBindEnv {
    pub prefixes: MxPrefixMap,
    pub formatter: MxFormatter,
    pub predicates: Arc<dyn MxPredicateTable>,
    pub version: MxVersion,
}

impl MxBindEnv {
    pub fn schema(&self) -> MxSchema {
        MxSchema::for_version(self.version)
    }

    /// Compiles a template against the prefixes declared so far.
    pub fn template(&self, text: &str) -> Result<MxTemplate> {
        self.formatter.compile(text, &self.prefixes)
    }

    pub fn declare_variable(&mut self, name: &str) {
        self.formatter.declare_variable(name);
    }
}

pub struct MxFunction<F> {
    pub name: String,
    pub kind: MxFunctionKind,
    pub signature: MxSignature,
    pub factory: MxFactory<F>,
}

impl<F> Clone for MxFunction<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            signature: self.signature.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<F> fmt::Debug for MxFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.kind, self.name, self.signature.pattern())
    }
}

/// Name-to-factory tables for each function kind; `T` is the product type
/// generators produce.
pub struct MxRegistry<T> {
    directives: BTreeMap<String, MxFunction<MxDirective>>,
    filters: BTreeMap<String, MxFunction<MxFilterFn>>,
    preprocessors: BTreeMap<String, MxFunction<MxPreprocessorFn>>,
    generators: BTreeMap<String, MxFunction<MxGeneratorFn<T>>>,
    modifiers: BTreeMap<String, MxModifierEntry>,
}

impl<T> Default for MxRegistry<T> {
    fn default() -> Self {
        Self {
            directives: BTreeMap::new(),
            filters: BTreeMap::new(),
            preprocessors: BTreeMap::new(),
            generators: BTreeMap::new(),
            modifiers: BTreeMap::new(),
        }
    }
}

impl<T> Clone for MxRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            directives: self.directives.clone(),
            filters: self.filters.clone(),
            preprocessors: self.preprocessors.clone(),
            generators: self.generators.clone(),
            modifiers: self.modifiers.clone(),
        }
    }
}

impl<T: 'static> MxRegistry<T> {
    /// Empty registry, without even the base language.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the base language every dialect shares.
    pub fn base() -> Result<Self> {
        let mut registry = Self::new();
        crate::functions::register_base(&mut registry)?;
        Ok(registry)
    }

    /// Base language plus the functions of `dialect`.
    pub fn for_dialect<D: MxDialect<Product = T>>(dialect: &D) -> Result<Self> {
        let mut registry = Self::base()?;
        dialect.register(&mut registry)?;
        log::debug!(
            "mapx.registry.dialect: registry assembled - dialect={}, functions={}",
            dialect.name(),
            registry.len()
        );
        Ok(registry)
    }

    pub fn register_directive<F>(&mut self, name: &str, signature: &str, keys: &[&str], factory: F) -> Result<()>
    where
        F: Fn(&MxCall, &mut MxBindEnv) -> Result<MxDirective> + Send + Sync + 'static,
    {
        self.warn_on_collision(name, MxFunctionKind::Directive);
        let factory: MxFactory<MxDirective> = Arc::new(factory);
        let function = Self::function(name, MxFunctionKind::Directive, signature, keys, factory)?;
        self.directives.insert(name.to_string(), function);
        Ok(())
    }

    pub fn register_filter<F>(&mut self, name: &str, signature: &str, keys: &[&str], factory: F) -> Result<()>
    where
        F: Fn(&MxCall, &mut MxBindEnv) -> Result<MxFilterFn> + Send + Sync + 'static,
    {
        let factory: MxFactory<MxFilterFn> = Arc::new(factory);
        let function = Self::function(name, MxFunctionKind::Filter, signature, keys, factory)?;
        self.filters.insert(name.to_string(), function);
        Ok(())
    }

    pub fn register_preprocessor<F>(&mut self, name: &str, signature: &str, keys: &[&str], factory: F) -> Result<()>
    where
        F: Fn(&MxCall, &mut MxBindEnv) -> Result<MxPreprocessorFn> + Send + Sync + 'static,
    {
        self.warn_on_collision(name, MxFunctionKind::Preprocessor);
        let factory: MxFactory<MxPreprocessorFn> = Arc::new(factory);
        let function = Self::function(name, MxFunctionKind::Preprocessor, signature, keys, factory)?;
        self.preprocessors.insert(name.to_string(), function);
        Ok(())
    }

    pub fn register_generator<F>(&mut self, name: &str, signature: &str, keys: &[&str], factory: F) -> Result<()>
    where
        F: Fn(&MxCall, &mut MxBindEnv) -> Result<MxGeneratorFn<T>> + Send + Sync + 'static,
    {
        self.warn_on_collision(name, MxFunctionKind::Generator);
        let factory: MxFactory<MxGeneratorFn<T>> = Arc::new(factory);
        let function = Self::function(name, MxFunctionKind::Generator, signature, keys, factory)?;
        self.generators.insert(name.to_string(), function);
        Ok(())
    }

    pub fn register_modifier<F>(&mut self, name: &str, signature: &str, factory: F) -> Result<()>
    where
        F: Fn(&[String], &MxPrefixMap) -> Result<MxModifierFn> + Send + Sync + 'static,
    {
        let entry = MxModifierEntry {
            name: name.to_string(),
            signature: MxSignature::new(signature, &[])?,
            factory: Arc::new(factory),
        };
        self.modifiers.insert(name.to_string(), entry);
        Ok(())
    }

    /// Adds every entry of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: MxRegistry<T>) {
        for (name, f) in other.directives {
            self.warn_on_collision(&name, MxFunctionKind::Directive);
            self.directives.insert(name, f);
        }
        for (name, f) in other.preprocessors {
            self.warn_on_collision(&name, MxFunctionKind::Preprocessor);
            self.preprocessors.insert(name, f);
        }
        for (name, f) in other.generators {
            self.warn_on_collision(&name, MxFunctionKind::Generator);
            self.generators.insert(name, f);
        }
        self.filters.extend(other.filters);
        self.modifiers.extend(other.modifiers);
    }

    /// Kind an action name resolves to: generator, then preprocessor, then
    /// directive.
    pub fn resolve_action(&self, name: &str) -> Option<MxFunctionKind> {
        if self.generators.contains_key(name) {
            Some(MxFunctionKind::Generator)
        } else if self.preprocessors.contains_key(name) {
            Some(MxFunctionKind::Preprocessor)
        } else if self.directives.contains_key(name) {
            Some(MxFunctionKind::Directive)
        } else {
            None
        }
    }

    pub fn contains(&self, kind: MxFunctionKind, name: &str) -> bool {
        match kind {
            MxFunctionKind::Directive => self.directives.contains_key(name),
            MxFunctionKind::Filter => self.filters.contains_key(name),
            MxFunctionKind::Preprocessor => self.preprocessors.contains_key(name),
            MxFunctionKind::Generator => self.generators.contains_key(name),
            MxFunctionKind::Modifier => self.modifiers.contains_key(name),
        }
    }

    pub fn names(&self, kind: MxFunctionKind) -> Vec<&str> {
        let keys: Vec<&String> = match kind {
            MxFunctionKind::Directive => self.directives.keys().collect(),
            MxFunctionKind::Filter => self.filters.keys().collect(),
            MxFunctionKind::Preprocessor => self.preprocessors.keys().collect(),
            MxFunctionKind::Generator => self.generators.keys().collect(),
            MxFunctionKind::Modifier => self.modifiers.keys().collect(),
        };
        keys.into_iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
            + self.filters.len()
            + self.preprocessors.len()
            + self.generators.len()
            + self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn directive(&self, name: &str) -> Option<&MxFunction<MxDirective>> {
        self.directives.get(name)
    }

    pub fn filter(&self, name: &str) -> Option<&MxFunction<MxFilterFn>> {
        self.filters.get(name)
    }

    pub fn preprocessor(&self, name: &str) -> Option<&MxFunction<MxPreprocessorFn>> {
        self.preprocessors.get(name)
    }

    pub fn generator(&self, name: &str) -> Option<&MxFunction<MxGeneratorFn<T>>> {
        self.generators.get(name)
    }

    pub fn modifiers(&self) -> impl Iterator<Item = &MxModifierEntry> {
        self.modifiers.values()
    }

    fn function<F>(
        name: &str,
        kind: MxFunctionKind,
        signature: &str,
        keys: &[&str],
        factory: MxFactory<F>,
    ) -> Result<MxFunction<F>> {
        Ok(MxFunction {
            name: name.to_string(),
            kind,
            signature: MxSignature::new(signature, keys)?,
            factory,
        })
    }

    fn warn_on_collision(&self, name: &str, kind: MxFunctionKind) {
        let others = [
            MxFunctionKind::Generator,
            MxFunctionKind::Preprocessor,
            MxFunctionKind::Directive,
        ];
        for other in others.into_iter().filter(|k| *k != kind) {
            if self.contains(other, name) {
                log::warn!(
                    "mapx.registry.collision: name registered under several action kinds; generator wins over preprocessor, preprocessor over directive - name={}, existing={}, new={}",
                    name,
                    other,
                    kind
                );
            }
        }
    }
}

/// A product type plus the functions that produce it.
pub trait MxDialect {
    type Product;

    fn name(&self) -> &str;

    /// Adds the dialect's functions to a registry that already holds the
    /// base language.
    fn register(&self, registry: &mut MxRegistry<Self::Product>) -> Result<()>;
}
