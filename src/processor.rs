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

//! # Mapping Processor Module
//!
//! Executes a compiled ruleset over a list of mappings.
//!
//! ## Execution Order
//!
//! Rules run one after the other over the whole live list (rule-major):
//!
//! 1. Setup directives of the active rules run once, in order.
//! 2. For each rule, its callback (if any) sees the rule filter and the live
//!    mappings, and may edit them in place.
//! 3. Each live mapping that passes the rule filter goes through the rule's
//!    preprocessor, which may replace it or drop it for good, then through
//!    the rule's generator, whose products are appended to the output.
//!
//! Products therefore come out grouped by rule, and within a rule in the
//! order of the input mappings.
//!
//! ## Tag Selection
//!
//! [`MxProcessor::include_rules`] and [`MxProcessor::exclude_rules`] restrict
//! the next [`MxProcessor::process`] call to rules carrying (or not carrying)
//! one of the given tags. The selection is consumed by that call.
//!
//! ## Failure
//!
//! Any error raised by a bound function aborts the call; no product is
//! returned.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::context::MxRuleContext;
use crate::errors::Result;
use crate::filter::MxFilter;
use crate::mapping::MxMapping;
use crate::prefix::MxPrefixMap;
use crate::registry::{MxCallbackFn, MxGeneratorFn, MxPreprocessorFn, MxSetupFn};

/// Rule ready to run.
pub struct MxCompiledRule<T> {
    pub filter: Option<Arc<MxFilter>>,
    pub preprocessor: Option<MxPreprocessorFn>,
    pub generator: Option<MxGeneratorFn<T>>,
    pub callback: Option<MxCallbackFn>,
    pub tags: BTreeSet<String>,
    /// Rule as written, for diagnostics.
    pub text: String,
}

impl<T> Clone for MxCompiledRule<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            preprocessor: self.preprocessor.clone(),
            generator: self.generator.clone(),
            callback: self.callback.clone(),
            tags: self.tags.clone(),
            text: self.text.clone(),
        }
    }
}

impl<T> fmt::Debug for MxCompiledRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MxCompiledRule({})", self.text)
    }
}

impl<T> MxCompiledRule<T> {
    pub fn matches(&self, mapping: &MxMapping, context: &MxRuleContext) -> Result<bool> {
        match &self.filter {
            Some(filter) => filter.evaluate(mapping, context),
            None => Ok(true),
        }
    }

    /// True when the rule neither transforms nor produces anything.
    pub fn is_passive(&self) -> bool {
        self.preprocessor.is_none() && self.generator.is_none()
    }
}

/// Directive run before any rule.
#[derive(Clone)]
pub struct MxSetup {
    pub action: MxSetupFn,
    pub tags: BTreeSet<String>,
    pub text: String,
}

impl fmt::Debug for MxSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MxSetup({})", self.text)
    }
}

/// Immutable output of the compiler.
pub struct MxRuleset<T> {
    pub rules: Vec<MxCompiledRule<T>>,
    pub setups: Vec<MxSetup>,
    /// Prefixes in effect at the end of the ruleset.
    pub prefixes: MxPrefixMap,
    pub warnings: Vec<String>,
}

impl<T> Clone for MxRuleset<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            setups: self.setups.clone(),
            prefixes: self.prefixes.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

impl<T> fmt::Debug for MxRuleset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MxRuleset")
            .field("rules", &self.rules)
            .field("setups", &self.setups)
            .finish()
    }
}

impl<T> Default for MxRuleset<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            setups: Vec::new(),
            prefixes: MxPrefixMap::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> MxRuleset<T> {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.setups.is_empty()
    }
}

/// Notified of every product a generator emits.
pub trait MxProcessorListener<T> {
    fn on_generated(&mut self, rule: &MxCompiledRule<T>, mapping: &MxMapping, product: &T);
}

impl<T, F> MxProcessorListener<T> for F
where
    F: FnMut(&MxCompiledRule<T>, &MxMapping, &T),
{
    fn on_generated(&mut self, rule: &MxCompiledRule<T>, mapping: &MxMapping, product: &T) {
        self(rule, mapping, product)
    }
}

/// Tag-based rule selection for one processing call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct MxSelection {
    include: Option<BTreeSet<String>>,
    exclude: Option<BTreeSet<String>>,
}

impl MxSelection {
    fn admits(&self, tags: &BTreeSet<String>) -> bool {
        if let Some(include) = &self.include {
            if include.is_disjoint(tags) {
                return false;
            }
        }
        match &self.exclude {
            Some(exclude) => exclude.is_disjoint(tags),
            None => true,
        }
    }
}

/// Per-call counters, logged at the end of a call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MxProcessStats {
    pub rules_run: usize,
    pub rules_skipped: usize,
    pub mappings_in: usize,
    pub mappings_dropped: usize,
    pub products: usize,
}

pub struct MxProcessor<T> {
    ruleset: Arc<MxRuleset<T>>,
    listeners: Vec<Box<dyn MxProcessorListener<T>>>,
    selection: MxSelection,
    last_stats: MxProcessStats,
}

impl<T: 'static> MxProcessor<T> {
    pub fn new(ruleset: MxRuleset<T>) -> Self {
        Self::shared(Arc::new(ruleset))
    }

    /// Processor over a ruleset shared with other processors.
    pub fn shared(ruleset: Arc<MxRuleset<T>>) -> Self {
        Self {
            ruleset,
            listeners: Vec::new(),
            selection: MxSelection::default(),
            last_stats: MxProcessStats::default(),
        }
    }

    pub fn ruleset(&self) -> &MxRuleset<T> {
        &self.ruleset
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: MxProcessorListener<T> + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Runs only rules with at least one of `tags` during the next call.
    pub fn include_rules<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.include = Some(tags.into_iter().map(Into::into).collect());
    }

    /// Skips rules with at least one of `tags` during the next call.
    pub fn exclude_rules<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.exclude = Some(tags.into_iter().map(Into::into).collect());
    }

    /// Counters of the last completed call.
    pub fn last_stats(&self) -> MxProcessStats {
        self.last_stats
    }

    /// Applies the ruleset to `mappings` and returns the products, grouped
    /// by rule in ruleset order.
    pub fn process(&mut self, mappings: Vec<MxMapping>) -> Result<Vec<T>> {
        let selection = std::mem::take(&mut self.selection);
        let ruleset = Arc::clone(&self.ruleset);
        let mut context = MxRuleContext::new();
        let mut stats = MxProcessStats {
            mappings_in: mappings.len(),
            ..MxProcessStats::default()
        };

        for setup in ruleset.setups.iter().filter(|s| selection.admits(&s.tags)) {
            (setup.action)(&mut context)?;
        }

        let mut live = mappings;
        let mut products = Vec::new();
        for (index, rule) in ruleset.rules.iter().enumerate() {
            if !selection.admits(&rule.tags) {
                stats.rules_skipped += 1;
                continue;
            }
            stats.rules_run += 1;

            if let Some(callback) = &rule.callback {
                callback(rule.filter.as_ref(), live.as_mut_slice(), &mut context)?;
            }
            if rule.is_passive() {
                continue;
            }

            let before = live.len();
            let produced_before = products.len();
            let mut next = Vec::with_capacity(live.len());
            for mapping in live {
                if !rule.matches(&mapping, &context)? {
                    next.push(mapping);
                    continue;
                }
                let mapping = match &rule.preprocessor {
                    Some(preprocess) => match preprocess(mapping, &context)? {
                        Some(m) => m,
                        None => continue,
                    },
                    None => mapping,
                };
                if let Some(generate) = &rule.generator {
                    if let Some(product) = generate(&mapping, &context)? {
                        for listener in self.listeners.iter_mut() {
                            listener.on_generated(rule, &mapping, &product);
                        }
                        products.push(product);
                    }
                }
                next.push(mapping);
            }
            live = next;

            stats.mappings_dropped += before - live.len();
            log::debug!(
                "mapx.processor.rule: rule applied - index={}, rule={}, live_before={}, live_after={}, products={}",
                index,
                rule.text,
                before,
                live.len(),
                products.len() - produced_before
            );
        }

        stats.products = products.len();
        log::info!(
            "mapx.processor.done: processing finished - mappings_in={}, dropped={}, rules_run={}, rules_skipped={}, products={}",
            stats.mappings_in,
            stats.mappings_dropped,
            stats.rules_run,
            stats.rules_skipped,
            stats.products
        );
        self.last_stats = stats;
        Ok(products)
    }
}
