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

//! # Base Language
//!
//! Functions every dialect gets.
//!
//! ## Preprocessors
//!
//! - `stop()`: drops the mapping
//! - `invert()`, `invert(predicate)`: swaps subject and object; without an
//!   argument the predicate comes from the predicate table and mappings with
//!   a non-invertible predicate are dropped
//! - `assign(field, value, ...)`: sets fields; values may be templates
//! - `edit("field=value", ...)`: sets fields to literal values
//! - `replace(field, regex, replacement, ...)`: regex replacement in fields
//!
//! ## Directives
//!
//! - `set_var(name, value)`: without a filter, sets the default value of a
//!   variable; after a filter, sets a value for the matching mappings only
//! - `infer_cardinality(scope...)`: fills `mapping_cardinality` of the live
//!   mappings matching the rule filter, counting distinct subjects per
//!   object and objects per subject within the given scope fields
//!
//! ## Filters
//!
//! - `matches(field, regex)`: some value of the field matches the regex
//! - `is_duplicate(key)`: the rendered key was already seen during the
//!   current processing call
//!
//! ## Modifiers
//!
//! `short`, `prefix`, `suffix`, `format(fmt)`, `list_item(n)`,
//! `flatten(sep, start, end)`, `default(value)`, `replace(regex, repl)`,
//! `upper`, `lower`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::context::MxRuleContext;
use crate::errors::{MxError, Result};
use crate::filter::{MxFilter, MxFilterFn};
use crate::formatter::{value_to_text, MxModifierFn, MxTemplate};
use crate::mapping::{MxFieldAccess, MxMapping};
use crate::prefix::MxPrefixMap;
use crate::registry::{MxBindEnv, MxCall, MxDirective, MxPreprocessorFn, MxRegistry};
use crate::schema::{MxSlot, MxSlotKind};

/// Fields a mapping cannot lose.
const REQUIRED_FIELDS: &[&str] = &["subject_id", "predicate_id", "object_id"];

/// Placeholder identifier for a side with no matching term.
pub const NO_TERM_FOUND: &str = "https://w3id.org/sssom/NoTermFound";

/// Distinguishes the seen-sets of separate `is_duplicate` calls.
static DUPLICATE_SCOPES: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn register_base<T: 'static>(registry: &mut MxRegistry<T>) -> Result<()> {
    registry.register_preprocessor("stop", "", &[], stop_factory)?;
    registry.register_preprocessor("invert", "S?", &[], invert_factory)?;
    registry.register_preprocessor("assign", "(SS)+", &[], assign_factory)?;
    registry.register_preprocessor("edit", "S+", &[], edit_factory)?;
    registry.register_preprocessor("replace", "(SSS)+", &[], replace_factory)?;
    registry.register_directive("set_var", "SS", &[], set_var_factory)?;
    registry.register_directive("infer_cardinality", "S*", &[], infer_cardinality_factory)?;
    registry.register_filter("matches", "SS", &[], matches_factory)?;
    registry.register_filter("is_duplicate", "S", &[], is_duplicate_factory)?;

    registry.register_modifier("short", "", short_modifier)?;
    registry.register_modifier("prefix", "", prefix_modifier)?;
    registry.register_modifier("suffix", "", suffix_modifier)?;
    registry.register_modifier("format", "S", format_modifier)?;
    registry.register_modifier("list_item", "S", list_item_modifier)?;
    registry.register_modifier("flatten", "S?S?S?", flatten_modifier)?;
    registry.register_modifier("default", "S", default_modifier)?;
    registry.register_modifier("replace", "SS", replace_modifier)?;
    registry.register_modifier("upper", "", |_: &[String], _: &MxPrefixMap| {
        Ok(map_strings(|s| s.to_uppercase()))
    })?;
    registry.register_modifier("lower", "", |_: &[String], _: &MxPrefixMap| {
        Ok(map_strings(|s| s.to_lowercase()))
    })?;
    Ok(())
}

#[allow(non_snake_case)]
pub fn stop_factory(_call: &MxCall, _env: &mut MxBindEnv) -> Result<MxPreprocessorFn> {
    let f: MxPreprocessorFn =
        Arc::new(|_: MxMapping, _: &MxRuleContext| -> Result<Option<MxMapping>> { Ok(None) });
    Ok(f)
}

#[allow(non_snake_case)]
pub fn invert_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxPreprocessorFn> {
    let f: MxPreprocessorFn = match call.arg(0) {
        Some(predicate) => {
            let template = env.template(predicate).map_err(|e| e.with_location(call.location))?;
            let prefixes = env.prefixes.clone();
            Arc::new(move |m: MxMapping, ctx: &MxRuleContext| -> Result<Option<MxMapping>> {
                let rendered = template.render(&m, ctx)?;
                let predicate = prefixes
                    .expand(&rendered)
                    .map_err(|e| MxError::runtime("invert", e.detail()))?;
                if predicate.is_empty() {
                    return Err(MxError::runtime("invert", "predicate template rendered empty"));
                }
                Ok(Some(m.invert_with(&predicate)))
            })
        }
        None => {
            let table = env.predicates.clone();
            Arc::new(move |m: MxMapping, _: &MxRuleContext| -> Result<Option<MxMapping>> {
                Ok(m.invert(table.as_ref()))
            })
        }
    };
    Ok(f)
}

/// Value written by `assign`.
enum MxAssignValue {
    Fixed(Option<Value>),
    Template(MxTemplate),
}

struct MxAssignment {
    slot: &'static MxSlot,
    value: MxAssignValue,
}

/// Preprocessor setting one or more fields.
pub struct MxAssign {
    function: &'static str,
    assignments: Vec<MxAssignment>,
    prefixes: MxPrefixMap,
}

impl MxAssign {
    fn apply(&self, mut mapping: MxMapping, context: &MxRuleContext) -> Result<Option<MxMapping>> {
        for assignment in &self.assignments {
            let name = assignment.slot.name;
            let value = match &assignment.value {
                MxAssignValue::Fixed(v) => v.clone(),
                MxAssignValue::Template(template) => {
                    let text = template.render(&mapping, context)?;
                    field_value(assignment.slot, &text, &self.prefixes)
                        .map_err(|e| MxError::runtime(self.function, e.detail()))?
                }
            };
            if value.is_none() && REQUIRED_FIELDS.contains(&name) {
                return Err(MxError::runtime(self.function, format!("'{}' cannot be emptied", name)));
            }
            mapping
                .set(name, value)
                .map_err(|e| MxError::runtime(self.function, e.detail()))?;
        }
        Ok(Some(mapping))
    }
}

#[allow(non_snake_case)]
pub fn assign_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxPreprocessorFn> {
    let schema = env.schema();
    let mut assignments = Vec::new();
    for pair in call.positional.chunks(2) {
        let (field, text) = (&pair[0], &pair[1]);
        let slot = schema
            .require(field)
            .map_err(|e| e.with_location(call.location))?;
        let template = env.template(text).map_err(|e| e.with_location(call.location))?;
        let assignment = if template.is_constant() {
            let literal = template.render(&MxMapping::new(), &MxRuleContext::new())?;
            fixed_assignment(call, slot, &literal, &env.prefixes)?
        } else {
            MxAssignment {
                slot,
                value: MxAssignValue::Template(template),
            }
        };
        assignments.push(assignment);
    }

    let assign = MxAssign {
        function: "assign",
        assignments,
        prefixes: env.prefixes.clone(),
    };
    let f: MxPreprocessorFn = Arc::new(move |m: MxMapping, ctx: &MxRuleContext| assign.apply(m, ctx));
    Ok(f)
}

#[allow(non_snake_case)]
pub fn edit_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxPreprocessorFn> {
    let schema = env.schema();
    let mut assignments = Vec::new();
    for argument in &call.positional {
        let Some((field, literal)) = argument.split_once('=') else {
            return Err(call.reject(format!("expected 'field=value', got '{}'", argument)));
        };
        let slot = schema
            .require(field.trim())
            .map_err(|e| e.with_location(call.location))?;
        assignments.push(fixed_assignment(call, slot, literal, &env.prefixes)?);
    }

    let edit = MxAssign {
        function: "edit",
        assignments,
        prefixes: env.prefixes.clone(),
    };
    let f: MxPreprocessorFn = Arc::new(move |m: MxMapping, ctx: &MxRuleContext| edit.apply(m, ctx));
    Ok(f)
}

/// Assignment of a literal, converted and checked once at bind time.
fn fixed_assignment(call: &MxCall, slot: &'static MxSlot, literal: &str, prefixes: &MxPrefixMap) -> Result<MxAssignment> {
    let value = field_value(slot, literal, prefixes).map_err(|e| value_error(call, e))?;
    if value.is_none() && REQUIRED_FIELDS.contains(&slot.name) {
        return Err(call.reject(format!("'{}' cannot be emptied", slot.name)));
    }
    Ok(MxAssignment {
        slot,
        value: MxAssignValue::Fixed(value),
    })
}

/// Undeclared prefixes stay syntax errors; anything else is a bad value.
fn value_error(call: &MxCall, err: MxError) -> MxError {
    if err.is_syntax() {
        err.with_location(call.location)
    } else {
        call.reject(err.detail())
    }
}

/// Converts text into a value for `slot`: lists are split on `|`,
/// identifiers expanded, everything checked against the field kind.
fn field_value(slot: &MxSlot, text: &str, prefixes: &MxPrefixMap) -> Result<Option<Value>> {
    if text.is_empty() {
        return Ok(None);
    }
    let value = match slot.kind {
        MxSlotKind::IdentifierList => {
            let mut items = Vec::new();
            for item in text.split('|').filter(|s| !s.is_empty()) {
                items.push(Value::String(prefixes.expand(item)?));
            }
            Value::Array(items)
        }
        MxSlotKind::TextList => Value::Array(
            text.split('|')
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        MxSlotKind::Identifier => Value::String(prefixes.expand(text)?),
        _ => Value::String(text.to_string()),
    };
    slot.coerce(value).map(Some)
}

#[allow(non_snake_case)]
pub fn replace_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxPreprocessorFn> {
    let schema = env.schema();
    let mut replacements: Vec<(&'static str, Regex, String)> = Vec::new();
    for triple in call.positional.chunks(3) {
        let slot = schema
            .require(&triple[0])
            .map_err(|e| e.with_location(call.location))?;
        if !matches!(
            slot.kind,
            MxSlotKind::Identifier | MxSlotKind::IdentifierList | MxSlotKind::Text | MxSlotKind::TextList
        ) {
            return Err(call.reject(format!("cannot replace in non-text field '{}'", slot.name)));
        }
        let regex = Regex::new(&triple[1]).map_err(|e| call.reject(format!("invalid regex: {}", e)))?;
        replacements.push((slot.name, regex, triple[2].clone()));
    }

    let f: MxPreprocessorFn = Arc::new(move |mut m: MxMapping, _: &MxRuleContext| -> Result<Option<MxMapping>> {
        for (field, regex, replacement) in &replacements {
            let Some(current) = m.get(field).cloned() else {
                continue;
            };
            let updated = match current {
                Value::String(s) => Value::String(regex.replace_all(&s, replacement.as_str()).into_owned()),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .filter_map(|item| item.as_str().map(|s| regex.replace_all(s, replacement.as_str()).into_owned()))
                        .filter(|s| !s.is_empty())
                        .map(Value::String)
                        .collect(),
                ),
                other => other,
            };
            let emptied = matches!(&updated, Value::String(s) if s.is_empty());
            if emptied && REQUIRED_FIELDS.contains(field) {
                return Err(MxError::runtime("replace", format!("'{}' cannot be emptied", field)));
            }
            m.set(field, Some(updated))
                .map_err(|e| MxError::runtime("replace", e.detail()))?;
        }
        Ok(Some(m))
    });
    Ok(f)
}

#[allow(non_snake_case)]
pub fn set_var_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxDirective> {
    let name = call.positional[0].clone();
    let value = call.positional[1].clone();
    let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(call.reject(format!("invalid variable name '{}'", name)));
    }
    if env.schema().slot(&name).is_some() || name == "hash" {
        return Err(call.reject(format!("variable '{}' would shadow a mapping field", name)));
    }
    env.declare_variable(&name);

    if call.filter.is_none() {
        Ok(MxDirective::Setup(Arc::new(move |ctx: &mut MxRuleContext| -> Result<()> {
            ctx.set_default(&name, &value);
            Ok(())
        })))
    } else {
        Ok(MxDirective::Callback(Arc::new(
            move |filter: Option<&Arc<MxFilter>>, _: &mut [MxMapping], ctx: &mut MxRuleContext| -> Result<()> {
                match filter {
                    Some(filter) => ctx.set_conditional(&name, &value, filter.clone()),
                    None => ctx.set_default(&name, &value),
                }
                Ok(())
            },
        )))
    }
}

#[allow(non_snake_case)]
pub fn matches_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxFilterFn> {
    let field = env
        .schema()
        .require(&call.positional[0])
        .map_err(|e| e.with_location(call.location))?
        .name;
    let regex = Regex::new(&call.positional[1]).map_err(|e| call.reject(format!("invalid regex: {}", e)))?;
    let f: MxFilterFn = Arc::new(move |m: &MxMapping, _: &MxRuleContext| -> Result<bool> {
        Ok(match m.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(|s| regex.is_match(s)),
            Some(Value::String(s)) => regex.is_match(s),
            Some(Value::Number(n)) => regex.is_match(&n.to_string()),
            _ => false,
        })
    });
    Ok(f)
}

#[allow(non_snake_case)]
pub fn infer_cardinality_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxDirective> {
    let schema = env.schema();
    let mut scope = Vec::new();
    for name in &call.positional {
        let slot = schema.require(name).map_err(|e| e.with_location(call.location))?;
        scope.push(slot.name);
    }

    Ok(MxDirective::Callback(Arc::new(
        move |filter: Option<&Arc<MxFilter>>, live: &mut [MxMapping], ctx: &mut MxRuleContext| -> Result<()> {
            let mut selected = Vec::new();
            for (index, mapping) in live.iter().enumerate() {
                let matched = match filter {
                    Some(filter) => filter.evaluate(mapping, ctx)?,
                    None => true,
                };
                if matched {
                    selected.push(index);
                }
            }
            fill_cardinality(live, &selected, &scope)
        },
    )))
}

fn is_unmapped(mapping: &MxMapping) -> bool {
    mapping.subject_id() == Some(NO_TERM_FOUND) || mapping.object_id() == Some(NO_TERM_FOUND)
}

/// Key of one side of a mapping: the label for literals, else the
/// identifier, followed by the values of the scope fields.
fn side_key(mapping: &MxMapping, side: &str, scope: &[&'static str]) -> String {
    let (kind, value) = if mapping.text(&format!("{}_type", side)) == Some("rdfs literal") {
        ('L', mapping.text(&format!("{}_label", side)))
    } else {
        ('E', mapping.text(&format!("{}_id", side)))
    };
    let mut key = format!("{}\0{}", kind, value.unwrap_or("(none)"));
    for field in scope {
        key.push('\0');
        match mapping.get(field) {
            Some(value) => key.push_str(&value_to_text(value)),
            None => key.push_str("(null)"),
        }
    }
    key
}

/// Sets `mapping_cardinality` (and `cardinality_scope`) on the mappings at
/// `selected`, counting only those mappings.
fn fill_cardinality(live: &mut [MxMapping], selected: &[usize], scope: &[&'static str]) -> Result<()> {
    let mut subjects: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut objects: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for &index in selected {
        let mapping = &live[index];
        if is_unmapped(mapping) {
            continue;
        }
        let subject = side_key(mapping, "subject", scope);
        let object = side_key(mapping, "object", scope);
        subjects.entry(object.clone()).or_default().insert(subject.clone());
        objects.entry(subject).or_default().insert(object);
    }

    let scope_value = Value::Array(scope.iter().map(|s| Value::String(s.to_string())).collect());
    for &index in selected {
        let mapping = &mut live[index];
        let (cardinality, scoped) = if is_unmapped(mapping) {
            let no_subject = mapping.subject_id() == Some(NO_TERM_FOUND);
            let no_object = mapping.object_id() == Some(NO_TERM_FOUND);
            let cardinality = match (no_subject, no_object) {
                (true, true) => "0:0",
                (true, false) => "0:1",
                _ => "1:0",
            };
            (cardinality, false)
        } else {
            let many_subjects = subjects
                .get(&side_key(mapping, "object", scope))
                .map_or(0, BTreeSet::len)
                > 1;
            let many_objects = objects
                .get(&side_key(mapping, "subject", scope))
                .map_or(0, BTreeSet::len)
                > 1;
            let cardinality = match (many_subjects, many_objects) {
                (false, false) => "1:1",
                (false, true) => "1:n",
                (true, false) => "n:1",
                (true, true) => "n:n",
            };
            (cardinality, !scope.is_empty())
        };
        mapping
            .set("mapping_cardinality", Some(Value::String(cardinality.to_string())))
            .map_err(|e| MxError::runtime("infer_cardinality", e.detail()))?;
        if scoped {
            mapping
                .set("cardinality_scope", Some(scope_value.clone()))
                .map_err(|e| MxError::runtime("infer_cardinality", e.detail()))?;
        } else if mapping.schema().slot("cardinality_scope").is_some() {
            mapping.set("cardinality_scope", None)?;
        }
    }
    log::debug!(
        "mapx.functions.cardinality: cardinality inferred - mappings={}, scope={}",
        selected.len(),
        scope.join(",")
    );
    Ok(())
}

#[allow(non_snake_case)]
pub fn is_duplicate_factory(call: &MxCall, env: &mut MxBindEnv) -> Result<MxFilterFn> {
    let template = env
        .template(&call.positional[0])
        .map_err(|e| e.with_location(call.location))?;
    let scope = format!("is_duplicate#{}", DUPLICATE_SCOPES.fetch_add(1, Ordering::Relaxed));
    let f: MxFilterFn = Arc::new(move |m: &MxMapping, ctx: &MxRuleContext| -> Result<bool> {
        let key = template.render(m, ctx)?;
        Ok(ctx.mark_seen(&scope, key))
    });
    Ok(f)
}

/// Modifier applying `f` to a string or to every string of a list.
fn map_strings<F>(f: F) -> MxModifierFn
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    Arc::new(move |value: Value| -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(f(&s)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Value::String(f(&s)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        })
    })
}

fn short_modifier(_: &[String], prefixes: &MxPrefixMap) -> Result<MxModifierFn> {
    let prefixes = prefixes.clone();
    Ok(map_strings(move |s| prefixes.shorten(s)))
}

fn prefix_modifier(_: &[String], prefixes: &MxPrefixMap) -> Result<MxModifierFn> {
    let prefixes = prefixes.clone();
    Ok(map_strings(move |s| match prefixes.namespace(s) {
        Some(namespace) => namespace.to_string(),
        None => {
            let local = prefixes.local_name(s);
            s[..s.len() - local.len()].to_string()
        }
    }))
}

fn suffix_modifier(_: &[String], prefixes: &MxPrefixMap) -> Result<MxModifierFn> {
    let prefixes = prefixes.clone();
    Ok(map_strings(move |s| prefixes.local_name(s).to_string()))
}

fn format_modifier(args: &[String], _: &MxPrefixMap) -> Result<MxModifierFn> {
    let pattern = args[0].clone();
    if !pattern.contains("%s") {
        return Err(MxError::semantic(format!("format pattern '{}' has no %s", pattern)));
    }
    Ok(map_strings(move |s| pattern.replace("%s", s)))
}

fn list_item_modifier(args: &[String], _: &MxPrefixMap) -> Result<MxModifierFn> {
    let index: usize = args[0]
        .trim()
        .parse()
        .ok()
        .filter(|i| *i >= 1)
        .ok_or_else(|| MxError::semantic(format!("list_item index '{}' is not a positive integer", args[0])))?;
    Ok(Arc::new(move |value: Value| -> Result<Value> {
        Ok(match value {
            Value::Array(items) => items.into_iter().nth(index - 1).unwrap_or(Value::Null),
            Value::Null => Value::Null,
            scalar if index == 1 => scalar,
            _ => Value::Null,
        })
    }))
}

fn flatten_modifier(args: &[String], _: &MxPrefixMap) -> Result<MxModifierFn> {
    let separator = args.first().cloned().unwrap_or_else(|| ", ".to_string());
    let start = args.get(1).cloned().unwrap_or_default();
    let end = args.get(2).cloned().unwrap_or_default();
    Ok(Arc::new(move |value: Value| -> Result<Value> {
        Ok(match value {
            Value::Array(items) => {
                let texts: Vec<String> = items.iter().map(value_to_text).collect();
                Value::String(format!("{}{}{}", start, texts.join(&separator), end))
            }
            other => other,
        })
    }))
}

fn default_modifier(args: &[String], _: &MxPrefixMap) -> Result<MxModifierFn> {
    let fallback = args[0].clone();
    Ok(Arc::new(move |value: Value| -> Result<Value> {
        Ok(match value {
            Value::Null => Value::String(fallback.clone()),
            Value::String(s) if s.is_empty() => Value::String(fallback.clone()),
            Value::Array(items) if items.is_empty() => Value::String(fallback.clone()),
            other => other,
        })
    }))
}

fn replace_modifier(args: &[String], _: &MxPrefixMap) -> Result<MxModifierFn> {
    let regex = Regex::new(&args[0]).map_err(|e| MxError::semantic(format!("invalid regex in replace: {}", e)))?;
    let replacement = args[1].clone();
    Ok(map_strings(move |s| regex.replace_all(s, replacement.as_str()).into_owned()))
}
