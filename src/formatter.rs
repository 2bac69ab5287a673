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

//! # Placeholder Formatter Module
//!
//! Templates are strings with placeholders that are filled from a mapping:
//!
//! - `%field`: value of a field (letters and `_` only)
//! - `%{field}`: same, bracketed
//! - `%{field|mod1|mod2(arg, 'arg')}`: value passed through modifiers, left
//!   to right
//! - `%%`: a literal `%`
//!
//! A `%` followed by anything else is kept as is. Templates are compiled
//! once, when the ruleset is compiled: unknown fields, unknown modifiers,
//! wrong modifier arities and unterminated placeholders are reported then,
//! never while rendering.
//!
//! ## Rendering
//!
//! Strings render as is, lists are joined with `|`, numbers use their
//! shortest decimal form and absent values render as an empty string.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::MxRuleContext;
use crate::errors::{MxError, MxLocation, Result};
use crate::mapping::{MxFieldAccess, MxMapping};
use crate::prefix::MxPrefixMap;
use crate::registry::MxSignature;
use crate::schema::{MxSchema, MxVersion};

/// Source of a placeholder value.
pub type MxSubstitution = Arc<dyn Fn(&MxMapping, &MxRuleContext) -> Result<Option<Value>> + Send + Sync>;

/// Bound modifier.
pub type MxModifierFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Builds a modifier from its literal arguments.
pub type MxModifierFactory = Arc<dyn Fn(&[String], &MxPrefixMap) -> Result<MxModifierFn> + Send + Sync>;

#[derive(Clone)]
pub struct MxModifierEntry {
    pub name: String,
    pub signature: MxSignature,
    pub factory: MxModifierFactory,
}

impl fmt::Debug for MxModifierEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modifier {}({})", self.name, self.signature.pattern())
    }
}

/// Text form of a placeholder value.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_to_text).collect::<Vec<_>>().join("|"),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct MxFormatter {
    substitutions: BTreeMap<String, MxSubstitution>,
    modifiers: BTreeMap<String, MxModifierEntry>,
}

impl Default for MxFormatter {
    fn default() -> Self {
        Self::new(MxVersion::default())
    }
}

impl MxFormatter {
    /// Formatter with one placeholder per schema field plus `hash`, and no
    /// modifiers.
    pub fn new(version: MxVersion) -> Self {
        let mut substitutions: BTreeMap<String, MxSubstitution> = BTreeMap::new();
        for slot in MxSchema::for_version(version).slots() {
            let name = slot.name;
            substitutions.insert(
                name.to_string(),
                Arc::new(move |m: &MxMapping, _: &MxRuleContext| -> Result<Option<Value>> {
                    Ok(m.get(name).cloned())
                }),
            );
        }
        substitutions.insert(
            "hash".to_string(),
            Arc::new(|m: &MxMapping, _: &MxRuleContext| -> Result<Option<Value>> {
                Ok(Some(Value::String(m.digest())))
            }),
        );
        Self {
            substitutions,
            modifiers: BTreeMap::new(),
        }
    }

    /// Replaces (or adds) the source of a placeholder.
    pub fn set_substitution(&mut self, name: &str, substitution: MxSubstitution) {
        self.substitutions.insert(name.to_string(), substitution);
    }

    pub fn add_modifier(&mut self, entry: MxModifierEntry) {
        self.modifiers.insert(entry.name.clone(), entry);
    }

    /// Makes `%{name}` resolve to the rule-context variable `name`.
    pub fn declare_variable(&mut self, name: &str) {
        let variable = name.to_string();
        self.substitutions.insert(
            name.to_string(),
            Arc::new(move |m: &MxMapping, ctx: &MxRuleContext| -> Result<Option<Value>> {
                Ok(Some(Value::String(ctx.resolve(&variable, m)?)))
            }),
        );
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.substitutions.contains_key(name)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    pub fn compile(&self, text: &str, prefixes: &MxPrefixMap) -> Result<MxTemplate> {
        TemplateParser {
            formatter: self,
            prefixes,
            chars: text.chars().collect(),
            pos: 0,
        }
        .parse(text)
    }
}

impl fmt::Debug for MxFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MxFormatter")
            .field("placeholders", &self.substitutions.keys().collect::<Vec<_>>())
            .field("modifiers", &self.modifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone)]
enum MxTemplatePart {
    Literal(String),
    Placeholder {
        name: String,
        source: MxSubstitution,
        modifiers: Vec<MxModifierFn>,
    },
}

/// Compiled template.
#[derive(Clone)]
pub struct MxTemplate {
    source: String,
    parts: Vec<MxTemplatePart>,
}

impl MxTemplate {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the template holds no placeholder.
    pub fn is_constant(&self) -> bool {
        self.parts
            .iter()
            .all(|p| matches!(p, MxTemplatePart::Literal(_)))
    }

    /// Names of the placeholders used, in order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MxTemplatePart::Placeholder { name, .. } => Some(name.as_str()),
                MxTemplatePart::Literal(_) => None,
            })
            .collect()
    }

    pub fn render(&self, mapping: &MxMapping, context: &MxRuleContext) -> Result<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                MxTemplatePart::Literal(text) => out.push_str(text),
                MxTemplatePart::Placeholder { source, modifiers, .. } => {
                    let mut value = source(mapping, context)?.unwrap_or(Value::Null);
                    for modifier in modifiers {
                        value = modifier(value)?;
                    }
                    out.push_str(&value_to_text(&value));
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for MxTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MxTemplate({:?})", self.source)
    }
}

struct TemplateParser<'a> {
    formatter: &'a MxFormatter,
    prefixes: &'a MxPrefixMap,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> TemplateParser<'a> {
    fn parse(mut self, source: &str) -> Result<MxTemplate> {
        let mut parts = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            if c != '%' {
                literal.push(c);
                self.pos += 1;
                continue;
            }
            match self.peek_at(1) {
                Some('%') => {
                    literal.push('%');
                    self.pos += 2;
                }
                Some('{') => {
                    self.pos += 2;
                    flush(&mut literal, &mut parts);
                    parts.push(self.bracketed(source)?);
                }
                Some(n) if n.is_ascii_alphabetic() || n == '_' => {
                    self.pos += 1;
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
                        self.pos += 1;
                    }
                    let name: String = self.chars[start..self.pos].iter().collect();
                    flush(&mut literal, &mut parts);
                    parts.push(self.placeholder(name, Vec::new())?);
                }
                _ => {
                    literal.push('%');
                    self.pos += 1;
                }
            }
        }
        flush(&mut literal, &mut parts);

        Ok(MxTemplate {
            source: source.to_string(),
            parts,
        })
    }

    fn bracketed(&mut self, source: &str) -> Result<MxTemplatePart> {
        let name = self.read_until(&['|', '}']).trim().to_string();
        let mut modifiers: Vec<(String, Vec<String>)> = Vec::new();
        loop {
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some('|') => {
                    self.pos += 1;
                    let modifier = self.read_until(&['(', '|', '}']).trim().to_string();
                    let args = if self.peek() == Some('(') {
                        self.pos += 1;
                        let args = self.arguments(source)?;
                        self.skip_blanks();
                        if !matches!(self.peek(), Some('|') | Some('}') | None) {
                            return Err(MxError::syntax(format!(
                                "unexpected text after modifier '{}' in \"{}\"",
                                modifier, source
                            )));
                        }
                        args
                    } else {
                        Vec::new()
                    };
                    modifiers.push((modifier, args));
                }
                _ => return Err(unterminated(source)),
            }
        }
        self.placeholder(name, modifiers)
    }

    fn placeholder(&self, name: String, modifiers: Vec<(String, Vec<String>)>) -> Result<MxTemplatePart> {
        let source = self
            .formatter
            .substitutions
            .get(&name)
            .ok_or_else(|| MxError::syntax(format!("unknown placeholder '{}'", name)))?
            .clone();
        let mut bound = Vec::with_capacity(modifiers.len());
        for (modifier, args) in modifiers {
            let entry = self
                .formatter
                .modifiers
                .get(&modifier)
                .ok_or_else(|| MxError::syntax(format!("unknown modifier '{}'", modifier)))?;
            entry
                .signature
                .check(&modifier, args.len(), std::iter::empty(), MxLocation::default())?;
            bound.push((entry.factory)(&args, self.prefixes)?);
        }
        Ok(MxTemplatePart::Placeholder {
            name,
            source,
            modifiers: bound,
        })
    }

    /// Reads modifier arguments up to the closing parenthesis.
    fn arguments(&mut self, source: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        self.skip_blanks();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            self.skip_blanks();
            let arg = match self.peek() {
                Some(q @ ('"' | '\'')) => {
                    self.pos += 1;
                    let mut value = String::new();
                    loop {
                        match self.next() {
                            None => return Err(unterminated(source)),
                            Some('\\') => match self.next() {
                                Some(c) => value.push(c),
                                None => return Err(unterminated(source)),
                            },
                            Some(c) if c == q => break,
                            Some(c) => value.push(c),
                        }
                    }
                    self.skip_blanks();
                    value
                }
                Some(_) => {
                    let value = self.read_until(&[',', ')', '(']).trim().to_string();
                    if self.peek() == Some('(') {
                        return Err(MxError::syntax(format!("unbalanced parentheses in \"{}\"", source)));
                    }
                    value
                }
                None => return Err(unterminated(source)),
            };
            args.push(arg);
            match self.next() {
                Some(',') => continue,
                Some(')') => return Ok(args),
                None => return Err(unterminated(source)),
                Some(c) => {
                    return Err(MxError::syntax(format!(
                        "unexpected '{}' in modifier arguments of \"{}\"",
                        c, source
                    )))
                }
            }
        }
    }

    fn read_until(&mut self, stops: &[char]) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| !stops.contains(&c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_blanks(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }
}

fn flush(literal: &mut String, parts: &mut Vec<MxTemplatePart>) {
    if !literal.is_empty() {
        parts.push(MxTemplatePart::Literal(std::mem::take(literal)));
    }
}

fn unterminated(source: &str) -> MxError {
    MxError::syntax(format!("unterminated placeholder in \"{}\"", source))
}
