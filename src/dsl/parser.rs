//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Mapx.
//! The Mapx project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! you may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

use std::collections::{BTreeMap, BTreeSet};

use crate::dsl::ir::{
    MxAction, MxArgumentList, MxCompareOp, MxFilterExpr, MxLiteral, MxCDSLProgram, MxRuleSource,
    MxStatement,
};
use crate::dsl::lexer::{MxLexer, MxToken, MxTokenKind};
use crate::errors::{MxError, MxLocation, Result};

#[derive(Clone, Debug)]
pub struct MxCParseResult {
    pub program: MxCDSLProgram,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct MxCDSLParserConfig {
    /// Reject prefix redeclarations instead of warning about them.
    pub strict: bool,
    /// Accept filter-less `action(...);` statements.
    pub allow_headers: bool,
}

impl Default for MxCDSLParserConfig {
    fn default() -> Self {
        Self {
            strict: false,
            allow_headers: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct MxCDSLParser {
    config: MxCDSLParserConfig,
}

impl MxCDSLParser {
    #[allow(non_snake_case)]
    pub fn MxFNew() -> Self {
        Self {
            config: MxCDSLParserConfig::default(),
        }
    }

    #[allow(non_snake_case)]
    pub fn MxFWithConfig(mut self, config: MxCDSLParserConfig) -> Self {
        self.config = config;
        self
    }

    #[allow(non_snake_case)]
    pub fn MxFStrict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    #[allow(non_snake_case)]
    pub fn MxFParse(&self, source: &str) -> Result<MxCParseResult> {
        let tokens = MxLexer::tokenize(source)?;
        let mut state = ParserState {
            tokens,
            pos: 0,
            config: &self.config,
            declared: BTreeMap::new(),
            warnings: Vec::new(),
        };
        let statements = state.parse_program()?;
        Ok(MxCParseResult {
            program: MxCDSLProgram { statements },
            warnings: state.warnings,
        })
    }

    #[allow(non_snake_case)]
    pub fn MxFParseFile(&self, path: &std::path::Path) -> Result<MxCParseResult> {
        let content = std::fs::read_to_string(path)?;
        self.MxFParse(&content)
    }
}

struct ParserState<'c> {
    tokens: Vec<MxToken>,
    pos: usize,
    config: &'c MxCDSLParserConfig,
    declared: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl<'c> ParserState<'c> {
    fn parse_program(&mut self) -> Result<Vec<MxStatement>> {
        let mut statements = Vec::new();
        while !self.at(&MxTokenKind::Eof) {
            if self.at_prefix_declaration() {
                statements.push(self.parse_prefix()?);
                continue;
            }
            let mut rules = Vec::new();
            self.parse_item(None, &BTreeSet::new(), &mut rules)?;
            statements.extend(rules.into_iter().map(MxStatement::Rule));
        }
        Ok(statements)
    }

    fn at_prefix_declaration(&self) -> bool {
        matches!(&self.peek().kind, MxTokenKind::Word(w) if w == "prefix")
            && matches!(&self.peek_at(1).kind, MxTokenKind::Word(w) if w.ends_with(':'))
    }

    fn parse_prefix(&mut self) -> Result<MxStatement> {
        let location = self.advance().location;
        let name_token = self.advance();
        let name = match name_token.kind {
            MxTokenKind::Word(w) => w.trim_end_matches(':').to_string(),
            other => return Err(self.unexpected(&other, name_token.location, "a prefix name")),
        };
        let iri_token = self.advance();
        let iri = match iri_token.kind {
            MxTokenKind::Iri(iri) => iri,
            other => return Err(self.unexpected(&other, iri_token.location, "an IRI in angle brackets")),
        };
        self.eat(&MxTokenKind::Semicolon);

        if let Some(previous) = self.declared.insert(name.clone(), iri.clone()) {
            if previous != iri {
                let message = format!("prefix '{}' redeclared as <{}>", name, iri);
                if self.config.strict {
                    return Err(MxError::syntax_at(location, message));
                }
                self.warnings.push(format!("{}: {}", location, message));
            }
        }
        Ok(MxStatement::Prefix { name, iri, location })
    }

    /// Parses one rule or block, appending the desugared rules to `out`.
    fn parse_item(
        &mut self,
        parent_filter: Option<&MxFilterExpr>,
        parent_tags: &BTreeSet<String>,
        out: &mut Vec<MxRuleSource>,
    ) -> Result<()> {
        let location = self.peek().location;
        let mut tags = parent_tags.clone();
        if self.eat(&MxTokenKind::LBracket) {
            tags.extend(self.parse_tags()?);
        }

        let expr = self.parse_expr()?;
        if self.eat(&MxTokenKind::Arrow) {
            let filter = match parent_filter {
                Some(parent) => parent.clone().and(expr),
                None => expr,
            };
            if self.eat(&MxTokenKind::LBrace) {
                while !self.at(&MxTokenKind::RBrace) {
                    if self.at(&MxTokenKind::Eof) {
                        return Err(MxError::syntax_at(location, "unbalanced '{': block is never closed"));
                    }
                    self.parse_item(Some(&filter), &tags, out)?;
                }
                self.advance();
                self.eat(&MxTokenKind::Semicolon);
            } else {
                let action = self.parse_action()?;
                self.expect(&MxTokenKind::Semicolon, "';' after action")?;
                out.push(MxRuleSource {
                    filter: Some(filter),
                    action,
                    tags,
                    location,
                });
            }
            return Ok(());
        }

        let action = match expr {
            MxFilterExpr::Call { name, arguments, location } => MxAction { name, arguments, location },
            _ => {
                let token = self.peek().clone();
                return Err(self.unexpected(&token.kind, token.location, "'->'"));
            }
        };
        if parent_filter.is_none() && !self.config.allow_headers {
            return Err(MxError::syntax_at(location, format!("action '{}' has no filter", action.name)));
        }
        self.expect(&MxTokenKind::Semicolon, "';' after action")?;
        out.push(MxRuleSource {
            filter: parent_filter.cloned(),
            action,
            tags,
            location,
        });
        Ok(())
    }

    fn parse_tags(&mut self) -> Result<BTreeSet<String>> {
        let mut tags = BTreeSet::new();
        loop {
            let token = self.advance();
            match token.kind {
                MxTokenKind::Word(tag) => {
                    tags.insert(tag);
                }
                MxTokenKind::RBracket if tags.is_empty() => return Ok(tags),
                other => return Err(self.unexpected(&other, token.location, "a tag")),
            }
            let token = self.advance();
            match token.kind {
                MxTokenKind::Comma => continue,
                MxTokenKind::RBracket => return Ok(tags),
                other => return Err(self.unexpected(&other, token.location, "',' or ']'")),
            }
        }
    }

    fn parse_action(&mut self) -> Result<MxAction> {
        let token = self.advance();
        let name = match token.kind {
            MxTokenKind::Word(name) => name,
            other => return Err(self.unexpected(&other, token.location, "an action name")),
        };
        let arguments = self.parse_arguments()?;
        Ok(MxAction {
            name,
            arguments,
            location: token.location,
        })
    }

    fn parse_expr(&mut self) -> Result<MxFilterExpr> {
        let mut items = vec![self.parse_and()?];
        while self.eat(&MxTokenKind::OrOr) {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { MxFilterExpr::Or(items) })
    }

    fn parse_and(&mut self) -> Result<MxFilterExpr> {
        let mut items = vec![self.parse_unary()?];
        while self.eat(&MxTokenKind::AndAnd) {
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { MxFilterExpr::And(items) })
    }

    fn parse_unary(&mut self) -> Result<MxFilterExpr> {
        if self.eat(&MxTokenKind::Bang) {
            return Ok(MxFilterExpr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<MxFilterExpr> {
        let token = self.advance();
        match token.kind {
            MxTokenKind::LParen => {
                let expr = self.parse_expr()?;
                if !self.eat(&MxTokenKind::RParen) {
                    return Err(MxError::syntax_at(token.location, "unbalanced '(' in filter"));
                }
                Ok(expr)
            }
            MxTokenKind::Word(name) => {
                let next = self.peek().clone();
                let op = match next.kind {
                    MxTokenKind::LParen => {
                        let arguments = self.parse_arguments()?;
                        return Ok(MxFilterExpr::Call {
                            name,
                            arguments,
                            location: token.location,
                        });
                    }
                    MxTokenKind::EqEq => MxCompareOp::Eq,
                    MxTokenKind::Gt => MxCompareOp::Gt,
                    MxTokenKind::Ge => MxCompareOp::Ge,
                    MxTokenKind::Lt => MxCompareOp::Lt,
                    MxTokenKind::Le => MxCompareOp::Le,
                    other => {
                        return Err(self.unexpected(
                            &other,
                            next.location,
                            &format!("a comparison or '(' after '{}'", name),
                        ))
                    }
                };
                self.advance();
                let value_token = self.advance();
                let value = self.literal(value_token)?;
                if op != MxCompareOp::Eq && value.value.parse::<f64>().is_err() {
                    return Err(MxError::syntax_at(
                        token.location,
                        format!("'{}' needs a numeric value, got '{}'", op, value.value),
                    ));
                }
                Ok(MxFilterExpr::Compare {
                    field: name,
                    op,
                    value,
                    location: token.location,
                })
            }
            other => Err(self.unexpected(&other, token.location, "a filter")),
        }
    }

    fn parse_arguments(&mut self) -> Result<MxArgumentList> {
        let open = self.expect(&MxTokenKind::LParen, "'('")?;
        let mut arguments = MxArgumentList::default();
        loop {
            if self.at(&MxTokenKind::Eof) {
                return Err(MxError::syntax_at(open, "unbalanced '(' in argument list"));
            }
            if self.eat(&MxTokenKind::RParen) {
                return Ok(arguments);
            }
            if self.eat(&MxTokenKind::Slash) {
                let token = self.advance();
                let key = match token.kind {
                    MxTokenKind::Word(key) => key,
                    other => return Err(self.unexpected(&other, token.location, "an argument key")),
                };
                self.expect(&MxTokenKind::Equals, "'=' after argument key")?;
                let value_token = self.advance();
                let value = self.literal(value_token)?;
                arguments.keyed.push((key, value));
            } else {
                let token = self.advance();
                arguments.positional.push(self.literal(token)?);
            }

            if !self.eat(&MxTokenKind::Comma)
                && !self.at(&MxTokenKind::RParen)
                && !self.at(&MxTokenKind::Slash)
            {
                let token = self.peek().clone();
                if token.kind == MxTokenKind::Eof {
                    return Err(MxError::syntax_at(open, "unbalanced '(' in argument list"));
                }
                return Err(self.unexpected(&token.kind, token.location, "',' or ')'"));
            }
        }
    }

    fn literal(&self, token: MxToken) -> Result<MxLiteral> {
        match token.kind {
            MxTokenKind::Word(w) => Ok(MxLiteral::word(w)),
            MxTokenKind::Iri(i) => Ok(MxLiteral::iri(i)),
            MxTokenKind::Str(s) => Ok(MxLiteral::quoted(s)),
            other => Err(self.unexpected(&other, token.location, "a value")),
        }
    }

    fn unexpected(&self, found: &MxTokenKind, location: MxLocation, expected: &str) -> MxError {
        MxError::syntax_at(location, format!("expected {}, found '{}'", expected, found))
    }

    fn peek(&self) -> &MxToken {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &MxToken {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn at(&self, kind: &MxTokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> MxToken {
        let token = self.peek().clone();
        if token.kind != MxTokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &MxTokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &MxTokenKind, what: &str) -> Result<MxLocation> {
        let token = self.advance();
        if &token.kind == kind {
            Ok(token.location)
        } else {
            Err(self.unexpected(&token.kind, token.location, what))
        }
    }
}
