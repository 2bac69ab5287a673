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

//! # Mapx DSL Tests - Registry
//!
//! Tests for the function registry: the base language, signatures, keyed
//! arguments, action resolution order and custom dialects.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test registry
//! ```

use std::sync::Arc;

use mapx::{
    MxBindEnv, MxCall, MxCDSLCompiler, MxDialect, MxFunctionKind, MxGeneratorFn, MxLocation, MxMapping,
    MxPreprocessorFn, MxProcessor, MxRegistry, MxRuleContext, MxSignature,
};

/// Dialect counting the fields of each mapping.
struct CountDialect;

impl MxDialect for CountDialect {
    type Product = usize;

    fn name(&self) -> &str {
        "count"
    }

    fn register(&self, registry: &mut MxRegistry<usize>) -> mapx::Result<()> {
        registry.register_generator("count", "", &["plus"], |call: &MxCall, _: &mut MxBindEnv| {
            let plus: usize = match call.key("plus") {
                Some(text) => text.parse().map_err(|_| call.reject(format!("'{}' is not a count", text)))?,
                None => 0,
            };
            let f: MxGeneratorFn<usize> = Arc::new(move |m: &MxMapping, _: &MxRuleContext| -> mapx::Result<Option<usize>> {
                Ok(Some(m.fields().count() + plus))
            });
            Ok(f)
        })
    }
}

fn mapping(subject: &str) -> MxMapping {
    MxMapping::new()
        .with("subject_id", subject)
        .unwrap()
        .with("predicate_id", "http://www.w3.org/2004/02/skos/core#exactMatch")
        .unwrap()
        .with("object_id", "http://example.org/b")
        .unwrap()
}

#[test]
fn test_base_language_contents() {
    let registry = MxRegistry::<String>::base().unwrap();
    assert_eq!(registry.names(MxFunctionKind::Preprocessor), vec!["assign", "edit", "invert", "replace", "stop"]);
    assert_eq!(registry.names(MxFunctionKind::Directive), vec!["infer_cardinality", "set_var"]);
    assert_eq!(registry.names(MxFunctionKind::Filter), vec!["is_duplicate", "matches"]);
    assert!(registry.names(MxFunctionKind::Generator).is_empty());
    for modifier in ["short", "prefix", "suffix", "format", "list_item", "flatten", "default", "replace", "upper", "lower"] {
        assert!(registry.contains(MxFunctionKind::Modifier, modifier), "missing modifier {}", modifier);
    }
    assert!(MxRegistry::<String>::new().is_empty());
}

/// Tests arity patterns of signatures.
#[test]
fn test_signature_arity() {
    let pairs = MxSignature::new("(SS)+", &[]).unwrap();
    assert!(!pairs.accepts_count(0));
    assert!(pairs.accepts_count(2));
    assert!(!pairs.accepts_count(3));
    assert!(pairs.accepts_count(4));

    let optional = MxSignature::new("S?S?", &[]).unwrap();
    assert!(optional.accepts_count(0));
    assert!(optional.accepts_count(2));
    assert!(!optional.accepts_count(3));

    let none = MxSignature::new("", &[]).unwrap();
    assert!(none.accepts_count(0));
    assert!(!none.accepts_count(1));

    assert!(MxSignature::new("(S", &[]).is_err());
}

#[test]
fn test_signature_check_reports_location() {
    let signature = MxSignature::new("S", &["pretty"]).unwrap();
    let at = MxLocation::new(3, 7);
    assert!(signature.check("f", 1, ["pretty"].into_iter(), at).is_ok());

    let err = signature.check("f", 2, std::iter::empty(), at).unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.location(), Some(at));

    let err = signature.check("f", 1, ["ugly"].into_iter(), at).unwrap_err();
    assert!(err.to_string().contains("/ugly"));
}

#[test]
fn test_custom_dialect() {
    let compiler = MxCDSLCompiler::MxFForDialect(&CountDialect).unwrap();
    let ruleset = compiler
        .MxFCompile("subject_id==* -> count();\nsubject_id==* -> count(/plus=10);")
        .unwrap();
    let mut processor = MxProcessor::new(ruleset);
    let counts = processor.process(vec![mapping("http://example.org/a")]).unwrap();
    assert_eq!(counts, vec![3, 13]);
}

/// Tests compile errors raised while binding actions.
#[test]
fn test_binding_errors() {
    let compiler = MxCDSLCompiler::MxFForDialect(&CountDialect).unwrap();

    let err = compiler.MxFCompile("subject_id==* -> nothing();").unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("unknown function 'nothing'"));
    assert_eq!(err.location(), Some(MxLocation::new(1, 18)));

    let err = compiler.MxFCompile("subject_id==* -> count(/minus=1);").unwrap_err();
    assert!(err.is_syntax());

    let err = compiler.MxFCompile("subject_id==* -> count(extra);").unwrap_err();
    assert!(err.to_string().contains("wrong number of arguments"));

    let err = compiler.MxFCompile("\n  subject_id==* -> count(/plus=many);").unwrap_err();
    assert!(err.is_semantic());
    assert_eq!(err.location(), Some(MxLocation::new(2, 20)));
}

/// Tests that an action name is resolved as a generator, then as a
/// preprocessor, then as a directive.
#[test]
fn test_action_resolution_order() {
    let mut registry = MxRegistry::<String>::base().unwrap();
    assert_eq!(registry.resolve_action("stop"), Some(MxFunctionKind::Preprocessor));
    assert_eq!(registry.resolve_action("set_var"), Some(MxFunctionKind::Directive));
    assert_eq!(registry.resolve_action("matches"), None);

    registry
        .register_generator("stop", "", &[], |_: &MxCall, _: &mut MxBindEnv| {
            let f: MxGeneratorFn<String> = Arc::new(|m: &MxMapping, _: &MxRuleContext| -> mapx::Result<Option<String>> {
                Ok(m.subject_id().map(str::to_string))
            });
            Ok(f)
        })
        .unwrap();
    registry
        .register_preprocessor("set_var", "SS", &[], |_: &MxCall, _: &mut MxBindEnv| {
            let f: MxPreprocessorFn = Arc::new(|_: MxMapping, _: &MxRuleContext| -> mapx::Result<Option<MxMapping>> { Ok(None) });
            Ok(f)
        })
        .unwrap();
    assert_eq!(registry.resolve_action("stop"), Some(MxFunctionKind::Generator));
    assert_eq!(registry.resolve_action("set_var"), Some(MxFunctionKind::Preprocessor));

    let ruleset = MxCDSLCompiler::MxFNew(registry)
        .MxFCompile("subject_id==* -> stop();\nsubject_id==* -> stop();")
        .unwrap();
    let mut processor = MxProcessor::new(ruleset);
    let out = processor.process(vec![mapping("http://example.org/a")]).unwrap();
    assert_eq!(out, vec!["http://example.org/a".to_string(), "http://example.org/a".to_string()]);
}

#[test]
fn test_registry_merge() {
    let mut base = MxRegistry::<usize>::base().unwrap();
    let mut extra = MxRegistry::<usize>::new();
    CountDialect.register(&mut extra).unwrap();
    assert_eq!(extra.len(), 1);

    let before = base.len();
    base.merge(extra);
    assert_eq!(base.len(), before + 1);
    assert!(base.contains(MxFunctionKind::Generator, "count"));
    assert!(base.generator("count").is_some());
}

#[test]
fn test_call_helpers() {
    let mut call = MxCall::new("f", vec!["a".into(), "b".into()]);
    call.keyed.insert("k".into(), "v".into());
    assert_eq!(call.arg(1), Some("b"));
    assert_eq!(call.arg(2), None);
    assert_eq!(call.key("k"), Some("v"));
    assert!(call.reject("bad").is_semantic());
    assert!(call.reject("bad").to_string().contains("f: bad"));
}
