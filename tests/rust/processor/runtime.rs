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

//! # Mapx Processor Tests - Runtime
//!
//! Tests for rule execution: rule-major ordering, permanent drops, in-place
//! replacement, tag selection, variables set by callbacks, listeners and
//! failure handling.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test processor
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use mapx::{
    MxBindEnv, MxCall, MxCallbackFn, MxCompiledRule, MxCDSLCompiler, MxDirective, MxError, MxFilter, MxMapping,
    MxMappingDialect, MxProcessStats, MxProcessor, MxRegistry, MxRuleContext, MxRuleset,
};
use proptest::prelude::*;
use serde_json::json;

const CL: &str = "http://purl.obolibrary.org/obo/CL_";
const UBERON: &str = "http://purl.obolibrary.org/obo/UBERON_";
const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";

const PREFIXES: &str = "
prefix CL: <http://purl.obolibrary.org/obo/CL_>
prefix UBERON: <http://purl.obolibrary.org/obo/UBERON_>
prefix orcid: <https://orcid.org/>
";

fn compile(rules: &str) -> MxRuleset<MxMapping> {
    MxCDSLCompiler::MxFForDialect(&MxMappingDialect::new())
        .unwrap()
        .MxFCompile(&format!("{}{}", PREFIXES, rules))
        .unwrap()
}

fn compile_err(rules: &str) -> MxError {
    MxCDSLCompiler::MxFForDialect(&MxMappingDialect::new())
        .unwrap()
        .MxFCompile(&format!("{}{}", PREFIXES, rules))
        .unwrap_err()
}

fn mapping(subject: &str) -> MxMapping {
    MxMapping::new()
        .with("subject_id", subject)
        .unwrap()
        .with("predicate_id", format!("{}exactMatch", SKOS))
        .unwrap()
        .with("object_id", format!("{}0000001", UBERON))
        .unwrap()
}

fn run(rules: &str, input: Vec<MxMapping>) -> Vec<MxMapping> {
    MxProcessor::new(compile(rules)).process(input).unwrap()
}

fn subjects(products: &[MxMapping]) -> Vec<String> {
    products
        .iter()
        .map(|m| m.subject_id().unwrap_or_default().to_string())
        .collect()
}

/// Tests that an earlier `include()` is permanent and a later `stop()`
/// cannot take it back.
#[test]
fn MxFTIncludeStopInclude() {
    let rules = "
        subject_id==CL:1111 -> include();
        subject_id==CL:* -> stop();
        subject_id==* -> include();
    ";
    let input = vec![
        mapping(&format!("{}1111", CL)),
        mapping(&format!("{}2222", CL)),
        mapping(&format!("{}0001", UBERON)),
    ];
    let out = run(rules, input);
    assert_eq!(subjects(&out), vec![format!("{}1111", CL), format!("{}0001", UBERON)]);
}

#[test]
fn MxFTPermanentDrop() {
    let rules = "
        subject_id==CL:* -> stop();
        subject_id==* -> include();
        subject_id==CL:* -> include();
    ";
    let out = run(rules, vec![mapping(&format!("{}1", CL)), mapping(&format!("{}2", UBERON))]);
    assert_eq!(subjects(&out), vec![format!("{}2", UBERON)]);
}

/// Tests that products come out rule by rule, each rule following the
/// input order.
#[test]
fn MxFTRuleMajorOutputOrder() {
    let rules = "
        subject_id==UBERON:* -> include();
        subject_id==CL:* -> include();
    ";
    let input = vec![
        mapping(&format!("{}1", CL)),
        mapping(&format!("{}1", UBERON)),
        mapping(&format!("{}2", CL)),
        mapping(&format!("{}2", UBERON)),
    ];
    let out = run(rules, input);
    assert_eq!(
        subjects(&out),
        vec![
            format!("{}1", UBERON),
            format!("{}2", UBERON),
            format!("{}1", CL),
            format!("{}2", CL),
        ]
    );
}

/// Tests that with mutually exclusive preprocessing rules the products of a
/// generating rule keep the input order.
#[test]
fn MxFTOrderPreservedThroughExclusiveRules() {
    let rules = r#"
        subject_id==CL:* -> assign("comment", "cell");
        subject_id==UBERON:* -> assign("comment", "anatomy");
        subject_id==* -> include();
    "#;
    let input = vec![
        mapping(&format!("{}1", UBERON)),
        mapping(&format!("{}1", CL)),
        mapping(&format!("{}2", UBERON)),
    ];
    let out = run(rules, input.clone());
    assert_eq!(subjects(&out), subjects(&input));
    let comments: Vec<&str> = out.iter().map(|m| m.text("comment").unwrap()).collect();
    assert_eq!(comments, vec!["anatomy", "cell", "anatomy"]);
}

#[test]
fn MxFTLaterRulesSeeReplacedMapping() {
    let rules = r#"
        subject_id==CL:* -> assign("comment", "seen", "author_id", "orcid:0000-0001|orcid:0000-0002");
        comment==seen -> include();
        comment==~ -> include();
    "#;
    let out = run(rules, vec![mapping(&format!("{}1", CL)), mapping(&format!("{}1", UBERON))]);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].text("comment"), Some("seen"));
    assert_eq!(
        out[0].list("author_id"),
        vec!["https://orcid.org/0000-0001", "https://orcid.org/0000-0002"]
    );
    assert!(!out[1].is_present("comment"));
}

#[test]
fn MxFTInvertPreprocessor() {
    let rules = "
        subject_id==CL:* -> invert();
        subject_id==* -> include();
    ";
    let narrow = mapping(&format!("{}1", CL))
        .with("predicate_id", format!("{}narrowMatch", SKOS))
        .unwrap();
    let unknown = mapping(&format!("{}2", CL))
        .with("predicate_id", "http://example.org/relatedTo")
        .unwrap();
    let out = run(rules, vec![narrow, unknown]);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].subject_id(), Some(format!("{}0000001", UBERON).as_str()));
    assert_eq!(out[0].object_id(), Some(format!("{}1", CL).as_str()));
    assert_eq!(out[0].predicate_id(), Some(format!("{}broadMatch", SKOS).as_str()));

    let explicit = run(
        "subject_id==* -> invert(skos:relatedMatch);\nsubject_id==* -> include();",
        vec![mapping(&format!("{}1", CL))],
    );
    assert_eq!(explicit[0].predicate_id(), Some(format!("{}relatedMatch", SKOS).as_str()));
    assert_eq!(explicit[0].object_id(), Some(format!("{}1", CL).as_str()));
}

#[test]
fn MxFTReplacePreprocessor() {
    let rules = r#"
        subject_id==* -> replace("subject_label", " cell$", "", "subject_id", "CL_", "CL#");
        subject_id==* -> include();
    "#;
    let input = mapping(&format!("{}1", CL)).with("subject_label", "stem cell").unwrap();
    let out = run(rules, vec![input]);
    assert_eq!(out[0].text("subject_label"), Some("stem"));
    assert_eq!(out[0].subject_id(), Some("http://purl.obolibrary.org/obo/CL#1"));
}

/// Tests that selecting a tag behaves like deleting every rule without it.
#[test]
fn MxFTTagSelectionEquivalence() {
    let tagged = "
        [t1] subject_id==CL:* -> include();
        [t2] subject_id==* -> stop();
        [t1, t3] object_id==* -> include();
        subject_id==* -> include();
    ";
    let only_t1 = "
        [t1] subject_id==CL:* -> include();
        [t1, t3] object_id==* -> include();
    ";
    let without_t2 = "
        [t1] subject_id==CL:* -> include();
        [t1, t3] object_id==* -> include();
        subject_id==* -> include();
    ";
    let input = vec![mapping(&format!("{}1", CL)), mapping(&format!("{}1", UBERON))];

    let mut processor = MxProcessor::new(compile(tagged));
    processor.include_rules(["t1"]);
    let selected = processor.process(input.clone()).unwrap();
    assert_eq!(selected, run(only_t1, input.clone()));

    processor.exclude_rules(["t2"]);
    let excluded = processor.process(input.clone()).unwrap();
    assert_eq!(excluded, run(without_t2, input.clone()));

    // the selection only applies to one call
    let all = processor.process(input.clone()).unwrap();
    assert_eq!(all, run(tagged, input));
}

/// Tests variables: a header sets the default, a filtered `set_var` sets a
/// value for the matching mappings only.
#[test]
fn MxFTVariablesSetByDirectives() {
    let rules = r#"
        set_var("ORGANISM", "unknown");
        subject_id==CL:* -> set_var("ORGANISM", "cell");
        subject_id==* -> assign("comment", "%{ORGANISM}");
        subject_id==* -> include();
    "#;
    let out = run(rules, vec![mapping(&format!("{}1", CL)), mapping(&format!("{}1", UBERON))]);
    assert_eq!(out[0].text("comment"), Some("cell"));
    assert_eq!(out[1].text("comment"), Some("unknown"));
}

#[test]
fn MxFTSetVarRejectsFieldNames() {
    let err = compile_err(r#"set_var("comment", "x");"#);
    assert!(err.is_semantic());
    let err = compile_err(r#"set_var("not a name", "x");"#);
    assert!(err.is_semantic());
}

/// Tests that a runtime failure returns no products, after listeners saw
/// the products generated before it.
#[test]
fn MxFTRuntimeFailureYieldsNoOutput() {
    let rules = r#"
        subject_id==* -> include();
        subject_id==* -> assign("subject_id", "%{comment}");
    "#;
    let seen = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&seen);
    let mut processor = MxProcessor::new(compile(rules));
    processor.add_listener(move |_: &MxCompiledRule<MxMapping>, _: &MxMapping, _: &MxMapping| {
        *counter.borrow_mut() += 1;
    });

    let result = processor.process(vec![mapping(&format!("{}1", CL)), mapping(&format!("{}2", CL))]);
    match result {
        Err(MxError::Runtime { function, .. }) => assert_eq!(function, "assign"),
        other => panic!("expected a runtime error, got {:?}", other),
    }
    assert_eq!(*seen.borrow(), 2);
}

#[test]
fn MxFTListenerReceivesRuleAndProduct() {
    let rules = "
        [keep] subject_id==CL:* -> include();
        subject_id==UBERON:* -> include();
    ";
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut processor = MxProcessor::new(compile(rules));
    processor.add_listener(move |rule: &MxCompiledRule<MxMapping>, m: &MxMapping, product: &MxMapping| {
        assert_eq!(m, product);
        sink.borrow_mut().push(rule.text.clone());
    });
    processor
        .process(vec![mapping(&format!("{}1", CL)), mapping(&format!("{}1", UBERON))])
        .unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], format!("[keep] subject_id==CL:* -> include();"));
}

#[test]
fn MxFTPresenceSemantics() {
    let rules = "
        comment==* -> stop();
        !(comment==*) -> include();
    ";
    let with_comment = mapping(&format!("{}1", CL)).with("comment", "x").unwrap();
    let without = mapping(&format!("{}2", CL));
    let out = run(rules, vec![with_comment, without]);
    assert_eq!(subjects(&out), vec![format!("{}2", CL)]);
}

/// Tests that undeclared prefixes and unknown functions fail compilation
/// instead of skipping the rule.
#[test]
fn MxFTParseTimeFailures() {
    let err = compile_err("subject_id==GO:* -> include();");
    assert!(err.is_syntax());
    assert!(err.to_string().contains("GO"));

    let err = compile_err("subject_id==* -> exclude();");
    assert!(err.is_syntax());
    assert!(err.to_string().contains("exclude"));

    let err = compile_err("subject_id==* -> assign(\"subject_id\", \"\");");
    assert!(err.is_semantic());

    let err = compile_err("subject_id==* -> assign(\"comment\", \"%{nope}\");");
    assert!(err.is_syntax());
    assert!(err.location().is_some_and(|l| l.is_known()));
}

#[test]
fn MxFTRulesetContents() {
    let ruleset = compile(
        r#"
        set_var("A", "1");
        subject_id==CL:* -> { include(); stop(); }
    "#,
    );
    assert_eq!(ruleset.setups.len(), 1);
    assert_eq!(ruleset.len(), 2);
    assert!(ruleset.prefixes.get("CL").is_some());
    assert!(ruleset.prefixes.get("skos").is_some());
    assert!(!ruleset.is_empty());
    assert!(ruleset.rules.iter().all(|r| !r.is_passive()));
}

#[test]
fn MxFTProcessStats() {
    let rules = "
        [skip] subject_id==* -> include();
        subject_id==CL:* -> stop();
        subject_id==* -> include();
    ";
    let mut processor = MxProcessor::new(compile(rules));
    processor.exclude_rules(["skip"]);
    let out = processor
        .process(vec![mapping(&format!("{}1", CL)), mapping(&format!("{}1", UBERON))])
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(
        processor.last_stats(),
        MxProcessStats {
            rules_run: 2,
            rules_skipped: 1,
            mappings_in: 2,
            mappings_dropped: 1,
            products: 1,
        }
    );
}

#[test]
fn MxFTEmptyInput() {
    let out = run("subject_id==* -> include();", Vec::new());
    assert!(out.is_empty());
}

fn arb_mapping() -> impl Strategy<Value = MxMapping> {
    (
        prop_oneof![Just(CL), Just(UBERON)],
        0u32..50,
        prop::option::of(0.0f64..1.0),
        prop::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(base, id, confidence, comment)| {
            let mut m = mapping(&format!("{}{}", base, id));
            if let Some(c) = confidence {
                m = m.with("confidence", c).unwrap();
            }
            if let Some(c) = comment {
                m = m.with("comment", json!(c)).unwrap();
            }
            m
        })
}

proptest! {
    /// Same ruleset and input always give the same products.
    #[test]
    fn MxFTProcessingIsDeterministic(input in prop::collection::vec(arb_mapping(), 0..20)) {
        let rules = r#"
            confidence<0.2 -> stop();
            subject_id==CL:* -> assign("comment", "%{subject_id|suffix}");
            comment==* -> include();
            subject_id==UBERON:* && confidence>=0.5 -> invert();
            subject_id==* -> include();
        "#;
        let ruleset = compile(rules);
        let first = MxProcessor::new(ruleset.clone()).process(input.clone()).unwrap();
        let second = MxProcessor::new(ruleset).process(input.clone()).unwrap();
        let recompiled = MxProcessor::new(compile(rules)).process(input).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &recompiled);
    }

    /// A single include rule returns the input unchanged and in order.
    #[test]
    fn MxFTIncludeAllIsIdentity(input in prop::collection::vec(arb_mapping(), 0..20)) {
        let out = run("subject_id==* -> include();", input.clone());
        prop_assert_eq!(out, input);
    }
}

/// Tests the short field names on the include/stop/include ruleset.
#[test]
fn MxFTShortFieldNamesScenario() {
    let source = "
        prefix CL: <http://purl.obolibrary.org/obo/CL_>
        subject==CL:1111 -> include();
        subject==CL:* -> stop();
        subject==* -> include();
    ";
    let ruleset = MxCDSLCompiler::MxFForDialect(&MxMappingDialect::new())
        .unwrap()
        .MxFCompile(source)
        .unwrap();
    let input = vec![
        mapping(&format!("{}1111", CL)),
        mapping(&format!("{}2222", CL)),
        mapping(&format!("{}0001", UBERON)),
    ];
    let out = MxProcessor::new(ruleset).process(input).unwrap();
    assert_eq!(subjects(&out), vec![format!("{}1111", CL), format!("{}0001", UBERON)]);
}

/// Tests that a literal with an undeclared prefix is a located syntax error
/// with a single message.
#[test]
fn MxFTAssignUndeclaredPrefix() {
    let err = compile_err("subject_id==* -> assign(\"object_id\", \"GO:0001\");");
    assert!(err.is_syntax());
    assert!(err.location().is_some_and(|l| l.is_known()));
    let text = err.to_string();
    assert!(text.contains("GO"));
    assert!(!text.contains("semantic error"));
    assert_eq!(text.matches("undeclared prefix").count(), 1);

    let err = compile_err("subject_id==* -> edit(\"object_id=GO:0001\");");
    assert!(err.is_syntax());
    assert!(err.location().is_some_and(|l| l.is_known()));
}

#[test]
fn MxFTEditSetsLiteralFields() {
    let rules = r#"
        subject_id==CL:* -> edit("object_id=UBERON:0000002", "comment=%{not a template}", "mapping_tool=");
        subject_id==* -> include();
    "#;
    let input = mapping(&format!("{}1", CL)).with("mapping_tool", "rules").unwrap();
    let out = run(rules, vec![input]);
    assert_eq!(out[0].object_id(), Some(format!("{}0000002", UBERON).as_str()));
    assert_eq!(out[0].text("comment"), Some("%{not a template}"));
    assert!(!out[0].is_present("mapping_tool"));
}

#[test]
fn MxFTEditRejectsMalformedArguments() {
    let err = compile_err("subject_id==* -> edit(\"comment\");");
    assert!(err.is_semantic());
    assert!(err.location().is_some_and(|l| l.is_known()));

    let err = compile_err("subject_id==* -> edit(\"subject_id=\");");
    assert!(err.is_semantic());

    let err = compile_err("subject_id==* -> edit(\"no_such_field=x\");");
    assert!(err.is_syntax());
}

/// Tests that `is_duplicate` keeps the first mapping with a given key.
#[test]
fn MxFTIsDuplicateKeepsFirst() {
    let rules = r#"
        is_duplicate("%{subject_id}") -> stop();
        subject_id==* -> include();
    "#;
    let first = mapping(&format!("{}1", CL)).with("comment", "first").unwrap();
    let second = mapping(&format!("{}2", CL));
    let again = mapping(&format!("{}1", CL)).with("comment", "again").unwrap();
    let mut processor = MxProcessor::new(compile(rules));
    let out = processor.process(vec![first, second, again]).unwrap();
    assert_eq!(subjects(&out), vec![format!("{}1", CL), format!("{}2", CL)]);
    assert_eq!(out[0].text("comment"), Some("first"));

    // seen keys do not leak into the next call
    let out = processor.process(vec![mapping(&format!("{}1", CL))]).unwrap();
    assert_eq!(out.len(), 1);
}

fn pair(subject: &str, object: &str) -> MxMapping {
    MxMapping::new()
        .with("subject_id", format!("http://example.org/{}", subject))
        .unwrap()
        .with("predicate_id", format!("{}exactMatch", SKOS))
        .unwrap()
        .with("object_id", format!("http://example.org/{}", object))
        .unwrap()
}

fn cardinalities(products: &[MxMapping]) -> Vec<Option<&str>> {
    products.iter().map(|m| m.text("mapping_cardinality")).collect()
}

#[test]
fn MxFTInferCardinality() {
    let rules = "
        subject_id==* -> infer_cardinality();
        subject_id==* -> include();
    ";
    let input = vec![
        pair("s1", "o1"),
        pair("s1", "o1"),
        pair("s2", "o2"),
        pair("s2", "o3"),
        pair("s3", "o4"),
        pair("s4", "o4"),
        pair("s5", "o5"),
        pair("s5", "o6"),
        pair("s6", "o5"),
    ];
    let out = run(rules, input);
    assert_eq!(
        cardinalities(&out),
        vec![
            Some("1:1"),
            Some("1:1"),
            Some("1:n"),
            Some("1:n"),
            Some("n:1"),
            Some("n:1"),
            Some("n:n"),
            Some("1:n"),
            Some("n:1"),
        ]
    );
    assert!(out.iter().all(|m| !m.is_present("cardinality_scope")));
}

#[test]
fn MxFTInferCardinalityUnmapped() {
    let none = "https://w3id.org/sssom/NoTermFound";
    let unmapped = |subject: &str, object: &str| {
        pair("x", "y")
            .with("subject_id", subject)
            .unwrap()
            .with("object_id", object)
            .unwrap()
    };
    let input = vec![
        pair("s1", "o2"),
        unmapped("http://example.org/s1", none),
        unmapped(none, "http://example.org/o2"),
        unmapped(none, none),
    ];
    let out = run("infer_cardinality();\nsubject_id==* -> include();", input);
    assert_eq!(cardinalities(&out), vec![Some("1:1"), Some("1:0"), Some("0:1"), Some("0:0")]);
}

/// Tests that literals are counted by label, apart from entities.
#[test]
fn MxFTInferCardinalityLiterals() {
    let literal_object = pair("s2", "ignored")
        .with("object_type", "rdfs literal")
        .unwrap()
        .with("object_label", "o3")
        .unwrap();
    let literal_subject = pair("ignored", "o4")
        .with("subject_type", "rdfs literal")
        .unwrap()
        .with("subject_label", "s3")
        .unwrap();
    let input = vec![
        pair("s2", "o2"),
        literal_object,
        pair("s3", "o4").with("subject_type", "owl class").unwrap(),
        literal_subject,
    ];
    let out = run("subject_id==* -> infer_cardinality();\nsubject_id==* -> include();", input);
    assert_eq!(cardinalities(&out), vec![Some("1:n"), Some("1:n"), Some("n:1"), Some("n:1")]);
}

#[test]
fn MxFTInferCardinalityScopeAndFilter() {
    let close = |subject: &str, object: &str| {
        pair(subject, object)
            .with("predicate_id", format!("{}closeMatch", SKOS))
            .unwrap()
    };
    let input = vec![pair("s1", "o1"), close("s1", "o2")];

    let unscoped = run("subject_id==* -> infer_cardinality();\nsubject_id==* -> include();", input.clone());
    assert_eq!(cardinalities(&unscoped), vec![Some("1:n"), Some("1:n")]);

    let scoped = run(
        "subject_id==* -> infer_cardinality(\"predicate_id\");\nsubject_id==* -> include();",
        input.clone(),
    );
    assert_eq!(cardinalities(&scoped), vec![Some("1:1"), Some("1:1")]);
    assert_eq!(scoped[0].list("cardinality_scope"), vec!["predicate_id"]);

    let filtered = run(
        "predicate_id==skos:exactMatch -> infer_cardinality();\nsubject_id==* -> include();",
        input,
    );
    assert_eq!(cardinalities(&filtered), vec![Some("1:1"), None]);

    let err = compile_err("subject_id==* -> infer_cardinality(\"no_such_field\");");
    assert!(err.is_syntax());
}

/// Tests that a custom callback directive runs once per rule, sees the
/// live list left by earlier rules, and runs before that rule's
/// per-mapping steps.
#[test]
fn MxFTCustomCallbackDirective() {
    let calls: Arc<Mutex<Vec<(usize, Option<String>, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let mut registry = MxRegistry::for_dialect(&MxMappingDialect::new()).unwrap();
    registry
        .register_directive("record", "", &[], move |_: &MxCall, _: &mut MxBindEnv| {
            let sink = Arc::clone(&sink);
            let f: MxCallbackFn = Arc::new(
                move |filter: Option<&Arc<MxFilter>>, live: &mut [MxMapping], _: &mut MxRuleContext| -> mapx::Result<()> {
                    let commented = live.iter().filter(|m| m.is_present("comment")).count();
                    sink.lock().unwrap().push((live.len(), filter.map(|f| f.to_string()), commented));
                    Ok(())
                },
            );
            Ok(MxDirective::Callback(f))
        })
        .unwrap();

    let source = format!(
        "{}{}",
        PREFIXES,
        r#"
        subject_id==CL:1 -> stop();
        subject_id==CL:* -> record();
        subject_id==* -> assign("comment", "seen");
        subject_id==* -> include();
    "#
    );
    let ruleset = MxCDSLCompiler::MxFNew(registry).MxFCompile(&source).unwrap();
    let out = MxProcessor::new(ruleset)
        .process(vec![
            mapping(&format!("{}1", CL)),
            mapping(&format!("{}2", CL)),
            mapping(&format!("{}1", UBERON)),
        ])
        .unwrap();
    assert_eq!(out.len(), 2);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (live, filter, commented) = &calls[0];
    assert_eq!(*live, 2);
    assert_eq!(*commented, 0);
    let filter = filter.as_deref().unwrap();
    assert!(filter.contains("subject_id"));
    assert!(filter.contains(CL));
}
