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

//! # Mapx Core Tests - Mapping
//!
//! Tests for mapping records, schema fields and prefix tables.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test mapping
//! ```

use mapx::{MxCommonPredicates, MxError, MxFieldAccess, MxMapping, MxPrefixMap, MxSchema, MxSlotKind, MxVersion};
use serde_json::{json, Value};

const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";

fn sample() -> MxMapping {
    MxMapping::new()
        .with("subject_id", "http://purl.obolibrary.org/obo/CL_0000001")
        .unwrap()
        .with("subject_label", "primordial cell")
        .unwrap()
        .with("predicate_id", format!("{}narrowMatch", SKOS))
        .unwrap()
        .with("predicate_label", "narrow match")
        .unwrap()
        .with("object_id", "http://purl.obolibrary.org/obo/UBERON_0000001")
        .unwrap()
        .with("mapping_cardinality", "1:n")
        .unwrap()
}

/// Tests that the 1.0 field list excludes fields introduced in 1.1.
#[test]
fn test_schema_versions() {
    let v10 = MxSchema::for_version(MxVersion::V1_0);
    let v11 = MxSchema::for_version(MxVersion::V1_1);

    assert!(v10.slot("subject_id").is_some());
    assert!(v10.slot("similarity_score").is_none());
    assert!(v10.slot("record_id").is_none());
    assert_eq!(v11.slot("similarity_score").unwrap().kind, MxSlotKind::Double);
    assert!(v11.slots().count() > v10.slots().count());
    assert_eq!(MxVersion::parse("1.0"), Some(MxVersion::V1_0));
    assert_eq!(MxVersion::parse("2.0"), None);
}

#[test]
fn test_schema_require_unknown_field() {
    let err = MxSchema::default().require("subject").unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("unknown mapping field"));
}

#[test]
fn test_schema_counterpart() {
    assert_eq!(MxSchema::counterpart("subject_label").as_deref(), Some("object_label"));
    assert_eq!(MxSchema::counterpart("object_match_field").as_deref(), Some("subject_match_field"));
    assert_eq!(MxSchema::counterpart("predicate_id"), None);
}

/// Tests value coercion when fields are set.
///
/// Single strings become lists for list fields, numeric strings become
/// numbers for double fields, and empty values clear the field.
#[test]
fn test_mapping_set_coerces_values() {
    let mut mapping = MxMapping::new();
    mapping.set("author_id", Some(json!("https://orcid.org/0000-0002-6601-2165"))).unwrap();
    mapping.set("confidence", Some(json!("0.75"))).unwrap();

    assert_eq!(mapping.list("author_id"), vec!["https://orcid.org/0000-0002-6601-2165"]);
    assert_eq!(mapping.number("confidence"), Some(0.75));

    mapping.set("author_id", Some(json!([]))).unwrap();
    mapping.set("confidence", None).unwrap();
    assert!(!mapping.is_present("author_id"));
    assert!(!mapping.is_present("confidence"));

    mapping.set("comment", Some(json!(""))).unwrap();
    assert!(!mapping.is_present("comment"));
}

#[test]
fn test_mapping_set_rejects_invalid_values() {
    let mut mapping = MxMapping::new();
    assert!(matches!(mapping.set("mapping_date", Some(json!("yesterday"))), Err(MxError::Field { .. })));
    assert!(matches!(mapping.set("mapping_cardinality", Some(json!("2:2"))), Err(MxError::Field { .. })));
    assert!(matches!(mapping.set("confidence", Some(json!("high"))), Err(MxError::Field { .. })));
    assert!(matches!(mapping.set("not_a_field", Some(json!("x"))), Err(MxError::Field { .. })));
    assert!(mapping.set("mapping_date", Some(json!("2024-02-29"))).is_ok());
}

#[test]
fn test_mapping_version_restricts_fields() {
    let mut old = MxMapping::for_version(MxVersion::V1_0);
    assert!(old.set("similarity_score", Some(json!(0.5))).is_err());

    let mut current = MxMapping::new();
    assert!(current.set("similarity_score", Some(json!(0.5))).is_ok());
}

#[test]
fn test_mapping_with_field_leaves_original() {
    let original = sample();
    let modified = original.with_field("comment", Some(json!("checked"))).unwrap();
    assert!(!original.is_present("comment"));
    assert_eq!(modified.text("comment"), Some("checked"));
}

#[test]
fn test_mapping_json_round_trip() {
    let value = json!({
        "subject_id": "http://example.org/a",
        "predicate_id": "http://www.w3.org/2004/02/skos/core#exactMatch",
        "object_id": "http://example.org/b",
        "confidence": 0.9,
        "author_label": ["Alice", "Bob"]
    });
    let mapping = MxMapping::from_json(value.clone()).unwrap();
    assert_eq!(mapping.to_json(), value);

    assert!(MxMapping::from_json(json!(["not", "an", "object"])).is_err());
}

/// Tests that the digest ignores insertion order but not content.
#[test]
fn test_mapping_digest_is_stable() {
    let a = MxMapping::new()
        .with("subject_id", "http://example.org/a")
        .unwrap()
        .with("object_id", "http://example.org/b")
        .unwrap();
    let b = MxMapping::new()
        .with("object_id", "http://example.org/b")
        .unwrap()
        .with("subject_id", "http://example.org/a")
        .unwrap();
    let c = b.with_field("comment", Some(json!("x"))).unwrap();

    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), c.digest());
    assert_eq!(a.digest().len(), 64);
}

/// Tests inversion through the common predicate table.
///
/// Sides are swapped, the predicate is replaced by its inverse, the
/// predicate label is dropped and the cardinality is flipped.
#[test]
fn test_mapping_invert() {
    let mapping = sample();
    let inverted = mapping.invert(&MxCommonPredicates::default()).unwrap();

    assert_eq!(inverted.subject_id(), Some("http://purl.obolibrary.org/obo/UBERON_0000001"));
    assert_eq!(inverted.object_id(), Some("http://purl.obolibrary.org/obo/CL_0000001"));
    assert_eq!(inverted.text("object_label"), Some("primordial cell"));
    assert!(!inverted.is_present("subject_label"));
    assert_eq!(inverted.predicate_id(), Some(format!("{}broadMatch", SKOS).as_str()));
    assert!(!inverted.is_present("predicate_label"));
    assert_eq!(inverted.text("mapping_cardinality"), Some("n:1"));
}

#[test]
fn test_mapping_invert_unknown_predicate() {
    let mapping = sample()
        .with("predicate_id", "http://example.org/relatedTo")
        .unwrap();
    assert!(mapping.invert(&MxCommonPredicates::default()).is_none());
    assert!(mapping.invert(&MxCommonPredicates::empty()).is_none());

    let mut table = MxCommonPredicates::empty();
    table.add_symmetric("http://example.org/relatedTo");
    let inverted = mapping.invert(&table).unwrap();
    assert_eq!(inverted.predicate_id(), Some("http://example.org/relatedTo"));
    assert_eq!(inverted.text("predicate_label"), Some("narrow match"));
}

#[test]
fn test_prefix_expand() {
    let mut prefixes = MxPrefixMap::with_builtins();
    prefixes.add("CL", "http://purl.obolibrary.org/obo/CL_");

    assert_eq!(prefixes.expand("CL:0000001").unwrap(), "http://purl.obolibrary.org/obo/CL_0000001");
    assert_eq!(prefixes.expand("skos:exactMatch").unwrap(), format!("{}exactMatch", SKOS));
    assert_eq!(prefixes.expand("http://example.org/x").unwrap(), "http://example.org/x");
    assert_eq!(prefixes.expand("plain").unwrap(), "plain");

    let err = prefixes.expand("UBERON:0000001").unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("UBERON"));
}

#[test]
fn test_prefix_shorten_uses_longest_match() {
    let mut prefixes = MxPrefixMap::new();
    prefixes.add("OBO", "http://purl.obolibrary.org/obo/");
    prefixes.add("CL", "http://purl.obolibrary.org/obo/CL_");

    assert_eq!(prefixes.shorten("http://purl.obolibrary.org/obo/CL_0000001"), "CL:0000001");
    assert_eq!(prefixes.shorten("http://purl.obolibrary.org/obo/GO_0000001"), "OBO:GO_0000001");
    assert_eq!(prefixes.shorten("http://example.org/x"), "http://example.org/x");
    assert_eq!(prefixes.namespace("http://purl.obolibrary.org/obo/CL_1"), Some("http://purl.obolibrary.org/obo/CL_"));
    assert_eq!(prefixes.local_name("http://example.org/ns#term"), "term");
}

#[test]
fn test_mapping_serde_flatten() {
    let mapping = sample();
    let text = serde_json::to_string(&mapping).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["mapping_cardinality"], "1:n");
    assert!(value.get("version").is_none());
}
