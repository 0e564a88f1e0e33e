//! Tests for expression evaluation

use serde_json::{Value, json};

use super::*;
use crate::{OperatorRegistry, Predicate};

/// Compile `rule` with no custom operators and evaluate against `event`
fn eval(rule: Value, event: Value) -> bool {
    Predicate::compile(&rule, &OperatorRegistry::new())
        .unwrap()
        .matches(&event)
        .unwrap()
}

fn tweet() -> Value {
    json!({
        "tweet": "say hello now",
        "user": "Alice",
        "retweet_count": 42,
        "created_at": 1_609_459_200_000_i64,
        "verified": true,
        "lang": "en",
        "entities": {"hashtags": ["rust", "tokio"]}
    })
}

// =============================================================================
// Field access
// =============================================================================

#[test]
fn test_var_resolves_top_level_field() {
    assert!(eval(json!({"==": [{"var": "lang"}, "en"]}), tweet()));
}

#[test]
fn test_var_resolves_nested_path_and_index() {
    assert!(eval(
        json!({"==": [{"var": "entities.hashtags.1"}, "tokio"]}),
        tweet()
    ));
}

#[test]
fn test_var_default_used_for_missing_field() {
    assert!(eval(json!({"==": [{"var": ["missing", "fallback"]}, "fallback"]}), tweet()));
}

#[test]
fn test_var_on_scalar_event_is_undefined() {
    assert!(!eval(json!({"==": [{"var": "tweet"}, "x"]}), json!(17)));
}

// =============================================================================
// Missing field semantics
// =============================================================================

#[test]
fn test_missing_field_equals_is_false() {
    assert!(!eval(json!({"==": [{"var": "nope"}, null]}), tweet()));
    assert!(!eval(json!({"==": [{"var": "nope"}, "x"]}), tweet()));
}

#[test]
fn test_missing_field_not_equals_is_false() {
    assert!(!eval(json!({"!=": [{"var": "nope"}, "x"]}), tweet()));
}

#[test]
fn test_missing_field_ordering_is_false() {
    assert!(!eval(json!({">": [{"var": "nope"}, 0]}), tweet()));
    assert!(!eval(json!({"<=": [{"var": "nope"}, 0]}), tweet()));
}

#[test]
fn test_missing_field_contains_and_regex_are_false() {
    assert!(!eval(json!({"contains": [{"var": "nope"}, ""]}), tweet()));
    assert!(!eval(json!({"regex": [{"var": "nope"}, ".*"]}), tweet()));
}

#[test]
fn test_missing_field_negated_is_true() {
    assert!(eval(json!({"!": {"var": "nope"}}), tweet()));
}

#[test]
fn test_null_field_is_not_undefined() {
    let event = json!({"reply_to": null});
    assert!(eval(json!({"==": [{"var": "reply_to"}, null]}), event));
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn test_loose_equality_coerces_numbers() {
    assert!(eval(json!({"==": [{"var": "retweet_count"}, "42"]}), tweet()));
    assert!(eval(json!({"==": [{"var": "retweet_count"}, 42.0]}), tweet()));
    assert!(!eval(json!({"==": [{"var": "retweet_count"}, "many"]}), tweet()));
}

#[test]
fn test_loose_equality_booleans() {
    assert!(eval(json!({"==": [{"var": "verified"}, true]}), tweet()));
    assert!(eval(json!({"==": [{"var": "verified"}, 1]}), tweet()));
    assert!(!eval(json!({"==": [{"var": "verified"}, false]}), tweet()));
}

#[test]
fn test_strict_equality_checks_type() {
    assert!(eval(json!({"===": [{"var": "retweet_count"}, 42]}), tweet()));
    assert!(!eval(json!({"===": [{"var": "retweet_count"}, "42"]}), tweet()));
    assert!(eval(json!({"!==": [{"var": "retweet_count"}, "42"]}), tweet()));
}

#[test]
fn test_numeric_ordering() {
    assert!(eval(json!({">=": [{"var": "retweet_count"}, 42]}), tweet()));
    assert!(eval(json!({">": [{"var": "retweet_count"}, 41.5]}), tweet()));
    assert!(!eval(json!({"<": [{"var": "retweet_count"}, 42]}), tweet()));
    assert!(eval(json!({"<=": [{"var": "retweet_count"}, "100"]}), tweet()));
}

#[test]
fn test_between_form() {
    assert!(eval(json!({"<=": [40, {"var": "retweet_count"}, 42]}), tweet()));
    assert!(!eval(json!({"<": [40, {"var": "retweet_count"}, 42]}), tweet()));
}

#[test]
fn test_string_ordering_is_lexicographic() {
    assert!(eval(json!({"<": [{"var": "lang"}, "fr"]}), tweet()));
}

#[test]
fn test_non_numeric_ordering_is_false() {
    assert!(!eval(json!({">": [{"var": "user"}, 1]}), tweet()));
    assert!(!eval(json!({"<=": [{"var": "user"}, 1]}), tweet()));
}

// =============================================================================
// Logical combinators
// =============================================================================

#[test]
fn test_and_or_not() {
    assert!(eval(
        json!({"and": [{"==": [{"var": "lang"}, "en"]}, {"var": "verified"}]}),
        tweet()
    ));
    assert!(eval(
        json!({"or": [{"==": [{"var": "lang"}, "fr"]}, {"var": "verified"}]}),
        tweet()
    ));
    assert!(!eval(json!({"not": [{"var": "verified"}]}), tweet()));
}

#[test]
fn test_and_short_circuits_before_custom_operator() {
    let mut ops = OperatorRegistry::new();
    ops.register("boom", |_: &[Option<Value>]| Err("should not run".to_string()));

    let rule = json!({"and": [false, {"boom": []}]});
    let predicate = Predicate::compile(&rule, &ops).unwrap();
    assert_eq!(predicate.matches(&tweet()), Ok(false));

    let rule = json!({"or": [true, {"boom": []}]});
    let predicate = Predicate::compile(&rule, &ops).unwrap();
    assert_eq!(predicate.matches(&tweet()), Ok(true));
}

#[test]
fn test_panicking_operator_becomes_fault() {
    let mut ops = OperatorRegistry::new();
    ops.register("boom", |_: &[Option<Value>]| panic!("operator blew up"));

    let predicate = Predicate::compile(&json!({"boom": [{"var": "tweet"}]}), &ops).unwrap();
    let fault = predicate.matches(&tweet()).unwrap_err();
    assert_eq!(fault.operator, "boom");
    assert!(fault.message.contains("operator blew up"));

    // Still usable afterwards
    assert!(predicate.matches(&tweet()).is_err());
}

#[test]
fn test_panic_message_payloads() {
    assert_eq!(panic_message(&"static"), "operator panicked: static");
    assert_eq!(panic_message(&String::from("owned")), "operator panicked: owned");
    assert_eq!(panic_message(&42_u8), "operator panicked");
}

// =============================================================================
// contains / regex / in
// =============================================================================

#[test]
fn test_contains_is_case_insensitive() {
    assert!(eval(json!({"contains": [{"var": "tweet"}, "HELLO"]}), tweet()));
    assert!(!eval(json!({"contains": [{"var": "tweet"}, "zzz"]}), tweet()));
}

#[test]
fn test_contains_folds_haystack_case() {
    assert!(eval(json!({"contains": [{"var": "user"}, "alice"]}), tweet()));
}

#[test]
fn test_contains_folds_field_needle() {
    let rule = json!({"contains": [{"var": "tweet"}, {"var": "needle"}]});
    assert!(eval(rule.clone(), json!({"tweet": "say Hello", "needle": "HELLO"})));
    assert!(!eval(rule, json!({"tweet": "say Hello", "needle": "BYE"})));
}

#[test]
fn test_contains_literal_needle_lowercased_once() {
    let predicate =
        Predicate::compile(&json!({"contains": [{"var": "tweet"}, "HeLLo"]}), &OperatorRegistry::new())
            .unwrap();
    let Expr::Contains { needle, .. } = predicate.root() else {
        panic!("expected contains");
    };
    assert!(matches!(needle.as_ref(), Expr::Literal(Value::String(s)) if s == "hello"));
    assert_eq!(predicate.matches(&tweet()), Ok(true));
}

#[test]
fn test_contains_stringifies_numbers() {
    assert!(eval(json!({"contains": [{"var": "retweet_count"}, 2]}), tweet()));
    assert!(eval(json!({"contains": [{"var": "verified"}, "TRUE"]}), tweet()));
}

#[test]
fn test_regex_anchored_match() {
    let rule = json!({"regex": [{"var": "tweet"}, "^RT"]});
    assert!(eval(rule.clone(), json!({"tweet": "RT @alice: hi"})));
    assert!(!eval(rule, json!({"tweet": "hi RT"})));
}

#[test]
fn test_regex_delimiters_are_stripped() {
    let rule = json!({"regex": [{"var": "tweet"}, "/^RT/"]});
    assert!(eval(rule, json!({"tweet": "RT @alice: hi"})));
}

#[test]
fn test_regex_on_number_uses_string_form() {
    assert!(eval(json!({"regex": [{"var": "retweet_count"}, "^4\\d$"]}), tweet()));
}

#[test]
fn test_in_array_and_string() {
    assert!(eval(json!({"in": [{"var": "lang"}, ["en", "de"]]}), tweet()));
    assert!(!eval(json!({"in": [{"var": "lang"}, ["fr", "de"]]}), tweet()));
    assert!(eval(json!({"in": ["hello", {"var": "tweet"}]}), tweet()));
}

// =============================================================================
// Dates
// =============================================================================

#[test]
fn test_date_bound_is_inclusive() {
    let rule = json!({">=": [{"var": "created_at"}, {"Date": "2021-01-01T00:00:00Z"}]});
    assert!(eval(rule.clone(), json!({"created_at": 1_609_459_200_000_i64})));
    assert!(eval(rule.clone(), json!({"created_at": 1_609_459_200_001_i64})));
    assert!(!eval(rule, json!({"created_at": 1_609_459_199_999_i64})));
}

// =============================================================================
// Helpers
// =============================================================================

#[test]
fn test_truthiness() {
    assert!(!truthy(&None));
    for falsy in [json!(null), json!(false), json!(0), json!(""), json!([])] {
        assert!(!truthy(&Some(Cow::Owned(falsy))));
    }
    for truthy_value in [json!(true), json!(1), json!("0"), json!([0]), json!({})] {
        assert!(truthy(&Some(Cow::Owned(truthy_value))));
    }
}

#[test]
fn test_stringify_numbers() {
    assert_eq!(stringify(&json!(42)), "42");
    assert_eq!(stringify(&json!(42.0)), "42");
    assert_eq!(stringify(&json!(1.5)), "1.5");
    assert_eq!(stringify(&json!(-3)), "-3");
}

#[test]
fn test_to_number() {
    assert_eq!(to_number(&json!("  7 ")), Some(7.0));
    assert_eq!(to_number(&json!("")), Some(0.0));
    assert_eq!(to_number(&json!(null)), Some(0.0));
    assert_eq!(to_number(&json!("x")), None);
    assert_eq!(to_number(&json!([1])), None);
}
