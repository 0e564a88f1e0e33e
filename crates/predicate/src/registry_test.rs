//! Tests for the custom operator registry

use super::*;

fn noop(_: &[Option<Value>]) -> Result<Value, String> {
    Ok(Value::Null)
}

#[test]
fn test_register_and_lookup() {
    let mut ops = OperatorRegistry::new();
    assert!(ops.is_empty());

    ops.register("starts_with", noop);
    assert!(ops.contains("starts_with"));
    assert!(ops.get("starts_with").is_some());
    assert_eq!(ops.len(), 1);
}

#[test]
fn test_reserved_names_are_rejected() {
    let mut ops = OperatorRegistry::new();
    for name in RESERVED_OPERATORS {
        assert!(!ops.try_register(name, noop), "{name} should be reserved");
    }
    assert!(ops.is_empty());
}

#[test]
fn test_duplicate_and_empty_names_are_rejected() {
    let mut ops = OperatorRegistry::new();
    assert!(ops.try_register("dup", noop));
    assert!(!ops.try_register("dup", noop));
    assert!(!ops.try_register("", noop));
    assert_eq!(ops.len(), 1);
}

#[test]
#[should_panic(expected = "reserved or already registered")]
fn test_register_reserved_panics() {
    let mut ops = OperatorRegistry::new();
    ops.register("contains", noop);
}

#[test]
fn test_names_are_sorted() {
    let mut ops = OperatorRegistry::new();
    ops.register("zeta", noop);
    ops.register("alpha", noop);
    ops.register("mid", noop);
    assert_eq!(ops.names(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn test_is_reserved() {
    assert!(is_reserved("regex"));
    assert!(is_reserved("Date"));
    assert!(!is_reserved("date"));
    assert!(!is_reserved("starts_with"));
}

#[test]
fn test_clone_shares_operators() {
    let mut ops = OperatorRegistry::new();
    ops.register("a", noop);
    let cloned = ops.clone();
    assert!(cloned.contains("a"));
    assert!(Arc::ptr_eq(
        ops.get("a").unwrap(),
        cloned.get("a").unwrap()
    ));
}
