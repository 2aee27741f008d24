use super::*;
use crate::error::SelectorError;
use crate::message::{MockAcknowledger, Properties};
use bytes::Bytes;
use chrono::DateTime;
use serde_json::{json, Map};
use std::sync::Arc;

fn delivery(properties: Properties, headers: serde_json::Value) -> Delivery {
    let headers = match headers {
        serde_json::Value::Object(map) => map,
        _ => Map::new(),
    };
    Delivery::new(
        1,
        false,
        String::new(),
        String::new(),
        properties,
        headers,
        Bytes::from_static(b"body1"),
        Arc::new(MockAcknowledger::new()),
    )
}

fn delivery_of_kind(kind: &str) -> Delivery {
    let props = Properties {
        kind: Some(kind.to_string()),
        ..Properties::default()
    };
    delivery(props, json!({}))
}

#[test]
fn empty_expression_is_rejected() {
    let err = ExpressionSelector::new("   ").unwrap_err();
    assert!(matches!(err, SelectorError::Compile { .. }));
}

#[test]
fn malformed_expression_is_rejected() {
    for expr in ["type == ", r#"type == "msg.type1" &&"#] {
        let err = ExpressionSelector::new(expr).unwrap_err();
        assert!(
            matches!(err, SelectorError::Compile { .. }),
            "expected compile error for {expr}, got {err}"
        );
    }
}

#[test]
fn setup_check_tolerates_type_mismatches_on_absent_headers() {
    // Trial evaluation sees the header as empty; the type mismatch must not
    // reject the expression, only fail per message when it actually occurs.
    let selector =
        ExpressionSelector::new(r#"str::regex_matches(headers.someField, "^a")"#).unwrap();

    assert!(selector
        .is_selected(&delivery(Properties::default(), json!({"someField": "abc"})))
        .unwrap());
}

#[test]
fn unknown_names_are_rejected_at_setup() {
    for expr in [
        r#"missing.type == "x""#,
        r#"Type == "x""#,
        r#"consumerTag == "x""#,
        r#"body == "x""#,
    ] {
        let err = ExpressionSelector::new(expr).unwrap_err();
        assert!(
            matches!(err, SelectorError::UnknownName { .. }),
            "expected unknown-name error for {expr}, got {err}"
        );
    }
}

#[test]
fn non_boolean_result_is_an_evaluation_error() {
    for expr in ["1 + 2", r#""something""#] {
        let selector = ExpressionSelector::new(expr).unwrap();
        let err = selector.is_selected(&delivery_of_kind("t")).unwrap_err();
        assert!(
            matches!(err, SelectorError::NotBoolean { .. }),
            "expected non-boolean error for {expr}, got {err}"
        );
    }
}

#[test]
fn matches_on_type_equality() {
    let selector = ExpressionSelector::new(r#"type == "msg.type1""#).unwrap();

    assert!(selector.is_selected(&delivery_of_kind("msg.type1")).unwrap());
    assert!(!selector.is_selected(&delivery_of_kind("msg.type2")).unwrap());
}

#[test]
fn unset_scalar_fields_compare_as_empty_strings() {
    let selector = ExpressionSelector::new(r#"correlationID == """#).unwrap();

    assert!(selector.is_selected(&delivery_of_kind("any")).unwrap());
}

#[test]
fn matches_with_regex() {
    let selector =
        ExpressionSelector::new(r#"str::regex_matches(type, "^msg.*")"#).unwrap();

    assert!(selector.is_selected(&delivery_of_kind("msg.type1")).unwrap());
    assert!(!selector
        .is_selected(&delivery_of_kind("some.msg.type"))
        .unwrap());
}

#[test]
fn matches_on_headers_and_properties_together() {
    let selector = ExpressionSelector::new(
        r#"headers.someField == "value" && correlationID == "abc""#,
    )
    .unwrap();

    let props = Properties {
        correlation_id: Some("abc".to_string()),
        ..Properties::default()
    };
    assert!(selector
        .is_selected(&delivery(props.clone(), json!({"someField": "value"})))
        .unwrap());
    assert!(!selector
        .is_selected(&delivery(props, json!({"someField": "other"})))
        .unwrap());
}

#[test]
fn matches_on_nested_headers() {
    let selector = ExpressionSelector::new("headers.outer.inner == 42").unwrap();

    assert!(selector
        .is_selected(&delivery(
            Properties::default(),
            json!({"outer": {"inner": 42}})
        ))
        .unwrap());
    assert!(!selector
        .is_selected(&delivery(
            Properties::default(),
            json!({"outer": {"inner": 7}})
        ))
        .unwrap());
}

#[test]
fn absent_headers_evaluate_as_empty() {
    let selector = ExpressionSelector::new(r#"headers.missing == "value""#).unwrap();

    assert!(!selector
        .is_selected(&delivery(Properties::default(), json!({})))
        .unwrap());
}

#[test]
fn matches_on_timestamp() {
    let selector = ExpressionSelector::new(
        r#"timestamp == "2024-02-03T15:04:05.999999999Z""#,
    )
    .unwrap();

    let props = Properties {
        timestamp: DateTime::from_timestamp(1_706_972_645, 999_999_999),
        ..Properties::default()
    };
    assert!(selector.is_selected(&delivery(props, json!({}))).unwrap());
}

#[test]
fn matches_on_boolean_and_numeric_fields() {
    let selector =
        ExpressionSelector::new("redelivered == false && deliveryMode == 0").unwrap();

    assert!(selector
        .is_selected(&delivery(Properties::default(), json!({})))
        .unwrap());
}
