use super::*;
use crate::message::{Delivery, MockAcknowledger, Properties};
use bytes::Bytes;
use chrono::DateTime;
use serde_json::json;
use std::sync::Arc;

fn delivery(
    properties: Properties,
    headers: Map<String, Value>,
    body: &[u8],
    redelivered: bool,
) -> Delivery {
    Delivery::new(
        1,
        redelivered,
        String::new(),
        String::new(),
        properties,
        headers,
        Bytes::copy_from_slice(body),
        Arc::new(MockAcknowledger::new()),
    )
}

fn headers(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("headers fixture must be an object"),
    }
}

#[test]
fn unset_fields_are_omitted() {
    let fields = MessageFields::from_delivery(&delivery(
        Properties::default(),
        Map::new(),
        b"body1",
        false,
    ));

    let line = serde_json::to_string(&fields).unwrap();
    assert_eq!(line, r#"{"body":"body1"}"#);
}

#[test]
fn set_fields_use_camel_case_keys() {
    let props = Properties {
        kind: Some("someType".to_string()),
        ..Properties::default()
    };
    let fields = MessageFields::from_delivery(&delivery(
        props,
        headers(json!({"type": "msg.type1"})),
        b"body1",
        false,
    ));

    let line = serde_json::to_string(&fields).unwrap();
    assert_eq!(
        line,
        r#"{"headers":{"type":"msg.type1"},"type":"someType","body":"body1"}"#
    );
}

#[test]
fn scalar_properties_project_fully() {
    let props = Properties {
        content_type: Some("application/json".to_string()),
        delivery_mode: 2,
        priority: 5,
        correlation_id: Some("corr-1".to_string()),
        message_id: Some("msg-1".to_string()),
        ..Properties::default()
    };
    let mut d = delivery(props, Map::new(), b"body1", true);
    d.exchange = "events".to_string();
    d.routing_key = "orders.created".to_string();

    let fields = MessageFields::from_delivery(&d);
    assert_eq!(fields.content_type.as_deref(), Some("application/json"));
    assert_eq!(fields.delivery_mode, Some(2));
    assert_eq!(fields.priority, Some(5));
    assert_eq!(fields.correlation_id.as_deref(), Some("corr-1"));
    assert_eq!(fields.message_id.as_deref(), Some("msg-1"));
    assert!(fields.redelivered);
    assert_eq!(fields.exchange.as_deref(), Some("events"));
    assert_eq!(fields.routing_key.as_deref(), Some("orders.created"));
}

#[test]
fn zero_valued_mode_and_priority_are_unset() {
    let fields = MessageFields::from_delivery(&delivery(
        Properties::default(),
        Map::new(),
        b"x",
        false,
    ));

    assert_eq!(fields.delivery_mode, None);
    assert_eq!(fields.priority, None);
}

#[test]
fn binary_body_renders_as_base64() {
    let fields = MessageFields::from_delivery(&delivery(
        Properties::default(),
        Map::new(),
        &[0xff, 0xfe],
        false,
    ));

    assert_eq!(fields.body, Some(Body::Binary(vec![0xff, 0xfe])));
    let line = serde_json::to_string(&fields).unwrap();
    assert_eq!(line, r#"{"body":"//4="}"#);
}

#[test]
fn empty_body_is_omitted() {
    let fields =
        MessageFields::from_delivery(&delivery(Properties::default(), Map::new(), b"", false));

    assert_eq!(fields.body, None);
    assert_eq!(serde_json::to_string(&fields).unwrap(), "{}");
}

#[test]
fn timestamp_renders_rfc3339_with_trimmed_subseconds() {
    let props = Properties {
        timestamp: DateTime::from_timestamp(1_706_972_645, 0),
        ..Properties::default()
    };
    let fields =
        MessageFields::from_delivery(&delivery(props, Map::new(), b"x", false));

    assert_eq!(fields.timestamp.as_deref(), Some("2024-02-03T15:04:05Z"));
}

#[test]
fn timestamp_keeps_nanosecond_precision() {
    let props = Properties {
        timestamp: DateTime::from_timestamp(1_706_972_645, 999_999_999),
        ..Properties::default()
    };
    let fields =
        MessageFields::from_delivery(&delivery(props, Map::new(), b"x", false));

    assert_eq!(
        fields.timestamp.as_deref(),
        Some("2024-02-03T15:04:05.999999999Z")
    );
}
