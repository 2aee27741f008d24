use super::*;
use crate::message::MockAcknowledger;
use lapin::types::{AMQPValue, FieldArray, FieldTable};
use serde_json::json;

fn headers(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn field_table_maps_to_json() {
    let mut nested = FieldTable::default();
    nested.insert("inner".into(), AMQPValue::LongLongInt(42));

    let mut array = FieldArray::default();
    array.push(AMQPValue::LongString("a".into()));
    array.push(AMQPValue::Boolean(true));

    let mut table = FieldTable::default();
    table.insert("text".into(), AMQPValue::LongString("value".into()));
    table.insert("flag".into(), AMQPValue::Boolean(false));
    table.insert("count".into(), AMQPValue::LongInt(7));
    table.insert("ratio".into(), AMQPValue::Double(1.5));
    table.insert("nothing".into(), AMQPValue::Void);
    table.insert("nested".into(), AMQPValue::FieldTable(nested));
    table.insert("list".into(), AMQPValue::FieldArray(array));

    let map = field_table_to_json(&table);

    assert_eq!(map["text"], json!("value"));
    assert_eq!(map["flag"], json!(false));
    assert_eq!(map["count"], json!(7));
    assert_eq!(map["ratio"], json!(1.5));
    assert_eq!(map["nothing"], Value::Null);
    assert_eq!(map["nested"], json!({"inner": 42}));
    assert_eq!(map["list"], json!(["a", true]));
}

#[test]
fn byte_arrays_map_to_base64_strings() {
    let mut table = FieldTable::default();
    table.insert("blob".into(), AMQPValue::ByteArray(vec![0xff, 0xfe].into()));

    let map = field_table_to_json(&table);
    assert_eq!(map["blob"], json!("//4="));
}

#[test]
fn decimals_map_to_scaled_floats() {
    let mut table = FieldTable::default();
    table.insert(
        "price".into(),
        AMQPValue::DecimalValue(lapin::types::DecimalValue { scale: 2, value: 1995 }),
    );

    let map = field_table_to_json(&table);
    assert_eq!(map["price"], json!(19.95));
}

#[test]
fn json_maps_back_to_field_table() {
    let map = headers(json!({
        "text": "value",
        "flag": true,
        "count": 7,
        "ratio": 1.5,
        "nothing": null,
        "nested": {"inner": 42},
        "list": ["a", false],
    }));

    let mut nested = FieldTable::default();
    nested.insert("inner".into(), AMQPValue::LongLongInt(42));

    let mut list = FieldArray::default();
    list.push(AMQPValue::LongString("a".into()));
    list.push(AMQPValue::Boolean(false));

    let mut expected = FieldTable::default();
    expected.insert("text".into(), AMQPValue::LongString("value".into()));
    expected.insert("flag".into(), AMQPValue::Boolean(true));
    expected.insert("count".into(), AMQPValue::LongLongInt(7));
    expected.insert("ratio".into(), AMQPValue::Double(1.5));
    expected.insert("nothing".into(), AMQPValue::Void);
    expected.insert("nested".into(), AMQPValue::FieldTable(nested));
    expected.insert("list".into(), AMQPValue::FieldArray(list));

    assert_eq!(json_to_field_table(&map), expected);
}

#[test]
fn set_properties_survive_the_publish_conversion() {
    let properties = Properties {
        content_type: Some("application/json".to_string()),
        delivery_mode: 2,
        priority: 3,
        correlation_id: Some("corr-1".to_string()),
        message_id: Some("msg-1".to_string()),
        timestamp: chrono::DateTime::from_timestamp(1_706_972_645, 0),
        kind: Some("someType".to_string()),
        ..Properties::default()
    };
    let delivery = Delivery::new(
        1,
        false,
        String::new(),
        "srcQueue".to_string(),
        properties,
        headers(json!({"key": "value"})),
        Bytes::from_static(b"body1"),
        Arc::new(MockAcknowledger::new()),
    );

    let (props, payload) = delivery_to_amqp(&delivery);

    assert_eq!(payload, b"body1");
    assert_eq!(
        props.content_type().as_ref().map(ToString::to_string),
        Some("application/json".to_string())
    );
    assert_eq!(*props.delivery_mode(), Some(2));
    assert_eq!(*props.priority(), Some(3));
    assert_eq!(
        props.correlation_id().as_ref().map(ToString::to_string),
        Some("corr-1".to_string())
    );
    assert_eq!(
        props.message_id().as_ref().map(ToString::to_string),
        Some("msg-1".to_string())
    );
    assert_eq!(*props.timestamp(), Some(1_706_972_645));
    assert_eq!(
        props.kind().as_ref().map(ToString::to_string),
        Some("someType".to_string())
    );

    let republished = props
        .headers()
        .as_ref()
        .map(field_table_to_json)
        .unwrap_or_default();
    assert_eq!(republished["key"], json!("value"));
}

#[test]
fn unset_properties_stay_unset_when_publishing() {
    let delivery = Delivery::new(
        1,
        false,
        String::new(),
        "srcQueue".to_string(),
        Properties::default(),
        Map::new(),
        Bytes::from_static(b"body1"),
        Arc::new(MockAcknowledger::new()),
    );

    let (props, _) = delivery_to_amqp(&delivery);

    assert_eq!(*props.content_type(), None);
    assert_eq!(*props.delivery_mode(), None);
    assert_eq!(*props.priority(), None);
    assert_eq!(*props.timestamp(), None);
    assert!(props.headers().is_none());
}
