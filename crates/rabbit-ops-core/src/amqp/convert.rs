//! Conversions between the wire types and the core message model.
//!
//! Headers cross the seam as JSON: AMQP field tables nest arbitrarily, and
//! JSON is what both the filter projection and the view output consume.
//! Publishing converts back; the mapping is lossy only for types JSON cannot
//! express (byte arrays become base64 strings, decimals become floats).

use crate::message::{Acknowledger, Delivery, Properties};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use lapin::types::{AMQPValue, FieldArray, FieldTable};
use lapin::BasicProperties;
use serde_json::{Map, Value};
use std::sync::Arc;

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;

use super::consumer::AmqpAcknowledger;

pub(crate) fn delivery_from_amqp(delivery: lapin::message::Delivery) -> Delivery {
    let props = delivery.properties;

    let headers = props
        .headers()
        .as_ref()
        .map(field_table_to_json)
        .unwrap_or_default();

    let properties = Properties {
        content_type: props.content_type().as_ref().map(ToString::to_string),
        content_encoding: props.content_encoding().as_ref().map(ToString::to_string),
        delivery_mode: props.delivery_mode().unwrap_or(0),
        priority: props.priority().unwrap_or(0),
        correlation_id: props.correlation_id().as_ref().map(ToString::to_string),
        reply_to: props.reply_to().as_ref().map(ToString::to_string),
        expiration: props.expiration().as_ref().map(ToString::to_string),
        message_id: props.message_id().as_ref().map(ToString::to_string),
        timestamp: props
            .timestamp()
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single()),
        kind: props.kind().as_ref().map(ToString::to_string),
        user_id: props.user_id().as_ref().map(ToString::to_string),
        app_id: props.app_id().as_ref().map(ToString::to_string),
    };

    let acknowledger: Arc<dyn Acknowledger> = Arc::new(AmqpAcknowledger::new(delivery.acker));

    Delivery::new(
        delivery.delivery_tag,
        delivery.redelivered,
        delivery.exchange.to_string(),
        delivery.routing_key.to_string(),
        properties,
        headers,
        Bytes::from(delivery.data),
        acknowledger,
    )
}

pub(crate) fn delivery_to_amqp(delivery: &Delivery) -> (BasicProperties, Vec<u8>) {
    let p = &delivery.properties;
    let mut props = BasicProperties::default();

    if let Some(v) = &p.content_type {
        props = props.with_content_type(v.as_str().into());
    }
    if let Some(v) = &p.content_encoding {
        props = props.with_content_encoding(v.as_str().into());
    }
    if p.delivery_mode != 0 {
        props = props.with_delivery_mode(p.delivery_mode);
    }
    if p.priority != 0 {
        props = props.with_priority(p.priority);
    }
    if let Some(v) = &p.correlation_id {
        props = props.with_correlation_id(v.as_str().into());
    }
    if let Some(v) = &p.reply_to {
        props = props.with_reply_to(v.as_str().into());
    }
    if let Some(v) = &p.expiration {
        props = props.with_expiration(v.as_str().into());
    }
    if let Some(v) = &p.message_id {
        props = props.with_message_id(v.as_str().into());
    }
    if let Some(ts) = p.timestamp {
        props = props.with_timestamp(ts.timestamp() as u64);
    }
    if let Some(v) = &p.kind {
        props = props.with_type(v.as_str().into());
    }
    if let Some(v) = &p.user_id {
        props = props.with_user_id(v.as_str().into());
    }
    if let Some(v) = &p.app_id {
        props = props.with_app_id(v.as_str().into());
    }
    if !delivery.headers.is_empty() {
        props = props.with_headers(json_to_field_table(&delivery.headers));
    }

    (props, delivery.body.to_vec())
}

pub(crate) fn field_table_to_json(table: &FieldTable) -> Map<String, Value> {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.to_string(), amqp_value_to_json(value)))
        .collect()
}

pub(crate) fn json_to_field_table(map: &Map<String, Value>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in map {
        table.insert(key.as_str().into(), json_to_amqp_value(value));
    }
    table
}

fn amqp_value_to_json(value: &AMQPValue) -> Value {
    match value {
        AMQPValue::Boolean(v) => Value::Bool(*v),
        AMQPValue::ShortShortInt(v) => Value::from(*v),
        AMQPValue::ShortShortUInt(v) => Value::from(*v),
        AMQPValue::ShortInt(v) => Value::from(*v),
        AMQPValue::ShortUInt(v) => Value::from(*v),
        AMQPValue::LongInt(v) => Value::from(*v),
        AMQPValue::LongUInt(v) => Value::from(*v),
        AMQPValue::LongLongInt(v) => Value::from(*v),
        AMQPValue::Float(v) => Value::from(f64::from(*v)),
        AMQPValue::Double(v) => Value::from(*v),
        AMQPValue::DecimalValue(v) => {
            Value::from(f64::from(v.value) / 10f64.powi(i32::from(v.scale)))
        }
        AMQPValue::ShortString(v) => Value::String(v.to_string()),
        AMQPValue::LongString(v) => {
            Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned())
        }
        AMQPValue::FieldArray(items) => {
            Value::Array(items.as_slice().iter().map(amqp_value_to_json).collect())
        }
        AMQPValue::Timestamp(v) => Value::from(*v),
        AMQPValue::FieldTable(table) => Value::Object(field_table_to_json(table)),
        AMQPValue::ByteArray(bytes) => Value::String(STANDARD.encode(bytes.as_slice())),
        AMQPValue::Void => Value::Null,
    }
}

fn json_to_amqp_value(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(v) => AMQPValue::Boolean(*v),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AMQPValue::LongLongInt(i),
            None => AMQPValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AMQPValue::LongString(s.as_str().into()),
        Value::Array(items) => {
            let mut array = FieldArray::default();
            for item in items {
                array.push(json_to_amqp_value(item));
            }
            AMQPValue::FieldArray(array)
        }
        Value::Object(map) => AMQPValue::FieldTable(json_to_field_table(map)),
    }
}
